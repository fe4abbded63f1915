use std::env;
use std::process::Command;

// Build facts reported by `freedmx version --extended`.
fn main() {
    for (var, key) in [("TARGET", "FREEDMX_BUILD_TARGET"), ("PROFILE", "FREEDMX_BUILD_PROFILE")] {
        if let Ok(value) = env::var(var) {
            println!("cargo:rustc-env={key}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }

    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok());
    if let Some(version) = version {
        println!("cargo:rustc-env=FREEDMX_RUSTC_VERSION={}", version.trim());
    }
    println!("cargo:rerun-if-env-changed=RUSTC");
}
