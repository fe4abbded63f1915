use std::net::SocketAddr;

use freedmx_controller::ControllerConfig;
use freedmx_frame::{DATAGRAM_MAX_SIZE, FRAME_SIZE, GOODBYE, HELLO, SLICE_COUNT};
use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{hex, new_table, print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct BuildInfo {
    name: &'static str,
    version: &'static str,
    target: &'static str,
    profile: &'static str,
    rustc: &'static str,
    os: &'static str,
    arch: &'static str,
    wire: WireInfo,
    defaults: DefaultsInfo,
}

/// Protocol constants compiled into this binary.
#[derive(Debug, Serialize)]
struct WireInfo {
    frame_size: usize,
    datagram_max_size: usize,
    slices: usize,
    hello: String,
    goodbye: String,
}

#[derive(Debug, Serialize)]
struct DefaultsInfo {
    device: SocketAddr,
    refresh_hz: u32,
    ack_timeout_ms: u128,
}

impl BuildInfo {
    fn collect() -> Self {
        let config = ControllerConfig::default();
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            target: option_env!("FREEDMX_BUILD_TARGET").unwrap_or("unknown"),
            profile: option_env!("FREEDMX_BUILD_PROFILE").unwrap_or("unknown"),
            rustc: option_env!("FREEDMX_RUSTC_VERSION").unwrap_or("unknown"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            wire: WireInfo {
                frame_size: FRAME_SIZE,
                datagram_max_size: DATAGRAM_MAX_SIZE,
                slices: SLICE_COUNT,
                hello: hex(&HELLO),
                goodbye: hex(&GOODBYE),
            },
            defaults: DefaultsInfo {
                device: config.device_addr(),
                refresh_hz: config.refresh_rate.hz(),
                ack_timeout_ms: config.ack_timeout.as_millis(),
            },
        }
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.to_string()),
            ("version", self.version.to_string()),
            ("target", self.target.to_string()),
            ("profile", self.profile.to_string()),
            ("rustc", self.rustc.to_string()),
            ("os", self.os.to_string()),
            ("arch", self.arch.to_string()),
            ("frame_size", self.wire.frame_size.to_string()),
            ("datagram_max_size", self.wire.datagram_max_size.to_string()),
            ("slices", self.wire.slices.to_string()),
            ("hello", self.wire.hello.clone()),
            ("goodbye", self.wire.goodbye.clone()),
            ("default_device", self.defaults.device.to_string()),
            ("default_refresh_hz", self.defaults.refresh_hz.to_string()),
            ("default_ack_timeout_ms", self.defaults.ack_timeout_ms.to_string()),
        ]
    }
}

/// Plain `freedmx X.Y.Z` unless `--extended` is given.
pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("freedmx {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let info = BuildInfo::collect();
    match format {
        OutputFormat::Json => print_json(&info),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            for (field, value) in info.rows() {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for (field, value) in info.rows() {
                println!("{field}: {value}");
            }
        }
    }
    Ok(SUCCESS)
}
