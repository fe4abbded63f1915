#![cfg(feature = "cli")]

use std::net::UdpSocket;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn freedmx() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_freedmx"));
    command.arg("--log-level").arg("error");
    command
}

/// Reserve a loopback port and release it for the child to bind.
fn free_udp_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0")
        .expect("reserved socket should bind")
        .local_addr()
        .expect("reserved socket should have an address")
        .port()
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        if child.try_wait().expect("child should be pollable").is_some() {
            return child.wait_with_output().expect("child output should be readable");
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            panic!("child did not exit within {timeout:?}");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("stdout line should be json"))
        .collect()
}

fn spawn_listener(port: u16, extra: &[&str]) -> Child {
    let child = freedmx()
        .arg("--format")
        .arg("json")
        .arg("listen")
        .arg(format!("127.0.0.1:{port}"))
        .args(extra)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should start");
    // Give the emulator time to bind before anything is sent.
    thread::sleep(Duration::from_millis(300));
    child
}

#[test]
fn encode_json_reports_triplets_and_slices() {
    let output = freedmx()
        .arg("--format")
        .arg("json")
        .arg("encode")
        .arg("255,128,0")
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    let payload = &json_lines(&output)[0];
    assert_eq!(payload["frame_size"], 1536);

    let channels = payload["channels"].as_array().expect("channels array");
    assert_eq!(channels.len(), 3);
    assert_eq!(channels[0]["triplet"], "C1 00 7F");
    assert_eq!(channels[1]["triplet"], "C1 01 00");
    assert_eq!(channels[2]["triplet"], "C0 02 00");

    let slices = payload["slices"].as_array().expect("slices array");
    assert_eq!(slices.len(), 7);
    assert_eq!(slices[6]["len"], 36);
    assert_eq!(slices[6]["is_last"], true);
}

#[test]
fn encode_raw_writes_whole_frame() {
    let output = freedmx()
        .arg("--format")
        .arg("raw")
        .arg("encode")
        .arg("255")
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    assert_eq!(output.stdout.len(), 1536);
    assert_eq!(&output.stdout[..3], &[0xC1, 0x00, 0x7F]);
    assert_eq!(&output.stdout[1533..], &[0x86, 0x7F, 0x00]);
}

#[test]
fn version_prints_package_version() {
    let output = freedmx().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("freedmx {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn version_extended_reports_wire_constants_as_json() {
    let output = freedmx()
        .args(["--format", "json", "version", "--extended"])
        .output()
        .expect("version should run");
    assert!(output.status.success());

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["name"], "freedmx");
    assert_eq!(lines[0]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(lines[0]["wire"]["slices"], 7);
    assert_eq!(lines[0]["wire"]["hello"], "E5 39 60 00");
}

#[test]
fn invalid_log_filter_is_usage_error() {
    let output = freedmx()
        .args(["--log-filter", "freedmx=loud", "version"])
        .output()
        .expect("freedmx should run");
    assert_eq!(output.status.code(), Some(64));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid --log-filter"));
}

#[test]
fn run_session_reaches_emulated_device() {
    let port = free_udp_port();
    let listener = spawn_listener(port, &["--count", "3"]);

    let run = freedmx()
        .arg("--format")
        .arg("json")
        .arg("run")
        .arg("--address")
        .arg("127.0.0.1")
        .arg("--port")
        .arg(port.to_string())
        .arg("--bind")
        .arg("127.0.0.1:0")
        .arg("--values")
        .arg("255,128,0")
        .arg("--duration")
        .arg("1s")
        .output()
        .expect("run should execute");
    assert!(run.status.success(), "run failed: {run:?}");

    let info = &json_lines(&run)[0];
    assert_eq!(info["state"], "closed");
    assert_eq!(info["degraded"], false);
    // Hello, at least one full cycle, goodbye.
    assert!(info["counters"]["sent"].as_u64().unwrap_or(0) >= 9);

    let listened = wait_with_timeout(listener, Duration::from_secs(5));
    assert!(listened.status.success());
    let events = json_lines(&listened);
    assert_eq!(events[0]["event"], "hello");

    let frames: Vec<_> = events.iter().filter(|e| e["event"] == "frame").collect();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0]["values"], serde_json::json!([255, 128, 0]));
    assert_eq!(frames[0]["active_channels"], 2);
}

#[test]
fn liveness_is_reported_when_device_acks() {
    let port = free_udp_port();
    let mut listener = spawn_listener(port, &["--ack"]);

    let run = freedmx()
        .arg("--format")
        .arg("json")
        .arg("run")
        .arg("--address")
        .arg("127.0.0.1")
        .arg("--port")
        .arg(port.to_string())
        .arg("--bind")
        .arg("127.0.0.1:0")
        .arg("--liveness")
        .arg("--ack-timeout")
        .arg("500")
        .arg("--duration")
        .arg("1s")
        .output()
        .expect("run should execute");

    let _ = listener.kill();
    let _ = listener.wait();

    assert!(run.status.success(), "run failed: {run:?}");
    let info = &json_lines(&run)[0];
    assert!(info["counters"]["received"].as_u64().unwrap_or(0) > 0);
    assert_eq!(info["counters"]["liveness_lost"], 0);
    assert_eq!(info["device_alive"], true);
}

#[test]
fn unbindable_address_returns_transport_error() {
    let output = freedmx()
        .arg("run")
        .arg("--address")
        .arg("127.0.0.1")
        .arg("--bind")
        .arg("192.0.2.1:0")
        .arg("--duration")
        .arg("1s")
        .output()
        .expect("run should execute");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("could not open a socket"));
}

#[test]
fn missing_config_file_is_usage_error() {
    let output = freedmx()
        .arg("run")
        .arg("--config")
        .arg("/nonexistent/freedmx.json")
        .output()
        .expect("run should execute");

    assert_eq!(output.status.code(), Some(64));
}
