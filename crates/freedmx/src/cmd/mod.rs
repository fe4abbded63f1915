use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use freedmx_controller::{ControllerConfig, RefreshRate};

use crate::exit::{io_error, json_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod encode;
pub mod listen;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drive a freeDMX AP device until interrupted.
    Run(RunArgs),
    /// Emulate a device: print handshakes and reassembled frames.
    Listen(ListenArgs),
    /// Print the wire encoding of channel values.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

/// Controller settings. Flags override `--config`, which overrides defaults.
#[derive(Args, Debug, Default)]
pub struct ControllerArgs {
    /// JSON file with a controller configuration.
    #[arg(long, value_name = "PATH", env = "FREEDMX_CONFIG")]
    pub config: Option<PathBuf>,
    /// Device IP address.
    #[arg(long, env = "FREEDMX_ADDRESS")]
    pub address: Option<IpAddr>,
    /// Device UDP port.
    #[arg(long, env = "FREEDMX_PORT")]
    pub port: Option<u16>,
    /// Local address to bind.
    #[arg(long, value_name = "ADDR", env = "FREEDMX_BIND")]
    pub bind: Option<SocketAddr>,
    /// Refresh rate: standard (25 Hz), legacy (2 Hz) or a rate in Hz.
    #[arg(long, value_name = "RATE", value_parser = parse_refresh_rate, env = "FREEDMX_REFRESH")]
    pub refresh: Option<RefreshRate>,
    /// Watch for device traffic and report silence.
    #[arg(long, env = "FREEDMX_LIVENESS")]
    pub liveness: bool,
    /// Liveness timeout in milliseconds.
    #[arg(long, value_name = "MS", env = "FREEDMX_ACK_TIMEOUT_MS")]
    pub ack_timeout: Option<u64>,
}

impl ControllerArgs {
    pub fn resolve(&self) -> CliResult<ControllerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|err| {
                    io_error(&format!("failed reading {}", path.display()), err)
                })?;
                serde_json::from_str(&text).map_err(|err| {
                    json_error(&format!("invalid config {}", path.display()), err)
                })?
            }
            None => ControllerConfig::default(),
        };

        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(refresh) = self.refresh {
            config.refresh_rate = refresh;
        }
        if self.liveness {
            config.enable_liveness_monitor = true;
        }
        if let Some(ms) = self.ack_timeout {
            if ms == 0 {
                return Err(CliError::new(USAGE, "--ack-timeout must be greater than zero"));
            }
            config.ack_timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub controller: ControllerArgs,
    /// Channel values from channel 1 (comma-separated, 0-255).
    #[arg(long, value_delimiter = ',', conflicts_with = "chase")]
    pub values: Option<Vec<u8>>,
    /// Step one full-intensity channel through the universe.
    #[arg(long)]
    pub chase: bool,
    /// Chase step interval (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms", requires = "chase")]
    pub chase_step: String,
    /// Stop after this long instead of waiting for Ctrl-C (e.g. 5s, 500ms).
    #[arg(long)]
    pub duration: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind.
    #[arg(default_value = "0.0.0.0:10100", env = "FREEDMX_LISTEN")]
    pub bind: SocketAddr,
    /// Reply to every frame so the controller's liveness monitor sees a device.
    #[arg(long)]
    pub ack: bool,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit with an error on the first malformed slice instead of resyncing.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Channel values from channel 1 (comma-separated, 0-255).
    #[arg(value_delimiter = ',', required = true)]
    pub values: Vec<u8>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Build the runtime for commands that talk to the network.
pub fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))
}

pub fn parse_refresh_rate(input: &str) -> Result<RefreshRate, String> {
    match input.trim().to_ascii_lowercase().as_str() {
        "standard" => Ok(RefreshRate::Standard),
        "legacy" => Ok(RefreshRate::Legacy),
        other => {
            let hz = other
                .strip_suffix("hz")
                .unwrap_or(other)
                .parse::<u32>()
                .map_err(|_| format!("invalid refresh rate: {input}"))?;
            if hz == 0 {
                return Err("refresh rate must be greater than zero".to_string());
            }
            Ok(RefreshRate::Custom(hz))
        }
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
