//! Stderr logging for the CLI.
//!
//! `--log-level` applies to the freedmx crates only; tokio and other
//! dependencies stay at `warn`. Extra `EnvFilter` directives from
//! `--log-filter` (or `FREEDMX_LOG`) are layered on top, so a single module
//! can be opened up, e.g. `freedmx_controller::transmitter=trace` for
//! per-slice output without tracing every other crate.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use crate::exit::{CliError, CliResult, USAGE};

/// Targets that follow `--log-level`.
const FREEDMX_TARGETS: [&str; 4] = [
    "freedmx",
    "freedmx_transport",
    "freedmx_frame",
    "freedmx_controller",
];

/// Level for everything outside [`FREEDMX_TARGETS`].
const DEPENDENCY_LEVEL: LogLevel = LogLevel::Warn;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Directive string: dependency default, then freedmx targets, then extras.
fn directives(level: LogLevel, extra: Option<&str>) -> String {
    let level = level.as_directive();
    let mut directives = vec![DEPENDENCY_LEVEL.as_directive().to_string()];
    directives.extend(FREEDMX_TARGETS.iter().map(|target| format!("{target}={level}")));
    directives.extend(
        extra
            .into_iter()
            .flat_map(|extra| extra.split(','))
            .map(str::trim)
            .filter(|directive| !directive.is_empty())
            .map(str::to_string),
    );
    directives.join(",")
}

pub fn build_filter(level: LogLevel, extra: Option<&str>) -> CliResult<EnvFilter> {
    EnvFilter::try_new(directives(level, extra))
        .map_err(|err| CliError::new(USAGE, format!("invalid --log-filter: {err}")))
}

/// Install the stderr subscriber. Stdout is reserved for command output.
///
/// Events carry their target so scoped filters stay readable; events from
/// controller tasks also carry the `controller` span with the device address.
pub fn init_logging(format: LogFormat, level: LogLevel, extra: Option<&str>) -> CliResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(level, extra)?)
        .with_ansi(false)
        .with_target(true);

    // A subscriber already installed (tests) is not an error.
    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().with_current_span(true).try_init();
        }
    }
    Ok(())
}
