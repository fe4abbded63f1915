use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use freedmx_controller::ControllerInfo;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One JSON document per line.
pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_controller_info(info: &ControllerInfo, format: OutputFormat) {
    let alive = match info.device_alive {
        Some(true) => "yes",
        Some(false) => "no",
        None => "n/a",
    };
    let local = info
        .local_addr
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(info),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            table
                .add_row(vec!["device".to_string(), info.device.to_string()])
                .add_row(vec!["local".to_string(), local])
                .add_row(vec!["state".to_string(), info.state.to_string()])
                .add_row(vec!["degraded".to_string(), info.degraded.to_string()])
                .add_row(vec!["refresh_hz".to_string(), info.refresh_hz.to_string()])
                .add_row(vec!["device_alive".to_string(), alive.to_string()])
                .add_row(vec!["sent".to_string(), info.counters.sent.to_string()])
                .add_row(vec![
                    "received".to_string(),
                    info.counters.received.to_string(),
                ])
                .add_row(vec![
                    "liveness_lost".to_string(),
                    info.counters.liveness_lost.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "device={} local={} state={} refresh={}Hz alive={} sent={} received={} liveness_lost={}",
                info.device,
                local,
                info.state,
                info.refresh_hz,
                alive,
                info.counters.sent,
                info.counters.received,
                info.counters.liveness_lost
            );
        }
    }
}

/// Space-separated uppercase hex, as the bytes appear on the wire.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Channel values up to the last non-zero one.
pub fn trimmed_values(values: &[u8]) -> &[u8] {
    let end = values
        .iter()
        .rposition(|v| *v != 0)
        .map_or(0, |last| last + 1);
    &values[..end]
}
