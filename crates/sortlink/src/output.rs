use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use sortlink_device::{HandshakeResult, Measurement, SessionSummary};
use sortlink_frame::Command;
use sortlink_transport::{SerialPortInfo, SerialPortType};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CommandOutput<'a> {
    event: &'static str,
    code: &'static str,
    args: &'a [String],
    meaning: &'static str,
    timestamp: String,
}

/// Print one command received from the device.
pub fn print_command(command: &Command, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&CommandOutput {
            event: "command",
            code: command.code.as_str(),
            args: &command.args,
            meaning: command.code.describe(),
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CODE", "ARGS", "MEANING"]);
            table.add_row(vec![
                command.code.to_string(),
                command.args.join(","),
                command.code.describe().to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} args={:?} ({})",
                command.code,
                command.args,
                command.code.describe()
            );
        }
        OutputFormat::Raw => print_line(&command.to_string()),
    }
}

#[derive(Serialize)]
struct MeasurementOutput<'a> {
    event: &'static str,
    #[serde(flatten)]
    measurement: &'a Measurement,
    timestamp: String,
}

/// Print a measurement report as it arrives.
pub fn print_measurement(measurement: &Measurement, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&MeasurementOutput {
            event: "measurement",
            measurement,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["SLOT", "VALUE"]);
            table.add_row(vec![measurement.slot.to_string(), measurement.value.clone()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("measurement slot={} value={}", measurement.slot, measurement.value);
        }
        OutputFormat::Raw => print_line(&measurement.to_command().to_string()),
    }
}

#[derive(Serialize)]
struct SummaryOutput<'a, T: Serialize> {
    event: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

pub fn print_handshake(result: &HandshakeResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SummaryOutput {
            event: "handshake",
            body: result,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["HANDSHAKE", "ELAPSED", "MEASUREMENTS"]);
            table.add_row(vec![
                "ok".to_string(),
                format!("{}ms", result.elapsed_ms),
                result.measurements.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("handshake ok in {}ms", result.elapsed_ms);
        }
    }
}

pub fn print_summary(summary: &SessionSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SummaryOutput {
            event: "session",
            body: summary,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ITEMS", "MEASUREMENTS", "ELAPSED"]);
            table.add_row(vec![
                summary.items.to_string(),
                summary.measurements.to_string(),
                format!("{}ms", summary.elapsed_ms),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "sorted {} item(s), {} measurement(s) in {}ms",
                summary.items, summary.measurements, summary.elapsed_ms
            );
        }
    }
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'static str,
    product: Option<&'a str>,
}

pub fn print_ports(ports: &[SerialPortInfo], format: OutputFormat) {
    let rows: Vec<PortOutput<'_>> = ports
        .iter()
        .map(|port| PortOutput {
            name: &port.port_name,
            kind: port_kind(&port.port_type),
            product: match &port.port_type {
                SerialPortType::UsbPort(usb) => usb.product.as_deref(),
                _ => None,
            },
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = new_table(vec!["PORT", "TYPE", "PRODUCT"]);
            for row in &rows {
                table.add_row(vec![
                    row.name.to_string(),
                    row.kind.to_string(),
                    row.product.unwrap_or("-").to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!("{} ({})", row.name, row.kind);
            }
        }
    }
}

fn port_kind(port_type: &SerialPortType) -> &'static str {
    match port_type {
        SerialPortType::UsbPort(_) => "usb",
        SerialPortType::PciPort => "pci",
        SerialPortType::BluetoothPort => "bluetooth",
        SerialPortType::Unknown => "unknown",
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_line(line: &str) {
    let mut out = std::io::stdout();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

pub fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
