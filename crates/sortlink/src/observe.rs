use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use sortlink_device::{Corruption, LinkObserver, Measurement};
use sortlink_frame::{strip_terminator, Command};
use tracing::warn;

use crate::output::{now_unix_seconds, print_measurement, OutputFormat};

/// Append-only record of raw link traffic.
///
/// One line per event: `<unix seconds> <TX|RX|MES|BAD> <detail>`. Received
/// lines are written with non-printable bytes escaped, so the length byte is
/// visible.
pub struct WireLog {
    out: BufWriter<File>,
    failed: bool,
}

impl WireLog {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
            failed: false,
        })
    }

    fn record(&mut self, kind: &str, detail: &str) {
        if self.failed {
            return;
        }
        let result = writeln!(self.out, "{} {kind} {detail}", now_unix_seconds())
            .and_then(|()| self.out.flush());
        if let Err(err) = result {
            warn!(error = %err, "wire log write failed, disabling wire log");
            self.failed = true;
        }
    }
}

impl LinkObserver for WireLog {
    fn on_sent(&mut self, _command: &Command, wire: &[u8]) {
        self.record("TX", &escape(strip_terminator(wire)));
    }

    fn on_received(&mut self, wire: &[u8]) {
        self.record("RX", &escape(strip_terminator(wire)));
    }

    fn on_measurement(&mut self, measurement: &Measurement) {
        self.record(
            "MES",
            &format!("slot={} value={}", measurement.slot, measurement.value),
        );
    }

    fn on_corrupt(&mut self, corruption: &Corruption) {
        self.record("BAD", &corruption.to_string());
    }
}

/// Render bytes as ASCII with `\xNN` escapes for anything non-printable.
pub fn escape(bytes: &[u8]) -> String {
    bytes
        .iter()
        .flat_map(|&b| std::ascii::escape_default(b))
        .map(char::from)
        .collect()
}

/// Observer installed by the CLI: prints measurements to stdout and
/// optionally mirrors traffic to a wire log.
pub struct CliObserver {
    measurements: Option<OutputFormat>,
    wire_log: Option<WireLog>,
}

impl CliObserver {
    pub fn new(measurements: Option<OutputFormat>, wire_log: Option<WireLog>) -> Self {
        Self {
            measurements,
            wire_log,
        }
    }
}

impl LinkObserver for CliObserver {
    fn on_sent(&mut self, command: &Command, wire: &[u8]) {
        if let Some(log) = &mut self.wire_log {
            log.on_sent(command, wire);
        }
    }

    fn on_received(&mut self, wire: &[u8]) {
        if let Some(log) = &mut self.wire_log {
            log.on_received(wire);
        }
    }

    fn on_measurement(&mut self, measurement: &Measurement) {
        if let Some(format) = self.measurements {
            print_measurement(measurement, format);
        }
        if let Some(log) = &mut self.wire_log {
            log.on_measurement(measurement);
        }
    }

    fn on_corrupt(&mut self, corruption: &Corruption) {
        if let Some(log) = &mut self.wire_log {
            log.on_corrupt(corruption);
        }
    }
}
