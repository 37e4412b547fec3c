use std::time::Duration;

use serialport::SerialPortInfo;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::SerialStream;

/// Configuration for locating and opening the mainboard port.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Explicit device path. When `None`, the port is discovered by `port_hint`.
    pub path: Option<String>,
    /// Substring that identifies the mainboard among enumerated ports.
    pub port_hint: String,
    /// Line speed. The mainboard firmware runs at 9600 baud.
    pub baud_rate: u32,
    /// Per-read timeout; also the polling granularity of blocking waits.
    pub read_timeout: Duration,
    /// How many times to try opening the port before giving up.
    pub open_attempts: u32,
    /// Delay between open attempts.
    pub retry_delay: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: None,
            port_hint: "ACM".to_string(),
            baud_rate: 9600,
            read_timeout: Duration::from_millis(100),
            open_attempts: 10,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Enumerate the serial ports visible to this host.
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    serialport::available_ports().map_err(TransportError::Discovery)
}

/// Pick the single port whose name contains `hint`.
pub fn select_port(ports: &[SerialPortInfo], hint: &str) -> Result<String> {
    let mut candidates: Vec<String> = ports
        .iter()
        .filter(|port| port.port_name.contains(hint))
        .map(|port| port.port_name.clone())
        .collect();

    match candidates.len() {
        0 => Err(TransportError::NoPortFound {
            hint: hint.to_string(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(TransportError::AmbiguousPort {
            hint: hint.to_string(),
            candidates,
        }),
    }
}

/// Find the mainboard port among the enumerated ports.
///
/// The port name can change across board resets, so it is looked up each
/// time instead of being remembered.
pub fn discover_port(hint: &str) -> Result<String> {
    let ports = list_ports()?;
    debug!(count = ports.len(), hint, "enumerated serial ports");
    select_port(&ports, hint)
}

/// Open the mainboard port described by `config`.
pub fn open(config: &SerialConfig) -> Result<SerialStream> {
    let path = match &config.path {
        Some(path) => path.clone(),
        None => discover_port(&config.port_hint)?,
    };

    let port = open_with_retry(&path, config.open_attempts, config.retry_delay, |path| {
        serialport::new(path, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
    })?;

    info!(path = %path, baud = config.baud_rate, "serial port open");
    Ok(SerialStream::from_port(port))
}

/// Call `opener` until it succeeds or `attempts` is exhausted.
///
/// The board enumerates its USB serial device before the firmware is ready,
/// so the first few opens commonly fail.
pub(crate) fn open_with_retry<T, F>(
    path: &str,
    attempts: u32,
    delay: Duration,
    mut opener: F,
) -> Result<T>
where
    F: FnMut(&str) -> serialport::Result<T>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match opener(path) {
            Ok(port) => return Ok(port),
            Err(source) if attempt >= attempts => {
                return Err(TransportError::Open {
                    path: path.to_string(),
                    attempts,
                    source,
                });
            }
            Err(err) => {
                warn!(path, attempt, error = %err, "serial open failed, retrying");
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serialport::{ErrorKind, SerialPortType};

    use super::*;

    fn port(name: &str) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::Unknown,
        }
    }

    #[test]
    fn select_single_matching_port() {
        let ports = vec![port("/dev/ttyS0"), port("/dev/ttyACM0"), port("/dev/ttyUSB1")];
        assert_eq!(select_port(&ports, "ACM").unwrap(), "/dev/ttyACM0");
    }

    #[test]
    fn select_reports_missing_port() {
        let ports = vec![port("/dev/ttyS0")];
        let err = select_port(&ports, "ACM").unwrap_err();
        assert!(matches!(err, TransportError::NoPortFound { ref hint } if hint == "ACM"));
    }

    #[test]
    fn select_rejects_ambiguous_ports() {
        let ports = vec![port("/dev/ttyACM0"), port("/dev/ttyACM1")];
        let err = select_port(&ports, "ACM").unwrap_err();
        match err {
            TransportError::AmbiguousPort { candidates, .. } => {
                assert_eq!(candidates, vec!["/dev/ttyACM0", "/dev/ttyACM1"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn open_retries_until_success() {
        let mut calls = 0;
        let result = open_with_retry("/dev/ttyACM0", 3, Duration::ZERO, |_| {
            calls += 1;
            if calls < 3 {
                Err(serialport::Error::new(ErrorKind::NoDevice, "booting"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn open_gives_up_after_attempts() {
        let mut calls = 0;
        let result: Result<()> = open_with_retry("/dev/ttyACM0", 2, Duration::ZERO, |_| {
            calls += 1;
            Err(serialport::Error::new(ErrorKind::NoDevice, "absent"))
        });
        assert_eq!(calls, 2);
        assert!(matches!(
            result,
            Err(TransportError::Open { attempts: 2, .. })
        ));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _: Result<()> = open_with_retry("/dev/ttyACM0", 0, Duration::ZERO, |_| {
            calls += 1;
            Err(serialport::Error::new(ErrorKind::NoDevice, "absent"))
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn default_config_matches_mainboard() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.baud_rate, 9600);
        assert_eq!(cfg.port_hint, "ACM");
        assert!(cfg.path.is_none());
    }
}
