//! Blocking wait for a specific reply.
//!
//! The mainboard interleaves asynchronous `MES` reports with its replies to
//! host commands. [`Device::wait_for`] reads one line at a time, classifies
//! it as an [`Inbound`] and dispatches on that single value:
//!
//! - `Expected`: the awaited code, returned to the caller.
//! - `SideChannel`: a measurement, surfaced to the observer; keep listening.
//! - `Unexpected`: any other well-formed command, logged; keep listening.
//! - `Corrupt`: a line that failed validation, logged; keep listening.
//!
//! Only I/O failures, a closed link, the timeout and cancellation end a wait
//! without the expected command.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use bytes::Bytes;
use sortlink_frame::{decode_command, Command, CommandCode, FrameError};
use tracing::{debug, info, trace, warn};

use crate::device::Device;
use crate::error::{DeviceError, Result};
use crate::message::Measurement;

/// The code reserved for asynchronous measurement reports.
pub const SIDE_CHANNEL_CODE: CommandCode = CommandCode::Mes;

/// Why a received line was dropped.
#[derive(Debug, thiserror::Error)]
pub enum Corruption {
    /// The line failed framing or validation.
    #[error(transparent)]
    Frame(FrameError),

    /// A measurement report did not have the slot/value shape.
    #[error("malformed measurement {command}: {reason}")]
    Measurement { command: Command, reason: String },
}

/// Classification of one received line relative to the awaited code.
#[derive(Debug)]
pub enum Inbound {
    Expected(Command),
    SideChannel(Measurement),
    Unexpected(Command),
    Corrupt(Corruption),
}

/// Classify a decoded line against the awaited code.
pub fn classify(
    decoded: std::result::Result<Command, FrameError>,
    expected: CommandCode,
) -> Inbound {
    let command = match decoded {
        Ok(command) => command,
        Err(err) => return Inbound::Corrupt(Corruption::Frame(err)),
    };

    if command.code == SIDE_CHANNEL_CODE {
        return match Measurement::from_command(&command) {
            Ok(measurement) => Inbound::SideChannel(measurement),
            Err(err) => Inbound::Corrupt(Corruption::Measurement {
                command,
                reason: err.to_string(),
            }),
        };
    }

    if command.code == expected {
        Inbound::Expected(command)
    } else {
        Inbound::Unexpected(command)
    }
}

impl<R: Read, W: Write> Device<R, W> {
    /// Block until `expected` arrives, using the configured wait timeout.
    pub fn wait_for(&mut self, expected: CommandCode) -> Result<Command> {
        self.wait_for_within(expected, self.config.wait_timeout)
    }

    /// Block until `expected` arrives or `timeout` elapses.
    ///
    /// Measurements, unexpected commands and corrupt lines received in the
    /// meantime are handled and do not end the wait.
    pub fn wait_for_within(
        &mut self,
        expected: CommandCode,
        timeout: Option<Duration>,
    ) -> Result<Command> {
        if expected == SIDE_CHANNEL_CODE {
            return Err(DeviceError::Protocol(format!(
                "{SIDE_CHANNEL_CODE} is reserved for side-channel reports and cannot be awaited"
            )));
        }

        let started = Instant::now();
        debug!(%expected, "waiting");

        loop {
            let decoded = match self.next_line(Some(expected), started, timeout)? {
                Some(line) => decode_command(&line),
                None => continue,
            };

            match classify(decoded, expected) {
                Inbound::Expected(command) => {
                    debug!(
                        code = %command.code,
                        args = ?command.args,
                        waited_ms = started.elapsed().as_millis() as u64,
                        "received expected command"
                    );
                    return Ok(command);
                }
                Inbound::SideChannel(measurement) => self.handle_measurement(measurement)?,
                Inbound::Unexpected(command) => {
                    if command.code == CommandCode::Err {
                        warn!(
                            %expected,
                            message = command.arg(0).unwrap_or(""),
                            "device reported error"
                        );
                    } else {
                        warn!(
                            %expected,
                            code = %command.code,
                            args = ?command.args,
                            "unexpected command received"
                        );
                    }
                    self.observer.on_unexpected(expected, &command);
                }
                Inbound::Corrupt(corruption) => {
                    warn!(%expected, error = %corruption, "dropping corrupt line");
                    self.observer.on_corrupt(&corruption);
                }
            }
        }
    }

    /// Block until any well-formed command arrives.
    ///
    /// Corrupt lines are logged and skipped; measurements are returned like
    /// any other command but also counted and passed to the observer.
    pub fn receive(&mut self, timeout: Option<Duration>) -> Result<Command> {
        let started = Instant::now();
        loop {
            let line = match self.next_line(None, started, timeout)? {
                Some(line) => line,
                None => continue,
            };
            match decode_command(&line) {
                Ok(command) => {
                    if let Ok(measurement) = Measurement::from_command(&command) {
                        self.measurements += 1;
                        self.observer.on_measurement(&measurement);
                    }
                    return Ok(command);
                }
                Err(err) => {
                    let corruption = Corruption::Frame(err);
                    warn!(error = %corruption, "dropping corrupt line");
                    self.observer.on_corrupt(&corruption);
                }
            }
        }
    }

    /// One read attempt. `Ok(None)` means no complete line yet.
    fn next_line(
        &mut self,
        expected: Option<CommandCode>,
        started: Instant,
        timeout: Option<Duration>,
    ) -> Result<Option<Bytes>> {
        if self.cancel.is_cancelled() {
            return Err(DeviceError::Cancelled { expected });
        }
        if let Some(limit) = timeout {
            let waited = started.elapsed();
            if waited >= limit {
                warn!(?expected, waited_ms = waited.as_millis() as u64, "wait timed out");
                return Err(DeviceError::Timeout { expected, waited });
            }
        }

        match self.reader.read_line() {
            Ok(line) => {
                self.last_rx = Instant::now();
                self.observer.on_received(&line);
                Ok(Some(line))
            }
            Err(err) if err.is_timeout() => {
                trace!(
                    ?expected,
                    stalled_ms = self.last_rx.elapsed().as_millis() as u64,
                    "no data yet"
                );
                Ok(None)
            }
            Err(err) if err.is_recoverable() => {
                let corruption = Corruption::Frame(err);
                warn!(?expected, error = %corruption, "dropping corrupt line");
                self.observer.on_corrupt(&corruption);
                Ok(None)
            }
            Err(FrameError::ConnectionClosed) => Err(DeviceError::Disconnected(
                "link closed while waiting for a reply".to_string(),
            )),
            Err(err) => Err(DeviceError::Frame(err)),
        }
    }

    fn handle_measurement(&mut self, measurement: Measurement) -> Result<()> {
        info!(slot = measurement.slot, value = %measurement.value, "measurement");
        self.measurements += 1;
        self.observer.on_measurement(&measurement);
        if self.config.ack_measurements {
            self.send(&Command::new(CommandCode::Ack))?;
        }
        Ok(())
    }
}
