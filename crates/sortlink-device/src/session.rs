//! Sort session driver.
//!
//! A session runs `SRT` → `RDY`, then one exchange per local trigger:
//!
//! - advance: `NXT`, wait `ACK` (command received), wait `RDY` (motion done)
//! - terminate: `END`, wait `ACK`, wait `DON`
//!
//! The next `NXT` is never sent before the previous `RDY` has arrived.

use std::collections::VecDeque;
use std::io::{self, BufRead, Read, Write};
use std::time::Instant;

use serde::Serialize;
use sortlink_frame::CommandCode;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{DeviceError, Result};

/// A discrete user action gating the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Sort the next item.
    Advance,
    /// End the session.
    Terminate,
}

/// Source of session triggers, usually a person at a keyboard.
pub trait TriggerSource {
    /// Block until the next trigger.
    fn next_trigger(&mut self) -> io::Result<Trigger>;
}

/// Pre-recorded triggers. Yields [`Trigger::Terminate`] once exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTriggers {
    queue: VecDeque<Trigger>,
}

impl ScriptedTriggers {
    pub fn new(triggers: impl IntoIterator<Item = Trigger>) -> Self {
        Self {
            queue: triggers.into_iter().collect(),
        }
    }

    /// `count` advances followed by a terminate.
    pub fn advance_times(count: usize) -> Self {
        Self::new(std::iter::repeat(Trigger::Advance).take(count))
    }
}

impl TriggerSource for ScriptedTriggers {
    fn next_trigger(&mut self) -> io::Result<Trigger> {
        Ok(self.queue.pop_front().unwrap_or(Trigger::Terminate))
    }
}

/// Triggers read one per line from a text stream.
///
/// An empty line, `n` or `next` advances; `q`, `quit` or `end` terminates,
/// as does end of input. Anything else is ignored.
pub struct LineTriggers<B> {
    input: B,
    line: String,
}

impl<B: BufRead> LineTriggers<B> {
    pub fn new(input: B) -> Self {
        Self {
            input,
            line: String::new(),
        }
    }
}

impl<B: BufRead> TriggerSource for LineTriggers<B> {
    fn next_trigger(&mut self) -> io::Result<Trigger> {
        loop {
            self.line.clear();
            if self.input.read_line(&mut self.line)? == 0 {
                return Ok(Trigger::Terminate);
            }
            match self.line.trim().to_ascii_lowercase().as_str() {
                "" | "n" | "next" => return Ok(Trigger::Advance),
                "q" | "quit" | "end" => return Ok(Trigger::Terminate),
                other => warn!(input = other, "ignoring unrecognised trigger"),
            }
        }
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    /// The device is ready for the next trigger.
    Idle,
    /// An exchange is in progress, or one failed part way.
    InFlight,
    Finished,
}

/// Totals for a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub items: usize,
    pub measurements: usize,
    pub elapsed_ms: u64,
}

/// One sort session over a borrowed device.
pub struct SortSession<'a, R, W> {
    device: &'a mut Device<R, W>,
    state: SessionState,
    items: usize,
    measurements_before: usize,
    started: Instant,
}

impl<'a, R: Read, W: Write> SortSession<'a, R, W> {
    pub fn new(device: &'a mut Device<R, W>) -> Self {
        let measurements_before = device.measurements_seen();
        Self {
            device,
            state: SessionState::NotStarted,
            items: 0,
            measurements_before,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Items advanced so far.
    pub fn items(&self) -> usize {
        self.items
    }

    /// Send `SRT` and wait for the device to report ready.
    pub fn start(&mut self) -> Result<()> {
        self.transition(SessionState::NotStarted, "start")?;
        self.started = Instant::now();
        self.device.send_start()?;
        self.device.wait_for(CommandCode::Rdy)?;
        self.state = SessionState::Idle;
        info!("sort session started");
        Ok(())
    }

    /// Sort one item.
    pub fn advance(&mut self) -> Result<()> {
        self.transition(SessionState::Idle, "advance")?;
        self.device.send_next()?;
        self.device.wait_for(CommandCode::Ack)?;
        self.device.wait_for(CommandCode::Rdy)?;
        self.items += 1;
        self.state = SessionState::Idle;
        debug!(items = self.items, "item sorted");
        Ok(())
    }

    /// Send `END` and wait for the device to finish the session.
    pub fn finish(&mut self) -> Result<SessionSummary> {
        self.transition(SessionState::Idle, "finish")?;
        self.device.send_end()?;
        self.device.wait_for(CommandCode::Ack)?;
        self.device.wait_for(CommandCode::Don)?;
        self.state = SessionState::Finished;

        let summary = self.summary();
        info!(
            items = summary.items,
            measurements = summary.measurements,
            elapsed_ms = summary.elapsed_ms,
            "sort session finished"
        );
        Ok(summary)
    }

    /// Start, follow `triggers` until a terminate, then finish.
    pub fn run(mut self, triggers: &mut dyn TriggerSource) -> Result<SessionSummary> {
        self.start()?;
        loop {
            self.check_cancelled()?;
            let trigger = triggers.next_trigger().map_err(DeviceError::Trigger)?;
            self.check_cancelled()?;
            match trigger {
                Trigger::Advance => self.advance()?,
                Trigger::Terminate => return self.finish(),
            }
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            items: self.items,
            measurements: self.device.measurements_seen() - self.measurements_before,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    fn transition(&mut self, required: SessionState, operation: &str) -> Result<()> {
        if self.state != required {
            return Err(DeviceError::Protocol(format!(
                "cannot {operation} a sort session in state {:?}",
                self.state
            )));
        }
        self.state = SessionState::InFlight;
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.device.cancel_token().is_cancelled() {
            return Err(DeviceError::Cancelled { expected: None });
        }
        Ok(())
    }
}

/// Run a complete sort session on `device`.
pub fn run_sort_session<R: Read, W: Write>(
    device: &mut Device<R, W>,
    triggers: &mut dyn TriggerSource,
) -> Result<SessionSummary> {
    SortSession::new(device).run(triggers)
}
