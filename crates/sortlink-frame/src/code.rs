//! Command code vocabulary.
//!
//! Every frame starts with one of these three-character codes. The set is
//! closed: a code outside of it is rejected by the decoder.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Length of every command code on the wire.
pub const CODE_LEN: usize = 3;

/// A protocol command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    /// Device or host ready.
    Rdy,
    /// Acknowledge the prior command.
    Ack,
    /// Advance to the next item.
    Nxt,
    /// Terminate the current session.
    End,
    /// Session completed (device to host).
    Don,
    /// Error report, one message argument.
    Err,
    /// Generic data payload, one argument.
    Dat,
    /// Asynchronous measurement: slot id and measured value.
    Mes,
    /// Start a sort session.
    Srt,
    /// Cycle the step feeder.
    Cfd,
    /// Move the sort wheel to a cup.
    Mtc,
    /// Cycle the dispense arm.
    Cda,
    /// Halt the mainboard.
    Hcf,
    /// Reset the mainboard.
    Rst,
    /// Per-cup sort configuration, nine slots.
    Cup,
}

impl CommandCode {
    /// All known codes, in vocabulary order.
    pub const ALL: [CommandCode; 15] = [
        CommandCode::Rdy,
        CommandCode::Ack,
        CommandCode::Nxt,
        CommandCode::End,
        CommandCode::Don,
        CommandCode::Err,
        CommandCode::Dat,
        CommandCode::Mes,
        CommandCode::Srt,
        CommandCode::Cfd,
        CommandCode::Mtc,
        CommandCode::Cda,
        CommandCode::Hcf,
        CommandCode::Rst,
        CommandCode::Cup,
    ];

    /// Wire spelling of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandCode::Rdy => "RDY",
            CommandCode::Ack => "ACK",
            CommandCode::Nxt => "NXT",
            CommandCode::End => "END",
            CommandCode::Don => "DON",
            CommandCode::Err => "ERR",
            CommandCode::Dat => "DAT",
            CommandCode::Mes => "MES",
            CommandCode::Srt => "SRT",
            CommandCode::Cfd => "CFD",
            CommandCode::Mtc => "MTC",
            CommandCode::Cda => "CDA",
            CommandCode::Hcf => "HCF",
            CommandCode::Rst => "RST",
            CommandCode::Cup => "CUP",
        }
    }

    /// Short human-readable description.
    pub fn describe(self) -> &'static str {
        match self {
            CommandCode::Rdy => "ready",
            CommandCode::Ack => "acknowledge",
            CommandCode::Nxt => "next item",
            CommandCode::End => "end session",
            CommandCode::Don => "session done",
            CommandCode::Err => "error",
            CommandCode::Dat => "data",
            CommandCode::Mes => "measurement",
            CommandCode::Srt => "start sort",
            CommandCode::Cfd => "cycle feed",
            CommandCode::Mtc => "move to cup",
            CommandCode::Cda => "cycle dispense arm",
            CommandCode::Hcf => "halt mainboard",
            CommandCode::Rst => "reset mainboard",
            CommandCode::Cup => "cup configuration",
        }
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, ValidationError> {
        if s.len() != CODE_LEN {
            return Err(ValidationError::InvalidCodeLength { len: s.len() });
        }
        CommandCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownCode(s.to_string()))
    }
}
