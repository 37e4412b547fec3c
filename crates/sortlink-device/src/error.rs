use std::time::Duration;

use sortlink_frame::CommandCode;

/// Errors that can occur while driving the mainboard.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] sortlink_transport::TransportError),

    /// Frame-level error that is not recoverable on the link (I/O, encoding).
    #[error("frame error: {0}")]
    Frame(#[from] sortlink_frame::FrameError),

    /// Nothing acceptable arrived in time. `expected` is `None` when any
    /// command would have done.
    #[error("timed out after {waited:?} waiting for {}", awaited(.expected))]
    Timeout {
        expected: Option<CommandCode>,
        waited: Duration,
    },

    /// The wait was cancelled by the caller.
    #[error("cancelled while waiting for {}", awaited(.expected))]
    Cancelled { expected: Option<CommandCode> },

    /// The link closed.
    #[error("device disconnected: {0}")]
    Disconnected(String),

    /// A command does not have the shape its code requires, or an
    /// operation was issued out of protocol order.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The local trigger source failed.
    #[error("trigger source failed: {0}")]
    Trigger(#[source] std::io::Error),
}

fn awaited(expected: &Option<CommandCode>) -> String {
    match expected {
        Some(code) => code.to_string(),
        None => "any command".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
