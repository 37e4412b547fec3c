/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Enumerating the serial ports of the host failed.
    #[error("failed to enumerate serial ports: {0}")]
    Discovery(serialport::Error),

    /// No enumerated port matched the discovery hint.
    #[error("no serial port matching '{hint}' found")]
    NoPortFound { hint: String },

    /// More than one enumerated port matched the discovery hint.
    #[error("several serial ports match '{hint}': {}", candidates.join(", "))]
    AmbiguousPort {
        hint: String,
        candidates: Vec<String>,
    },

    /// The port could not be opened within the configured number of attempts.
    #[error("failed to open {path} after {attempts} attempt(s): {source}")]
    Open {
        path: String,
        attempts: u32,
        source: serialport::Error,
    },

    /// A port setting could not be applied or a handle could not be cloned.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on the serial stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
