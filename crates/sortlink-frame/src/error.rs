/// A command that cannot be put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// The command code is not exactly three characters.
    #[error("command code must be 3 characters, got {len}")]
    InvalidCodeLength { len: usize },

    /// The command code contains a separator, control or non-ASCII character.
    #[error("command code contains illegal character {ch:?}")]
    InvalidCodeCharacter { ch: char },

    /// An argument contains the argument separator `,`.
    #[error("argument {index} contains the ',' separator")]
    SeparatorInArgument { index: usize },

    /// An argument contains a line terminator or non-ASCII character.
    #[error("argument {index} contains illegal character {ch:?}")]
    IllegalCharacter { index: usize, ch: char },

    /// A lone empty argument encodes identically to no arguments at all.
    #[error("a single empty argument cannot be distinguished from no arguments")]
    AmbiguousEmptyArgument,

    /// The payload does not fit the single length byte.
    #[error("payload too long ({len} characters, max {max})")]
    PayloadTooLong { len: usize, max: usize },
}

/// An inbound line that is not a well-formed frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Nothing but a line terminator was received.
    #[error("empty frame")]
    EmptyFrame,

    /// The length byte disagrees with the number of bytes received.
    #[error("length byte mismatch: received {received}, expected {expected}")]
    LengthMismatch { received: u8, expected: usize },

    /// The frame body contains bytes outside of ASCII.
    #[error("frame contains non-ASCII bytes")]
    NonAscii,

    /// No `;` separates the command code from its arguments.
    #[error("frame has no ';' after the command code")]
    MissingSeparator,

    /// The text before `;` is not exactly three characters.
    #[error("command code must be 3 characters, got {len}")]
    InvalidCodeLength { len: usize },

    /// The command code is not part of the protocol vocabulary.
    #[error("unknown command code '{0}'")]
    UnknownCode(String),
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Outbound command rejected before anything was written.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Inbound line rejected by the decoder.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No line terminator arrived within the maximum line length.
    #[error("line too long ({len} bytes, max {max}) without terminator")]
    LineTooLong { len: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed before a complete line was received.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True for errors that concern a single line and leave the link usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameError::Validation(_) | FrameError::LineTooLong { .. }
        )
    }

    /// True when a blocking read gave up because no data arrived in time.
    pub fn is_timeout(&self) -> bool {
        match self {
            FrameError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
