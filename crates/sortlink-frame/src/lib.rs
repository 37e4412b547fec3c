//! Length-byte ASCII command framing for the sorter mainboard protocol.
//!
//! Every message is one line:
//! - A single raw length byte (frame length including itself)
//! - A three-character command code and `;`
//! - Zero or more `,`-separated ASCII arguments
//! - A line terminator
//!
//! The length byte is a tripwire for truncated or merged lines, not a
//! checksum. No partial reads, no buffer management in user code.

pub mod code;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use code::{CommandCode, CODE_LEN};
pub use codec::{
    decode_command, encode_command, encode_frame, strip_terminator, Command, FrameConfig,
    LineTerminator, MAX_FRAME_LEN, MAX_PAYLOAD_LEN,
};
pub use error::{EncodingError, FrameError, Result, ValidationError};
pub use reader::LineReader;
pub use writer::FrameWriter;
