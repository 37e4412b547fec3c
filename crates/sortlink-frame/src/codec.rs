use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::code::{CommandCode, CODE_LEN};
use crate::error::{EncodingError, Result, ValidationError};

/// Separates the command code from the argument list.
pub const CODE_SEPARATOR: u8 = b';';

/// Separates arguments from each other.
pub const ARG_SEPARATOR: u8 = b',';

/// Largest value the length byte can carry: the whole frame, length byte included.
pub const MAX_FRAME_LEN: usize = u8::MAX as usize;

/// Largest payload (`CODE;ARGS`) that fits behind the length byte.
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - 1;

/// Line terminator appended after every outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineTerminator {
    /// `\n`
    Lf,
    /// `\r\n`, what the mainboard's `println` emits.
    #[default]
    CrLf,
}

impl LineTerminator {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineTerminator::Lf => b"\n",
            LineTerminator::CrLf => b"\r\n",
        }
    }
}

/// A protocol command: a code plus ordered string arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The command code.
    pub code: CommandCode,
    /// Arguments, in wire order.
    pub args: Vec<String>,
}

impl Command {
    /// Create a command without arguments.
    pub fn new(code: CommandCode) -> Self {
        Self {
            code,
            args: Vec::new(),
        }
    }

    /// Create a command with arguments.
    pub fn with_args<I, S>(code: CommandCode, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            code,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Number of characters in `CODE;ARGS`, excluding the length byte.
    pub fn payload_len(&self) -> usize {
        payload_len(CODE_LEN, &self.args)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.code, self.args.join(","))
    }
}

/// Encode a command into the wire format.
///
/// Wire format (no terminator; the writer appends it):
/// ```text
/// ┌──────────┬──────────┬─────┬─────────────────────────┐
/// │ Len (1B) │ Code(3B) │ ';' │ Arg1 ',' Arg2 ',' ...   │
/// │ raw byte │ ASCII    │     │ ASCII, may be empty     │
/// └──────────┴──────────┴─────┴─────────────────────────┘
/// ```
/// `Len` counts every byte of the frame including itself, so it equals the
/// payload length plus one.
pub fn encode_command(command: &Command, dst: &mut BytesMut) -> Result<()> {
    encode_frame(command.code.as_str(), &command.args, dst)
}

/// Encode a raw code and argument list into the wire format.
///
/// Validates what [`encode_command`] gets for free from [`CommandCode`]:
/// the code must be three printable ASCII characters.
pub fn encode_frame<S: AsRef<str>>(code: &str, args: &[S], dst: &mut BytesMut) -> Result<()> {
    if code.chars().count() != CODE_LEN {
        return Err(EncodingError::InvalidCodeLength {
            len: code.chars().count(),
        }
        .into());
    }
    if let Some(ch) = code.chars().find(|ch| !is_code_char(*ch)) {
        return Err(EncodingError::InvalidCodeCharacter { ch }.into());
    }

    if let [only] = args {
        if only.as_ref().is_empty() {
            return Err(EncodingError::AmbiguousEmptyArgument.into());
        }
    }
    for (index, arg) in args.iter().enumerate() {
        validate_arg(index, arg.as_ref())?;
    }

    let len = payload_len(code.len(), args);
    if len > MAX_PAYLOAD_LEN {
        return Err(EncodingError::PayloadTooLong {
            len,
            max: MAX_PAYLOAD_LEN,
        }
        .into());
    }

    dst.reserve(len + 1);
    dst.put_u8((len + 1) as u8);
    dst.put_slice(code.as_bytes());
    dst.put_u8(CODE_SEPARATOR);
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            dst.put_u8(ARG_SEPARATOR);
        }
        dst.put_slice(arg.as_ref().as_bytes());
    }
    Ok(())
}

/// Decode one received line into a command.
///
/// A trailing `\n` or `\r\n` is stripped first. The first byte is the length
/// byte and is never mistaken for a terminator.
pub fn decode_command(raw: &[u8]) -> Result<Command> {
    if raw.iter().all(|&b| b == b'\r' || b == b'\n') {
        return Err(ValidationError::EmptyFrame.into());
    }
    let line = strip_terminator(raw);
    let (&declared, body) = line.split_first().ok_or(ValidationError::EmptyFrame)?;

    if declared as usize != line.len() {
        return Err(ValidationError::LengthMismatch {
            received: declared,
            expected: line.len(),
        }
        .into());
    }

    let body = std::str::from_utf8(body)
        .ok()
        .filter(|text| text.is_ascii())
        .ok_or(ValidationError::NonAscii)?;

    let (code, rest) = body
        .split_once(CODE_SEPARATOR as char)
        .ok_or(ValidationError::MissingSeparator)?;
    let code: CommandCode = code.parse()?;

    let args = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(ARG_SEPARATOR as char).map(String::from).collect()
    };

    Ok(Command { code, args })
}

/// Remove one trailing `\n` or `\r\n`, leaving the length byte alone.
pub fn strip_terminator(raw: &[u8]) -> &[u8] {
    let mut line = raw;
    if line.len() > 1 && line.ends_with(b"\n") {
        line = &line[..line.len() - 1];
        if line.len() > 1 && line.ends_with(b"\r") {
            line = &line[..line.len() - 1];
        }
    }
    line
}

fn payload_len<S: AsRef<str>>(code_len: usize, args: &[S]) -> usize {
    let args_len: usize = args.iter().map(|arg| arg.as_ref().len()).sum();
    code_len + 1 + args_len + args.len().saturating_sub(1)
}

fn is_code_char(ch: char) -> bool {
    ch.is_ascii_graphic() && ch != CODE_SEPARATOR as char && ch != ARG_SEPARATOR as char
}

fn validate_arg(index: usize, arg: &str) -> Result<()> {
    for ch in arg.chars() {
        if ch == ARG_SEPARATOR as char {
            return Err(EncodingError::SeparatorInArgument { index }.into());
        }
        if !ch.is_ascii() || ch == '\r' || ch == '\n' {
            return Err(EncodingError::IllegalCharacter { index, ch }.into());
        }
    }
    Ok(())
}

/// Configuration for the line reader and frame writer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Longest line accepted before it is discarded. Default: one maximal frame plus `\r\n`.
    pub max_line_len: usize,
    /// Terminator appended to outbound frames.
    pub terminator: LineTerminator,
    /// Read timeout applied to the serial stream. `None` keeps the stream's setting.
    pub read_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_line_len: MAX_FRAME_LEN + 2,
            terminator: LineTerminator::default(),
            read_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;

    fn encode(command: &Command) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_command(command, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn encodes_start_command() {
        let wire = encode(&Command::new(CommandCode::Srt));
        assert_eq!(wire, b"\x05SRT;");
    }

    #[test]
    fn decodes_start_command() {
        let command = decode_command(b"\x05SRT;").unwrap();
        assert_eq!(command, Command::new(CommandCode::Srt));
    }

    #[test]
    fn zero_arg_command_ends_at_separator() {
        let wire = encode(&Command::new(CommandCode::Rdy));
        assert_eq!(wire.last(), Some(&CODE_SEPARATOR));
        assert!(!wire.contains(&ARG_SEPARATOR));

        let decoded = decode_command(&wire).unwrap();
        assert!(decoded.args.is_empty());
    }

    #[test]
    fn encodes_arguments_joined_by_comma() {
        let wire = encode(&Command::with_args(CommandCode::Mes, ["1", "220"]));
        assert_eq!(wire, b"\x0aMES;1,220");
    }

    #[test]
    fn roundtrip_with_arguments() {
        let command = Command::with_args(CommandCode::Err, ["feed jammed at slot 3"]);
        let decoded = decode_command(&encode(&command)).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn roundtrip_keeps_empty_slots() {
        let command = Command::with_args(
            CommandCode::Cup,
            ["100", "", "", "4k7", "", "", "", "", "1M"],
        );
        let decoded = decode_command(&encode(&command)).unwrap();
        assert_eq!(decoded.args.len(), 9);
        assert_eq!(decoded, command);
    }

    #[test]
    fn decode_strips_crlf_and_lf() {
        let crlf = decode_command(b"\x05ACK;\r\n").unwrap();
        let lf = decode_command(b"\x05ACK;\n").unwrap();
        assert_eq!(crlf, Command::new(CommandCode::Ack));
        assert_eq!(lf, crlf);
    }

    #[test]
    fn length_byte_equal_to_newline_is_not_a_terminator() {
        // "MES;1,220" is nine characters, so the length byte is 10 (`\n`).
        let command = decode_command(b"\nMES;1,220\r\n").unwrap();
        assert_eq!(command.code, CommandCode::Mes);
        assert_eq!(command.args, vec!["1", "220"]);
    }

    #[test]
    fn decremented_length_byte_is_reported() {
        let mut wire = encode(&Command::new(CommandCode::Srt));
        wire[0] -= 1;
        let err = decode_command(&wire).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Validation(ValidationError::LengthMismatch {
                received: 4,
                expected: 5
            })
        ));
    }

    #[test]
    fn truncated_frame_is_reported() {
        let err = decode_command(b"\x0aMES;1,22").unwrap_err();
        assert!(matches!(
            err,
            FrameError::Validation(ValidationError::LengthMismatch {
                received: 10,
                expected: 9
            })
        ));
    }

    #[test]
    fn missing_separator_is_rejected() {
        let err = decode_command(b"\x04RDY").unwrap_err();
        assert!(matches!(
            err,
            FrameError::Validation(ValidationError::MissingSeparator)
        ));
    }

    #[test]
    fn short_code_is_rejected() {
        let err = decode_command(b"\x04RD;").unwrap_err();
        assert!(matches!(
            err,
            FrameError::Validation(ValidationError::InvalidCodeLength { len: 2 })
        ));
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = decode_command(b"\x05XYZ;").unwrap_err();
        assert!(matches!(
            err,
            FrameError::Validation(ValidationError::UnknownCode(ref code)) if code == "XYZ"
        ));
    }

    #[test]
    fn non_ascii_is_rejected() {
        let err = decode_command(b"\x06DAT;\xff").unwrap_err();
        assert!(matches!(err, FrameError::Validation(ValidationError::NonAscii)));
    }

    #[test]
    fn empty_line_is_rejected() {
        let err = decode_command(b"").unwrap_err();
        assert!(matches!(err, FrameError::Validation(ValidationError::EmptyFrame)));
    }

    #[test]
    fn blank_lines_are_empty_frames() {
        let blanks: [&[u8]; 3] = [b"\n", b"\r\n", b"\r"];
        for raw in blanks {
            let err = decode_command(raw).unwrap_err();
            assert!(matches!(err, FrameError::Validation(ValidationError::EmptyFrame)));
        }
    }

    #[test]
    fn encode_rejects_bad_code_length() {
        let mut buf = BytesMut::new();
        let err = encode_frame("RDYY", &[] as &[&str], &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Encoding(EncodingError::InvalidCodeLength { len: 4 })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn encode_rejects_separator_in_code() {
        let mut buf = BytesMut::new();
        let err = encode_frame("R;Y", &[] as &[&str], &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Encoding(EncodingError::InvalidCodeCharacter { ch: ';' })
        ));
    }

    #[test]
    fn encode_rejects_comma_in_argument() {
        let mut buf = BytesMut::new();
        let command = Command::with_args(CommandCode::Dat, ["1,2"]);
        let err = encode_command(&command, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Encoding(EncodingError::SeparatorInArgument { index: 0 })
        ));
    }

    #[test]
    fn encode_rejects_line_break_in_argument() {
        let mut buf = BytesMut::new();
        let command = Command::with_args(CommandCode::Err, ["ok", "bad\nline"]);
        let err = encode_command(&command, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Encoding(EncodingError::IllegalCharacter { index: 1, ch: '\n' })
        ));
    }

    #[test]
    fn encode_rejects_lone_empty_argument() {
        let mut buf = BytesMut::new();
        let command = Command::with_args(CommandCode::Dat, [""]);
        let err = encode_command(&command, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Encoding(EncodingError::AmbiguousEmptyArgument)
        ));
    }

    #[test]
    fn encode_accepts_longest_payload() {
        // "DAT;" plus 250 characters is 254, the last length that fits.
        let command = Command::with_args(CommandCode::Dat, ["x".repeat(250)]);
        let wire = encode(&command);
        assert_eq!(wire[0], 255);
        assert_eq!(wire.len(), 255);
        assert_eq!(decode_command(&wire).unwrap(), command);
    }

    #[test]
    fn encode_rejects_payload_overflowing_length_byte() {
        let mut buf = BytesMut::new();
        let command = Command::with_args(CommandCode::Dat, ["x".repeat(251)]);
        let err = encode_command(&command, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Encoding(EncodingError::PayloadTooLong { len: 255, max: 254 })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn payload_len_matches_encoding() {
        let command = Command::with_args(CommandCode::Mtc, ["7"]);
        assert_eq!(command.payload_len() + 1, encode(&command).len());
    }

    #[test]
    fn display_shows_wire_text() {
        let command = Command::with_args(CommandCode::Mes, ["2", "330"]);
        assert_eq!(command.to_string(), "MES;2,330");
    }
}
