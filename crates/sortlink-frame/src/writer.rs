use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{encode_command, Command, FrameConfig, MAX_FRAME_LEN};
use crate::error::{FrameError, Result};

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_LEN + 2),
            config,
        }
    }

    /// Encode and send a command followed by the line terminator (blocking).
    ///
    /// Nothing is written when encoding fails.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        self.buf.clear();
        encode_command(command, &mut self.buf)?;
        self.buf
            .extend_from_slice(self.config.terminator.as_bytes());

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        trace!(len = self.buf.len(), "frame written");

        self.flush()
    }

    /// Bytes of the most recently sent frame, terminator included.
    pub fn last_frame(&self) -> &[u8] {
        &self.buf
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::code::CommandCode;
    use crate::codec::{decode_command, LineTerminator};
    use crate::error::EncodingError;

    #[test]
    fn write_single_frame_with_crlf() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&Command::new(CommandCode::Nxt)).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire, b"\x05NXT;\r\n");
        assert_eq!(
            decode_command(&wire).unwrap(),
            Command::new(CommandCode::Nxt)
        );
    }

    #[test]
    fn write_with_lf_terminator() {
        let cfg = FrameConfig {
            terminator: LineTerminator::Lf,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);
        writer
            .send(&Command::with_args(CommandCode::Mtc, ["9"]))
            .unwrap();
        assert_eq!(writer.last_frame(), b"\x06MTC;9\n");
        assert_eq!(writer.into_inner().into_inner(), b"\x06MTC;9\n");
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&Command::new(CommandCode::End)).unwrap();
        writer
            .send(&Command::with_args(CommandCode::Err, ["jam"]))
            .unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire, b"\x05END;\r\n\x08ERR;jam\r\n");
    }

    #[test]
    fn encoding_error_writes_nothing() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer
            .send(&Command::with_args(CommandCode::Dat, ["a,b"]))
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::Encoding(EncodingError::SeparatorInArgument { index: 0 })
        ));
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        let mut writer = FrameWriter::new(ClosedWriter);
        let err = writer.send(&Command::new(CommandCode::Rdy)).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn write_error_propagates() {
        let mut writer = FrameWriter::new(BrokenWriter);
        let err = writer.send(&Command::new(CommandCode::Rdy)).unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn short_writes_are_completed() {
        let mut writer = FrameWriter::new(OneBytePerWrite(Vec::new()));
        writer
            .send(&Command::with_args(CommandCode::Dat, ["chunked"]))
            .unwrap();
        assert_eq!(writer.get_ref().0, b"\x0cDAT;chunked\r\n");
    }

    struct ClosedWriter;

    impl Write for ClosedWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct OneBytePerWrite(Vec<u8>);

    impl Write for OneBytePerWrite {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            match buf.first() {
                Some(&b) => {
                    self.0.push(b);
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
