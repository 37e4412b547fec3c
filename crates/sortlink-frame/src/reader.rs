use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use sortlink_transport::SerialStream;
use tracing::trace;

use crate::codec::{decode_command, Command, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 256;

/// Stripped line length declared by a `\n` length byte.
const NEWLINE_FRAME_LEN: usize = b'\n' as usize;

/// Reads complete lines from any `Read` stream.
///
/// Handles partial reads internally. Callers always get whole lines.
/// Bytes already buffered survive a read error, so a timed-out read can
/// simply be retried.
pub struct LineReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> LineReader<T> {
    /// Create a new line reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new line reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete line, terminator included (blocking).
    ///
    /// The first byte of a line is the frame's length byte and is never
    /// taken as the terminator. Returns `Err(FrameError::ConnectionClosed)`
    /// when EOF is reached.
    pub fn read_line(&mut self) -> Result<Bytes> {
        loop {
            if let Some(line) = self.take_line()? {
                trace!(len = line.len(), "line received");
                return Ok(line);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read and decode the next command (blocking).
    pub fn read_command(&mut self) -> Result<Command> {
        let line = self.read_line()?;
        decode_command(&line)
    }

    fn take_line(&mut self) -> Result<Option<Bytes>> {
        let terminator = self
            .buf
            .iter()
            .skip(1)
            .position(|&b| b == b'\n')
            .map(|pos| pos + 1);

        // A leading `\n` is a length byte only when the line it starts is
        // exactly as long as it declares. Otherwise it is a blank line.
        if self.buf.first() == Some(&b'\n') {
            let is_frame = match terminator {
                Some(end) => {
                    let stripped = if end >= 2 && self.buf[end - 1] == b'\r' {
                        end - 1
                    } else {
                        end
                    };
                    stripped == NEWLINE_FRAME_LEN
                }
                None if self.buf.len() > NEWLINE_FRAME_LEN + 1 => false,
                None => return Ok(None),
            };
            if !is_frame {
                return Ok(Some(self.buf.split_to(1).freeze()));
            }
        }

        if let Some(end) = terminator {
            return Ok(Some(self.buf.split_to(end + 1).freeze()));
        }

        if self.buf.len() > self.config.max_line_len {
            let len = self.buf.len();
            self.buf.clear();
            return Err(FrameError::LineTooLong {
                len,
                max: self.config.max_line_len,
            });
        }

        Ok(None)
    }

    /// Number of bytes received but not yet returned as a line.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current line reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl LineReader<SerialStream> {
    /// Create a line reader for `SerialStream` and apply the read timeout from config.
    pub fn with_config_serial(mut inner: SerialStream, config: FrameConfig) -> Result<Self> {
        if let Some(timeout) = config.read_timeout {
            inner
                .set_timeout(timeout)
                .map_err(transport_to_frame_error)?;
        }
        Ok(Self::with_config(inner, config))
    }
}

fn transport_to_frame_error(err: sortlink_transport::TransportError) -> FrameError {
    match err {
        sortlink_transport::TransportError::Io(io) => FrameError::Io(io),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
