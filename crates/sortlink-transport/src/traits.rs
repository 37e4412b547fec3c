use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

use crate::error::Result;

/// A connected serial stream to the mainboard. Implements Read + Write.
///
/// Reads honour the port timeout: when no byte arrives in time the read
/// fails with `ErrorKind::TimedOut`, which callers treat as "no data yet".
pub struct SerialStream {
    inner: Box<dyn SerialPort>,
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl SerialStream {
    /// Wrap an already opened serial port.
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self { inner: port }
    }

    /// Set the timeout applied to each blocking read and write.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.inner.set_timeout(timeout).map_err(Into::into)
    }

    /// Current per-operation timeout.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout()
    }

    /// Try to clone this stream (creates a second handle on the same port).
    ///
    /// Used to split the link into an owned reader half and writer half.
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self::from_port(cloned))
    }

    /// Drop any bytes buffered by the OS in both directions.
    pub fn discard_buffers(&self) -> Result<()> {
        self.inner.clear(ClearBuffer::All).map_err(Into::into)
    }

    /// Device path of the port, when the platform reports one.
    pub fn name(&self) -> Option<String> {
        self.inner.name()
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("name", &self.inner.name())
            .field("timeout", &self.inner.timeout())
            .finish()
    }
}
