use std::io::{Read, Write};
use std::time::{Duration, Instant};

use sortlink_frame::{Command, FrameError, FrameWriter, LineReader};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{DeviceError, Result};
use crate::observer::{LinkObserver, NullObserver};

/// Configuration for protocol operations on a [`Device`].
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// Upper bound for a single `wait_for`. `None` waits until the command
    /// arrives, the link closes or the cancel token fires.
    ///
    /// The bound and the cancel token are checked between reads. The reader
    /// must have its own read timeout for either to interrupt a silent link;
    /// [`open_device`](crate::connector::open_device) uses the serial port's.
    pub wait_timeout: Option<Duration>,
    /// Reply `ACK` to every measurement report.
    pub ack_measurements: bool,
}

/// The mainboard at the other end of an exclusively owned link.
///
/// All protocol operations go through `&mut self`; there is exactly one
/// outstanding exchange at a time.
pub struct Device<R, W> {
    pub(crate) reader: LineReader<R>,
    pub(crate) writer: FrameWriter<W>,
    pub(crate) config: DeviceConfig,
    pub(crate) observer: Box<dyn LinkObserver>,
    pub(crate) cancel: CancelToken,
    pub(crate) last_rx: Instant,
    pub(crate) measurements: usize,
}

impl<R: Read, W: Write> Device<R, W> {
    /// Wrap a raw reader/writer pair with default framing and configuration.
    pub fn new(reader: R, writer: W) -> Self {
        Self::from_parts(
            LineReader::new(reader),
            FrameWriter::new(writer),
            DeviceConfig::default(),
        )
    }

    /// Build a device from an already configured line reader and frame writer.
    pub fn from_parts(
        reader: LineReader<R>,
        writer: FrameWriter<W>,
        config: DeviceConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            config,
            observer: Box::new(NullObserver),
            cancel: CancelToken::new(),
            last_rx: Instant::now(),
            measurements: 0,
        }
    }

    /// Replace the device configuration.
    pub fn with_config(mut self, config: DeviceConfig) -> Self {
        self.config = config;
        self
    }

    /// Install an observer for traffic, measurements and diagnostics.
    pub fn with_observer(mut self, observer: impl LinkObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Use `token` to cancel blocking waits.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Encode and write one command. Does not wait for any reply.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        match self.writer.send(command) {
            Ok(()) => {}
            Err(FrameError::ConnectionClosed) => {
                return Err(DeviceError::Disconnected(
                    "link closed while sending".to_string(),
                ));
            }
            Err(err) => return Err(err.into()),
        }
        debug!(code = %command.code, args = ?command.args, "sent");
        self.observer.on_sent(command, self.writer.last_frame());
        Ok(())
    }

    /// Time since the last line arrived from the device.
    pub fn stall_duration(&self) -> Duration {
        self.last_rx.elapsed()
    }

    /// Number of measurement reports handled so far.
    pub fn measurements_seen(&self) -> usize {
        self.measurements
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Consume the device and return its reader and writer.
    pub fn into_parts(self) -> (LineReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }
}

impl<R, W> std::fmt::Debug for Device<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("config", &self.config)
            .field("stalled", &self.last_rx.elapsed())
            .field("measurements", &self.measurements)
            .finish()
    }
}
