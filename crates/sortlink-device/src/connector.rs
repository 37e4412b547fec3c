use sortlink_frame::{FrameConfig, FrameWriter, LineReader};
use sortlink_transport::{SerialConfig, SerialStream};
use tracing::debug;

use crate::device::{Device, DeviceConfig};
use crate::error::Result;
use crate::handshake::{handshake, HandshakeResult};

/// A device on a real serial port.
pub type SerialDevice = Device<SerialStream, SerialStream>;

/// Open the mainboard port and run the startup handshake.
pub fn connect(serial: &SerialConfig) -> Result<(SerialDevice, HandshakeResult)> {
    connect_with_config(serial, FrameConfig::default(), DeviceConfig::default())
}

/// [`connect`] with explicit framing and device configuration.
pub fn connect_with_config(
    serial: &SerialConfig,
    frame: FrameConfig,
    config: DeviceConfig,
) -> Result<(SerialDevice, HandshakeResult)> {
    let mut device = open_device(serial, frame, config)?;
    let result = handshake(&mut device)?;
    Ok((device, result))
}

/// Open the mainboard port without the startup handshake.
///
/// Use this to install an observer or cancel token first, or to talk to a
/// board that is already past its startup exchange.
pub fn open_device(
    serial: &SerialConfig,
    frame: FrameConfig,
    config: DeviceConfig,
) -> Result<SerialDevice> {
    let stream = sortlink_transport::open(serial)?;
    stream.discard_buffers()?;
    let reader_stream = stream.try_clone()?;

    let reader = LineReader::with_config_serial(reader_stream, frame.clone())?;
    let writer = FrameWriter::with_config(stream, frame);
    debug!(port = ?writer.get_ref().name(), "device link ready");

    Ok(Device::from_parts(reader, writer, config))
}
