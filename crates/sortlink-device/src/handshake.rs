use std::io::{Read, Write};
use std::time::{Duration, Instant};

use serde::Serialize;
use sortlink_frame::CommandCode;
use tracing::info;

use crate::device::Device;
use crate::error::Result;

/// Outcome of the startup handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandshakeResult {
    /// Time from the first wait to the device's `ACK`.
    pub elapsed_ms: u64,
    /// Measurements that arrived while the handshake was in progress.
    pub measurements: usize,
}

/// Run the startup exchange expected by the mainboard after power-up.
///
/// 1. The device announces itself with `RDY`.
/// 2. The host answers with `RDY`.
/// 3. The device confirms with `ACK`.
///
/// Uses the device's configured wait timeout for each wait.
pub fn handshake<R: Read, W: Write>(device: &mut Device<R, W>) -> Result<HandshakeResult> {
    let timeout = device.config().wait_timeout;
    handshake_with_timeout(device, timeout)
}

/// [`handshake`] with an explicit bound on each wait.
pub fn handshake_with_timeout<R: Read, W: Write>(
    device: &mut Device<R, W>,
    timeout: Option<Duration>,
) -> Result<HandshakeResult> {
    let started = Instant::now();
    let measurements_before = device.measurements_seen();

    device.wait_for_within(CommandCode::Rdy, timeout)?;
    device.send_ready()?;
    device.wait_for_within(CommandCode::Ack, timeout)?;

    let result = HandshakeResult {
        elapsed_ms: started.elapsed().as_millis() as u64,
        measurements: device.measurements_seen() - measurements_before,
    };
    info!(elapsed_ms = result.elapsed_ms, "handshake complete");
    Ok(result)
}
