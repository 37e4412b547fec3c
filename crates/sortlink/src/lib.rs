//! Host-side driver for the resistor sorter mainboard.
//!
//! The mainboard speaks a line-based ASCII protocol over USB serial. Each
//! line carries a raw length byte, a three-letter command code and its
//! arguments. This crate ties the layers together.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port discovery and open-with-retry
//! - [`frame`]: length-byte framing, command codes, line reader and writer
//! - [`device`]: reply waits with measurement side channel, debug verbs,
//!   startup handshake and the sort session

/// Re-export transport types.
pub mod transport {
    pub use sortlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sortlink_frame::*;
}

/// Re-export device types.
pub mod device {
    pub use sortlink_device::*;
}
