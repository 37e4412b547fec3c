//! Serial transport for the sorter mainboard link.
//!
//! This is the lowest layer of sortlink. It finds the mainboard's serial
//! port, opens it (retrying while the board boots) and hands out a
//! [`SerialStream`] that implements `Read + Write`. Everything else builds
//! on top of that byte stream.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{discover_port, list_ports, open, select_port, SerialConfig};
pub use serialport::{SerialPortInfo, SerialPortType};
pub use traits::SerialStream;
