//! Driving the sorter mainboard over an exclusively owned link.
//!
//! This is the "just works" layer. Open the port, run the startup
//! handshake, then either issue single commands or drive a sort session.
//! Measurement reports that arrive while a reply is awaited are surfaced
//! through a [`LinkObserver`] and never mistaken for the reply.

pub mod cancel;
pub mod connector;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod handshake;
pub mod message;
pub mod observer;
pub mod session;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::CancelToken;
pub use connector::{connect, connect_with_config, open_device, SerialDevice};
pub use device::{Device, DeviceConfig};
pub use error::{DeviceError, Result};
pub use handshake::{handshake, handshake_with_timeout, HandshakeResult};
pub use message::{Cup, CupConfig, Measurement, Message, CUP_COUNT};
pub use observer::{LinkObserver, NullObserver};
pub use session::{
    run_sort_session, LineTriggers, ScriptedTriggers, SessionState, SessionSummary, SortSession,
    Trigger, TriggerSource,
};
pub use wait::{classify, Corruption, Inbound, SIDE_CHANNEL_CODE};
