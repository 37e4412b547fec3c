//! One-way commands and single request/reply exchanges.
//!
//! The `send_*` and machine verbs only write a frame. The debug verbs
//! ([`Device::cycle_feed`] and friends) wait for the device's `ACK`.

use std::io::{Read, Write};

use sortlink_frame::{Command, CommandCode};
use tracing::info;

use crate::device::Device;
use crate::error::Result;
use crate::message::{Cup, CupConfig, Message};

impl<R: Read, W: Write> Device<R, W> {
    /// Send a typed message.
    pub fn send_message(&mut self, message: &Message) -> Result<()> {
        self.send(&message.to_command())
    }

    pub fn send_ready(&mut self) -> Result<()> {
        self.send_message(&Message::Ready)
    }

    pub fn send_ack(&mut self) -> Result<()> {
        self.send_message(&Message::Ack)
    }

    /// Report a host-side error to the device.
    pub fn send_error(&mut self, message: impl Into<String>) -> Result<()> {
        self.send_message(&Message::Error(message.into()))
    }

    pub fn send_data(&mut self, payload: impl Into<String>) -> Result<()> {
        self.send_message(&Message::Data(payload.into()))
    }

    pub fn send_start(&mut self) -> Result<()> {
        self.send_message(&Message::Start)
    }

    pub fn send_next(&mut self) -> Result<()> {
        self.send_message(&Message::Next)
    }

    pub fn send_end(&mut self) -> Result<()> {
        self.send_message(&Message::End)
    }

    /// Push a full cup configuration. The device replies `ACK`.
    pub fn send_cup_config(&mut self, config: &CupConfig) -> Result<Command> {
        info!(assigned = config.assigned(), "sending cup configuration");
        self.request(&config.to_command(), CommandCode::Ack)
    }

    /// Cycle the feed mechanism once.
    pub fn cycle_feed(&mut self) -> Result<Command> {
        self.debug_verb(Message::CycleFeed)
    }

    /// Rotate the sort wheel to `cup`.
    pub fn move_to_cup(&mut self, cup: Cup) -> Result<Command> {
        self.debug_verb(Message::MoveToCup(cup))
    }

    /// Cycle the dispense arm once.
    pub fn cycle_dispense_arm(&mut self) -> Result<Command> {
        self.debug_verb(Message::CycleDispenseArm)
    }

    /// Stop all motion immediately.
    pub fn halt(&mut self) -> Result<Command> {
        self.debug_verb(Message::Halt)
    }

    /// Reset the mainboard.
    pub fn reset(&mut self) -> Result<Command> {
        self.debug_verb(Message::Reset)
    }

    /// Send `command` and block until `expect` arrives.
    pub fn request(&mut self, command: &Command, expect: CommandCode) -> Result<Command> {
        self.send(command)?;
        self.wait_for(expect)
    }

    fn debug_verb(&mut self, message: Message) -> Result<Command> {
        info!(code = %message.code(), "debug command");
        self.request(&message.to_command(), CommandCode::Ack)
    }
}
