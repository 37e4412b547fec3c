//! Typed view of protocol commands.
//!
//! [`Command`] carries a free-form argument list; [`Message`] checks the
//! arity each code requires and gives fixed-width commands a fixed-width
//! representation.

use serde::Serialize;
use sortlink_frame::{Command, CommandCode};

use crate::error::{DeviceError, Result};

/// Number of cups on the sort wheel.
pub const CUP_COUNT: usize = 9;

/// A sort wheel cup, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Cup(u8);

impl Cup {
    /// Returns `None` outside `1..=CUP_COUNT`.
    pub fn new(number: u8) -> Option<Self> {
        (1..=CUP_COUNT as u8).contains(&number).then_some(Self(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

/// Asynchronous measurement report from the mainboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Measurement {
    /// Measurement slot the reading belongs to.
    pub slot: u8,
    /// Reading as sent by the device.
    pub value: String,
}

impl Measurement {
    pub fn new(slot: u8, value: impl Into<String>) -> Self {
        Self {
            slot,
            value: value.into(),
        }
    }

    /// Extract a measurement from a `MES` command.
    pub fn from_command(command: &Command) -> Result<Self> {
        expect_code(command, CommandCode::Mes)?;
        let [slot, value] = command.args.as_slice() else {
            return Err(arity_error(command, 2));
        };
        let slot = slot.parse::<u8>().map_err(|_| {
            DeviceError::Protocol(format!("MES slot '{slot}' is not a slot number"))
        })?;
        Ok(Self::new(slot, value.clone()))
    }

    pub fn to_command(&self) -> Command {
        Command::with_args(
            CommandCode::Mes,
            [self.slot.to_string(), self.value.clone()],
        )
    }
}

/// Sort configuration for every cup of the wheel.
///
/// Always travels as exactly [`CUP_COUNT`] argument slots; an unset cup is
/// an empty slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CupConfig {
    slots: [Option<String>; CUP_COUNT],
}

impl CupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`CupConfig::set`].
    pub fn with(mut self, cup: Cup, rule: impl Into<String>) -> Self {
        self.set(cup, rule);
        self
    }

    /// Assign the acceptance rule for `cup`. An empty rule clears the cup.
    pub fn set(&mut self, cup: Cup, rule: impl Into<String>) {
        let rule = rule.into();
        self.slots[cup.index()] = (!rule.is_empty()).then_some(rule);
    }

    pub fn clear(&mut self, cup: Cup) {
        self.slots[cup.index()] = None;
    }

    pub fn get(&self, cup: Cup) -> Option<&str> {
        self.slots[cup.index()].as_deref()
    }

    /// Number of cups with a rule assigned.
    pub fn assigned(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn from_command(command: &Command) -> Result<Self> {
        expect_code(command, CommandCode::Cup)?;
        if command.args.len() != CUP_COUNT {
            return Err(arity_error(command, CUP_COUNT));
        }
        let mut config = Self::new();
        for (slot, arg) in config.slots.iter_mut().zip(&command.args) {
            *slot = (!arg.is_empty()).then(|| arg.clone());
        }
        Ok(config)
    }

    pub fn to_command(&self) -> Command {
        Command::with_args(
            CommandCode::Cup,
            self.slots
                .iter()
                .map(|slot| slot.clone().unwrap_or_default()),
        )
    }
}

/// A command with its arguments checked against its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Ready,
    Ack,
    Next,
    End,
    Done,
    Start,
    CycleFeed,
    CycleDispenseArm,
    Halt,
    Reset,
    Error(String),
    Data(String),
    Measurement(Measurement),
    MoveToCup(Cup),
    CupConfig(CupConfig),
}

impl Message {
    pub fn code(&self) -> CommandCode {
        match self {
            Message::Ready => CommandCode::Rdy,
            Message::Ack => CommandCode::Ack,
            Message::Next => CommandCode::Nxt,
            Message::End => CommandCode::End,
            Message::Done => CommandCode::Don,
            Message::Start => CommandCode::Srt,
            Message::CycleFeed => CommandCode::Cfd,
            Message::CycleDispenseArm => CommandCode::Cda,
            Message::Halt => CommandCode::Hcf,
            Message::Reset => CommandCode::Rst,
            Message::Error(_) => CommandCode::Err,
            Message::Data(_) => CommandCode::Dat,
            Message::Measurement(_) => CommandCode::Mes,
            Message::MoveToCup(_) => CommandCode::Mtc,
            Message::CupConfig(_) => CommandCode::Cup,
        }
    }

    pub fn to_command(&self) -> Command {
        match self {
            Message::Error(text) | Message::Data(text) => {
                Command::with_args(self.code(), [text.as_str()])
            }
            Message::Measurement(measurement) => measurement.to_command(),
            Message::MoveToCup(cup) => {
                Command::with_args(CommandCode::Mtc, [cup.number().to_string()])
            }
            Message::CupConfig(config) => config.to_command(),
            _ => Command::new(self.code()),
        }
    }
}

impl TryFrom<&Command> for Message {
    type Error = DeviceError;

    fn try_from(command: &Command) -> Result<Self> {
        let message = match command.code {
            CommandCode::Rdy => no_args(command, Message::Ready)?,
            CommandCode::Ack => no_args(command, Message::Ack)?,
            CommandCode::Nxt => no_args(command, Message::Next)?,
            CommandCode::End => no_args(command, Message::End)?,
            CommandCode::Don => no_args(command, Message::Done)?,
            CommandCode::Srt => no_args(command, Message::Start)?,
            CommandCode::Cfd => no_args(command, Message::CycleFeed)?,
            CommandCode::Cda => no_args(command, Message::CycleDispenseArm)?,
            CommandCode::Hcf => no_args(command, Message::Halt)?,
            CommandCode::Rst => no_args(command, Message::Reset)?,
            CommandCode::Err => Message::Error(single_arg(command)?),
            CommandCode::Dat => Message::Data(single_arg(command)?),
            CommandCode::Mes => Message::Measurement(Measurement::from_command(command)?),
            CommandCode::Mtc => {
                let arg = single_arg(command)?;
                let cup = arg
                    .parse::<u8>()
                    .ok()
                    .and_then(Cup::new)
                    .ok_or_else(|| {
                        DeviceError::Protocol(format!("MTC cup '{arg}' is not in 1..={CUP_COUNT}"))
                    })?;
                Message::MoveToCup(cup)
            }
            CommandCode::Cup => Message::CupConfig(CupConfig::from_command(command)?),
        };
        Ok(message)
    }
}

impl From<&Message> for Command {
    fn from(message: &Message) -> Self {
        message.to_command()
    }
}

fn expect_code(command: &Command, code: CommandCode) -> Result<()> {
    if command.code != code {
        return Err(DeviceError::Protocol(format!(
            "expected {code}, got {}",
            command.code
        )));
    }
    Ok(())
}

fn arity_error(command: &Command, expected: usize) -> DeviceError {
    DeviceError::Protocol(format!(
        "{} takes {expected} argument(s), got {}",
        command.code,
        command.args.len()
    ))
}

fn no_args(command: &Command, message: Message) -> Result<Message> {
    if !command.args.is_empty() {
        return Err(arity_error(command, 0));
    }
    Ok(message)
}

fn single_arg(command: &Command) -> Result<String> {
    match command.args.as_slice() {
        [arg] => Ok(arg.clone()),
        _ => Err(arity_error(command, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cup(n: u8) -> Cup {
        Cup::new(n).unwrap()
    }

    #[test]
    fn cup_range_is_one_to_nine() {
        assert!(Cup::new(0).is_none());
        assert_eq!(Cup::new(1).map(Cup::number), Some(1));
        assert_eq!(Cup::new(9).map(Cup::number), Some(9));
        assert!(Cup::new(10).is_none());
    }

    #[test]
    fn measurement_from_command() {
        let command = Command::with_args(CommandCode::Mes, ["2", "330"]);
        let measurement = Measurement::from_command(&command).unwrap();
        assert_eq!(measurement, Measurement::new(2, "330"));
        assert_eq!(measurement.to_command(), command);
    }

    #[test]
    fn measurement_requires_two_args() {
        let command = Command::with_args(CommandCode::Mes, ["2"]);
        assert!(matches!(
            Measurement::from_command(&command),
            Err(DeviceError::Protocol(_))
        ));
    }

    #[test]
    fn measurement_requires_numeric_slot() {
        let command = Command::with_args(CommandCode::Mes, ["two", "330"]);
        assert!(Measurement::from_command(&command).is_err());
    }

    #[test]
    fn cup_config_always_carries_nine_slots() {
        let config = CupConfig::new().with(cup(1), "100").with(cup(9), "1M");
        let command = config.to_command();

        assert_eq!(command.code, CommandCode::Cup);
        assert_eq!(command.args.len(), CUP_COUNT);
        assert_eq!(command.args[0], "100");
        assert!(command.args[1..8].iter().all(String::is_empty));
        assert_eq!(command.args[8], "1M");
    }

    #[test]
    fn empty_cup_config_is_nine_empty_slots() {
        let command = CupConfig::new().to_command();
        assert_eq!(command.to_string(), "CUP;,,,,,,,,");
        assert_eq!(CupConfig::from_command(&command).unwrap(), CupConfig::new());
    }

    #[test]
    fn cup_config_from_command() {
        let command = Command::with_args(
            CommandCode::Cup,
            ["", "220", "", "", "", "", "", "", ""],
        );
        let config = CupConfig::from_command(&command).unwrap();
        assert_eq!(config.get(cup(2)), Some("220"));
        assert_eq!(config.get(cup(1)), None);
        assert_eq!(config.assigned(), 1);
    }

    #[test]
    fn cup_config_rejects_wrong_arity() {
        let command = Command::with_args(CommandCode::Cup, ["1", "2"]);
        assert!(CupConfig::from_command(&command).is_err());
    }

    #[test]
    fn setting_empty_rule_clears_cup() {
        let mut config = CupConfig::new().with(cup(3), "47k");
        config.set(cup(3), "");
        assert_eq!(config.get(cup(3)), None);

        config.set(cup(4), "10k");
        config.clear(cup(4));
        assert_eq!(config.assigned(), 0);
    }

    #[test]
    fn message_from_command_checks_arity() {
        let ok = Message::try_from(&Command::new(CommandCode::Rdy)).unwrap();
        assert_eq!(ok, Message::Ready);

        let bad = Message::try_from(&Command::with_args(CommandCode::Rdy, ["x"]));
        assert!(matches!(bad, Err(DeviceError::Protocol(_))));

        let err = Message::try_from(&Command::with_args(CommandCode::Err, ["jam"])).unwrap();
        assert_eq!(err, Message::Error("jam".to_string()));
    }

    #[test]
    fn move_to_cup_validates_range() {
        let ok = Message::try_from(&Command::with_args(CommandCode::Mtc, ["5"])).unwrap();
        assert_eq!(ok, Message::MoveToCup(cup(5)));

        let bad = Message::try_from(&Command::with_args(CommandCode::Mtc, ["12"]));
        assert!(bad.is_err());
    }

    #[test]
    fn message_to_command_uses_matching_code() {
        let messages = [
            Message::Start,
            Message::Halt,
            Message::Data("42".to_string()),
            Message::MoveToCup(cup(7)),
        ];
        for message in messages {
            let command = message.to_command();
            assert_eq!(command.code, message.code());
            assert_eq!(Message::try_from(&command).unwrap(), message);
        }
    }

    #[test]
    fn measurement_serializes_for_reports() {
        let json = serde_json::to_string(&Measurement::new(1, "220")).unwrap();
        assert_eq!(json, r#"{"slot":1,"value":"220"}"#);
    }
}
