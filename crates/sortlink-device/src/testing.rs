//! Shared helpers for in-crate tests.

use std::io::{self, ErrorKind, Read};
use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use sortlink_frame::{encode_command, Command, CommandCode};

use crate::message::Measurement;
use crate::observer::LinkObserver;
use crate::wait::Corruption;

/// Encode `commands` as CRLF-terminated wire lines.
pub(crate) fn wire(commands: &[Command]) -> Vec<u8> {
    let mut out = Vec::new();
    for command in commands {
        let mut buf = BytesMut::new();
        encode_command(command, &mut buf).unwrap();
        out.extend_from_slice(&buf);
        out.extend_from_slice(b"\r\n");
    }
    out
}

pub(crate) fn mes(slot: u8, value: &str) -> Command {
    Measurement::new(slot, value).to_command()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Sent(CommandCode),
    Measurement(Measurement),
    Unexpected(CommandCode, CommandCode),
    Corrupt,
}

/// Observer that records into a shared log.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl LinkObserver for Recorder {
    fn on_sent(&mut self, command: &Command, _wire: &[u8]) {
        self.push(Event::Sent(command.code));
    }

    fn on_measurement(&mut self, measurement: &Measurement) {
        self.push(Event::Measurement(measurement.clone()));
    }

    fn on_unexpected(&mut self, expected: CommandCode, command: &Command) {
        self.push(Event::Unexpected(expected, command.code));
    }

    fn on_corrupt(&mut self, _corruption: &Corruption) {
        self.push(Event::Corrupt);
    }
}

/// Reader that never produces data, like a serial port with nothing to say.
pub(crate) struct Silent;

impl Read for Silent {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        std::thread::sleep(std::time::Duration::from_millis(2));
        Err(io::Error::from(ErrorKind::TimedOut))
    }
}

/// Yields `data`, then behaves like [`Silent`].
pub(crate) struct ThenSilent {
    data: io::Cursor<Vec<u8>>,
}

impl ThenSilent {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            data: io::Cursor::new(data),
        }
    }
}

impl Read for ThenSilent {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Silent.read(buf),
            n => Ok(n),
        }
    }
}
