use sortlink_frame::{Command, CommandCode};

use crate::message::Measurement;
use crate::wait::Corruption;

/// Hooks for surfacing link traffic outside the protocol core.
///
/// Every method has an empty default. The device already logs through
/// `tracing`; observers exist for displays, traffic logs and tests.
pub trait LinkObserver: Send {
    /// A frame was written. `wire` includes the length byte and terminator.
    fn on_sent(&mut self, _command: &Command, _wire: &[u8]) {}

    /// A line was read, before decoding.
    fn on_received(&mut self, _wire: &[u8]) {}

    /// A measurement arrived on the side channel.
    fn on_measurement(&mut self, _measurement: &Measurement) {}

    /// A well-formed command arrived that was not being waited for.
    fn on_unexpected(&mut self, _expected: CommandCode, _command: &Command) {}

    /// A line was dropped as corrupt.
    fn on_corrupt(&mut self, _corruption: &Corruption) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl LinkObserver for NullObserver {}

impl<A: LinkObserver, B: LinkObserver> LinkObserver for (A, B) {
    fn on_sent(&mut self, command: &Command, wire: &[u8]) {
        self.0.on_sent(command, wire);
        self.1.on_sent(command, wire);
    }

    fn on_received(&mut self, wire: &[u8]) {
        self.0.on_received(wire);
        self.1.on_received(wire);
    }

    fn on_measurement(&mut self, measurement: &Measurement) {
        self.0.on_measurement(measurement);
        self.1.on_measurement(measurement);
    }

    fn on_unexpected(&mut self, expected: CommandCode, command: &Command) {
        self.0.on_unexpected(expected, command);
        self.1.on_unexpected(expected, command);
    }

    fn on_corrupt(&mut self, corruption: &Corruption) {
        self.0.on_corrupt(corruption);
        self.1.on_corrupt(corruption);
    }
}

impl<O: LinkObserver + ?Sized> LinkObserver for Box<O> {
    fn on_sent(&mut self, command: &Command, wire: &[u8]) {
        (**self).on_sent(command, wire);
    }

    fn on_received(&mut self, wire: &[u8]) {
        (**self).on_received(wire);
    }

    fn on_measurement(&mut self, measurement: &Measurement) {
        (**self).on_measurement(measurement);
    }

    fn on_unexpected(&mut self, expected: CommandCode, command: &Command) {
        (**self).on_unexpected(expected, command);
    }

    fn on_corrupt(&mut self, corruption: &Corruption) {
        (**self).on_corrupt(corruption);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        measurements: usize,
        sent: usize,
    }

    impl LinkObserver for Counter {
        fn on_sent(&mut self, _command: &Command, _wire: &[u8]) {
            self.sent += 1;
        }

        fn on_measurement(&mut self, _measurement: &Measurement) {
            self.measurements += 1;
        }
    }

    #[test]
    fn pair_forwards_to_both() {
        let mut pair = (Counter::default(), Counter::default());
        pair.on_measurement(&Measurement::new(1, "220"));
        pair.on_sent(&Command::new(CommandCode::Ack), b"\x05ACK;\r\n");
        pair.on_received(b"\x05RDY;\r\n");

        assert_eq!(pair.0.measurements, 1);
        assert_eq!(pair.1.measurements, 1);
        assert_eq!(pair.0.sent, 1);
        assert_eq!(pair.1.sent, 1);
    }

    #[test]
    fn boxed_observer_forwards() {
        let mut boxed: Box<Counter> = Box::default();
        boxed.on_measurement(&Measurement::new(3, "1k"));
        assert_eq!(boxed.measurements, 1);
    }
}
