use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use sortlink_device::handshake::handshake as startup_handshake;
use sortlink_device::{open_device, CancelToken, DeviceConfig, HandshakeResult, SerialDevice};
use sortlink_frame::FrameConfig;
use sortlink_transport::SerialConfig;

use crate::exit::{device_error, io_error, CliError, CliResult, INTERNAL};
use crate::observe::{CliObserver, WireLog};
use crate::output::OutputFormat;

pub mod debug;
pub mod handshake;
pub mod monitor;
pub mod ports;
pub mod send;
pub mod sort;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports visible to this host.
    Ports(PortsArgs),
    /// Open the device and run the startup handshake only.
    Handshake(HandshakeArgs),
    /// Run an interactive sort session.
    Sort(SortArgs),
    /// Drive individual mechanisms for bench testing.
    Debug(DebugArgs),
    /// Send a single command, optionally waiting for a reply.
    Send(SendArgs),
    /// Print every command the device sends.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, link, format),
        Command::Handshake(args) => handshake::run(args, link, format),
        Command::Sort(args) => sort::run(args, link, format),
        Command::Debug(args) => debug::run(args, link, format),
        Command::Send(args) => send::run(args, link, format),
        Command::Monitor(args) => monitor::run(args, link, format),
        Command::Version(args) => version::run(args),
    }
}

/// How to reach the mainboard. Shared by every subcommand that opens it.
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Serial port path. Discovered by --port-hint when omitted.
    #[arg(long, env = "SORTLINK_PORT", global = true)]
    pub port: Option<String>,

    /// Substring identifying the mainboard among serial port names.
    #[arg(long, default_value = "ACM", global = true)]
    pub port_hint: String,

    /// Line speed.
    #[arg(long, env = "SORTLINK_BAUD", default_value_t = 9600, global = true)]
    pub baud: u32,

    /// Give up on any single wait after this long (e.g. 5s, 500ms). Waits are unbounded by default.
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Attempts to open the port before giving up.
    #[arg(long, default_value_t = 10, global = true)]
    pub open_attempts: u32,

    /// Assume the device is past its startup exchange.
    #[arg(long, global = true)]
    pub skip_handshake: bool,

    /// Reply ACK to every measurement report.
    #[arg(long, global = true)]
    pub ack_measurements: bool,

    /// Append raw link traffic to this file.
    #[arg(long, value_name = "PATH", global = true)]
    pub wire_log: Option<PathBuf>,
}

impl LinkArgs {
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            path: self.port.clone(),
            port_hint: self.port_hint.clone(),
            baud_rate: self.baud,
            open_attempts: self.open_attempts,
            ..SerialConfig::default()
        }
    }

    pub fn device_config(&self) -> CliResult<DeviceConfig> {
        let wait_timeout = self.timeout.as_deref().map(parse_duration).transpose()?;
        Ok(DeviceConfig {
            wait_timeout,
            ack_measurements: self.ack_measurements,
        })
    }
}

/// An open device, with the handshake result when one was run.
pub struct Link {
    pub device: SerialDevice,
    pub handshake: Option<HandshakeResult>,
}

/// Open the device, install observers and the Ctrl-C handler, then run the
/// startup handshake unless skipped.
///
/// `measurements` selects how measurement reports are printed while other
/// work is in progress; `None` leaves them to the caller.
pub fn open_link(
    link: &LinkArgs,
    measurements: Option<OutputFormat>,
    force_handshake: bool,
) -> CliResult<Link> {
    let config = link.device_config()?;
    let wire_log = link
        .wire_log
        .as_deref()
        .map(|path| {
            WireLog::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))
        })
        .transpose()?;

    let cancel = CancelToken::new();
    install_ctrlc_handler(cancel.clone())?;

    let mut device = open_device(&link.serial_config(), FrameConfig::default(), config)
        .map_err(|err| device_error("connect failed", err))?
        .with_observer(CliObserver::new(measurements, wire_log))
        .with_cancel_token(cancel);

    let handshake = if force_handshake || !link.skip_handshake {
        let result = startup_handshake(&mut device)
            .map_err(|err| device_error("handshake failed", err))?;
        Some(result)
    } else {
        None
    };

    Ok(Link { device, handshake })
}

fn install_ctrlc_handler(cancel: CancelToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            // Second Ctrl-C: the main thread may be blocked on stdin.
            std::process::exit(crate::exit::CANCELLED);
        }
        cancel.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug, Default)]
pub struct HandshakeArgs {}

#[derive(Args, Debug)]
pub struct SortArgs {
    /// Sort this many items, then end the session, instead of reading
    /// triggers from stdin.
    #[arg(long)]
    pub items: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DebugArgs {
    #[command(subcommand)]
    pub action: DebugAction,
}

#[derive(Subcommand, Debug)]
pub enum DebugAction {
    /// Cycle the feed mechanism once (CFD).
    CycleFeed,
    /// Rotate the sort wheel to a cup (MTC).
    MoveToCup {
        /// Cup number.
        #[arg(value_parser = clap::value_parser!(u8).range(1..=9))]
        cup: u8,
    },
    /// Cycle the dispense arm once (CDA).
    CycleArm,
    /// Stop the mainboard immediately (HCF).
    Halt {
        /// Confirm the halt.
        #[arg(long)]
        yes: bool,
    },
    /// Reset the mainboard (RST).
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
    /// Send the per-cup sort configuration (CUP), e.g. `1=100 9=10k`.
    Cups {
        /// Assignments as CUP=RULE. Unlisted cups are left empty.
        #[arg(value_name = "CUP=RULE")]
        assignments: Vec<String>,
    },
    /// Send RDY without waiting for anything.
    Ready,
    /// Send ACK without waiting for anything.
    Ack,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Three-letter command code.
    pub code: String,
    /// Command arguments.
    pub args: Vec<String>,
    /// Wait for this reply code and print it.
    #[arg(long, value_name = "CODE")]
    pub wait: Option<String>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Exit after receiving N commands.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
