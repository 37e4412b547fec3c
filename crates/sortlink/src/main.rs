mod cmd;
mod exit;
mod logging;
mod observe;
mod output;

use clap::Parser;

use crate::cmd::{Command, LinkArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "sortlink", version, about = "Resistor sorter mainboard CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(flatten)]
    link: LinkArgs,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, &cli.link, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::DebugAction;

    #[test]
    fn parses_global_link_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sortlink",
            "handshake",
            "--port",
            "/dev/ttyACM0",
            "--baud",
            "19200",
            "--timeout",
            "5s",
        ])
        .expect("handshake args should parse");

        assert!(matches!(cli.command, Command::Handshake(_)));
        assert_eq!(cli.link.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(cli.link.baud, 19200);
        assert_eq!(cli.link.timeout.as_deref(), Some("5s"));
    }

    #[test]
    fn defaults_match_mainboard_firmware() {
        let cli = Cli::try_parse_from(["sortlink", "sort"]).expect("sort should parse");
        assert_eq!(cli.link.baud, 9600);
        assert_eq!(cli.link.port_hint, "ACM");
        assert_eq!(cli.link.open_attempts, 10);
        assert!(!cli.link.skip_handshake);
    }

    #[test]
    fn parses_sort_item_count() {
        let cli = Cli::try_parse_from(["sortlink", "sort", "--items", "12"]).unwrap();
        match cli.command {
            Command::Sort(args) => assert_eq!(args.items, Some(12)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn move_to_cup_range_is_enforced() {
        let cli = Cli::try_parse_from(["sortlink", "debug", "move-to-cup", "9"]).unwrap();
        match cli.command {
            Command::Debug(args) => {
                assert!(matches!(args.action, DebugAction::MoveToCup { cup: 9 }))
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let err = Cli::try_parse_from(["sortlink", "debug", "move-to-cup", "10"])
            .expect_err("cup 10 should be rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_send_with_wait() {
        let cli =
            Cli::try_parse_from(["sortlink", "send", "DAT", "hello", "--wait", "ACK"]).unwrap();
        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.code, "DAT");
                assert_eq!(args.args, vec!["hello".to_string()]);
                assert_eq!(args.wait.as_deref(), Some("ACK"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_debug_action() {
        let err = Cli::try_parse_from(["sortlink", "debug", "launch"])
            .expect_err("unknown action should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }
}
