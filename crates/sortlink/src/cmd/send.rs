use std::str::FromStr;

use bytes::BytesMut;
use sortlink_frame::{encode_command, Command, CommandCode};

use crate::cmd::{open_link, LinkArgs, SendArgs};
use crate::exit::{device_error, frame_error, CliError, CliResult, SUCCESS};
use crate::output::{print_command, OutputFormat};

pub fn run(args: SendArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let command = build_command(&args)?;
    let wait = args.wait.as_deref().map(parse_code).transpose()?;

    let mut opened = open_link(link, Some(format), false)?;
    match wait {
        Some(expect) => {
            let reply = opened
                .device
                .request(&command, expect)
                .map_err(|err| device_error("request failed", err))?;
            print_command(&reply, format);
        }
        None => opened
            .device
            .send(&command)
            .map_err(|err| device_error("send failed", err))?,
    }

    Ok(SUCCESS)
}

/// Build and pre-validate the command so bad input fails before the port is opened.
fn build_command(args: &SendArgs) -> CliResult<Command> {
    let command = Command::with_args(parse_code(&args.code)?, args.args.iter());
    encode_command(&command, &mut BytesMut::new())
        .map_err(|err| frame_error("invalid command", err))?;
    Ok(command)
}

fn parse_code(input: &str) -> CliResult<CommandCode> {
    CommandCode::from_str(&input.to_ascii_uppercase())
        .map_err(|err| CliError::usage(format!("invalid command code '{input}': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::{DATA_INVALID, USAGE};

    fn args(code: &str, rest: &[&str]) -> SendArgs {
        SendArgs {
            code: code.to_string(),
            args: rest.iter().map(|s| s.to_string()).collect(),
            wait: None,
        }
    }

    #[test]
    fn builds_command_from_arguments() {
        let command = build_command(&args("mtc", &["4"])).unwrap();
        assert_eq!(command, Command::with_args(CommandCode::Mtc, ["4"]));
    }

    #[test]
    fn unknown_code_is_usage_error() {
        assert_eq!(build_command(&args("XYZ", &[])).unwrap_err().code, USAGE);
        assert_eq!(parse_code("AC").unwrap_err().code, USAGE);
    }

    #[test]
    fn unencodable_argument_is_data_invalid() {
        let err = build_command(&args("DAT", &["a,b"])).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
