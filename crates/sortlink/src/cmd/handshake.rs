use crate::cmd::{open_link, HandshakeArgs, LinkArgs};
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_handshake, OutputFormat};

pub fn run(_args: HandshakeArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let opened = open_link(link, Some(format), true)?;
    let result = opened
        .handshake
        .ok_or_else(|| CliError::new(INTERNAL, "handshake did not run"))?;
    print_handshake(&result, format);
    Ok(SUCCESS)
}
