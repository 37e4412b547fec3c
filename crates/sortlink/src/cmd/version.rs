use sortlink_frame::CommandCode;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("sortlink {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("SORTLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("SORTLINK_BUILD_PROFILE").unwrap_or("unknown")
    );
    let codes: Vec<&str> = CommandCode::ALL.iter().map(|code| code.as_str()).collect();
    println!("commands: {}", codes.join(" "));

    Ok(SUCCESS)
}
