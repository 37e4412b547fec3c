use sortlink_device::DeviceError;
use tracing::info;

use crate::cmd::{open_link, LinkArgs, MonitorArgs};
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_command, OutputFormat};

pub fn run(args: MonitorArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    // Measurements come back from `receive` like any other command.
    let mut opened = open_link(link, None, false)?;
    let timeout = opened.device.config().wait_timeout;

    let mut printed = 0usize;
    loop {
        if args.count.is_some_and(|count| printed >= count) {
            return Ok(SUCCESS);
        }

        let command = match opened.device.receive(timeout) {
            Ok(command) => command,
            Err(DeviceError::Cancelled { .. }) => {
                info!(printed, "monitor interrupted");
                return Ok(SUCCESS);
            }
            Err(err) => return Err(device_error("receive failed", err)),
        };

        print_command(&command, format);
        printed = printed.saturating_add(1);
    }
}
