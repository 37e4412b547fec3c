use std::io::{self, IsTerminal};

use sortlink_device::{run_sort_session, LineTriggers, ScriptedTriggers, TriggerSource};

use crate::cmd::{open_link, LinkArgs, SortArgs};
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_summary, OutputFormat};

pub fn run(args: SortArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut opened = open_link(link, Some(format), false)?;

    let mut triggers: Box<dyn TriggerSource> = match args.items {
        Some(count) => Box::new(ScriptedTriggers::advance_times(count)),
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                eprintln!("Enter sorts the next item; q then Enter ends the session.");
            }
            Box::new(LineTriggers::new(stdin.lock()))
        }
    };

    let summary = run_sort_session(&mut opened.device, triggers.as_mut())
        .map_err(|err| device_error("sort session failed", err))?;
    print_summary(&summary, format);
    Ok(SUCCESS)
}
