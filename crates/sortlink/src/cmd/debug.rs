use sortlink_device::{Cup, CupConfig, DeviceError, SerialDevice, CUP_COUNT};
use sortlink_frame::Command;

use crate::cmd::{open_link, DebugAction, DebugArgs, LinkArgs};
use crate::exit::{device_error, CliError, CliResult, SUCCESS};
use crate::output::{print_command, OutputFormat};

pub fn run(args: DebugArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let action = args.action;
    check_confirmed(&action)?;
    let cups = match &action {
        DebugAction::Cups { assignments } => Some(parse_cup_config(assignments)?),
        _ => None,
    };

    let mut opened = open_link(link, Some(format), false)?;
    let reply = perform(&mut opened.device, &action, cups.as_ref())
        .map_err(|err| device_error("debug command failed", err))?;

    if let Some(reply) = reply {
        print_command(&reply, format);
    }
    Ok(SUCCESS)
}

/// Run one action. Returns the device's acknowledgement, if one is awaited.
fn perform(
    device: &mut SerialDevice,
    action: &DebugAction,
    cups: Option<&CupConfig>,
) -> Result<Option<Command>, DeviceError> {
    let reply = match action {
        DebugAction::CycleFeed => device.cycle_feed()?,
        DebugAction::MoveToCup { cup } => {
            let cup = Cup::new(*cup).ok_or_else(|| {
                DeviceError::Protocol(format!("cup {cup} is not in 1..={CUP_COUNT}"))
            })?;
            device.move_to_cup(cup)?
        }
        DebugAction::CycleArm => device.cycle_dispense_arm()?,
        DebugAction::Halt { .. } => device.halt()?,
        DebugAction::Reset { .. } => device.reset()?,
        DebugAction::Cups { .. } => {
            let empty = CupConfig::new();
            device.send_cup_config(cups.unwrap_or(&empty))?
        }
        DebugAction::Ready => {
            device.send_ready()?;
            return Ok(None);
        }
        DebugAction::Ack => {
            device.send_ack()?;
            return Ok(None);
        }
    };
    Ok(Some(reply))
}

fn check_confirmed(action: &DebugAction) -> CliResult<()> {
    let (verb, confirmed) = match action {
        DebugAction::Halt { yes } => ("halt", *yes),
        DebugAction::Reset { yes } => ("reset", *yes),
        _ => return Ok(()),
    };
    if confirmed {
        Ok(())
    } else {
        Err(CliError::usage(format!("refusing to {verb} the mainboard without --yes")))
    }
}

/// Parse `CUP=RULE` assignments. An empty rule leaves the cup unset.
fn parse_cup_config(assignments: &[String]) -> CliResult<CupConfig> {
    let mut config = CupConfig::new();
    for assignment in assignments {
        let (cup, rule) = assignment.split_once('=').ok_or_else(|| {
            CliError::usage(format!("cup assignment '{assignment}' is not CUP=RULE"))
        })?;
        let cup = cup
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(Cup::new)
            .ok_or_else(|| {
                CliError::usage(format!("cup '{cup}' is not a number in 1..={CUP_COUNT}"))
            })?;
        config.set(cup, rule.trim());
    }
    Ok(config)
}
