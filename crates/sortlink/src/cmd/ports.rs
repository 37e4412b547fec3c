use sortlink_transport::{list_ports, select_port};
use tracing::info;

use crate::cmd::{LinkArgs, PortsArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_ports, OutputFormat};

pub fn run(_args: PortsArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let ports = list_ports().map_err(|err| transport_error("port enumeration failed", err))?;

    match select_port(&ports, &link.port_hint) {
        Ok(port) => info!(port = %port, hint = %link.port_hint, "mainboard candidate"),
        Err(err) => info!(hint = %link.port_hint, "{err}"),
    }

    print_ports(&ports, format);
    Ok(SUCCESS)
}
