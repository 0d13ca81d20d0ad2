use fiscalwire_transport::available_ports;
use serde::Serialize;

use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct PortsOutput {
    ports: Vec<String>,
}

pub fn run(format: OutputFormat) -> CliResult<i32> {
    let ports = available_ports().map_err(|err| transport_error("port scan failed", err))?;

    match format {
        OutputFormat::Json => print_json(&PortsOutput { ports }),
        _ => {
            if ports.is_empty() {
                eprintln!("no serial ports found");
            }
            for port in &ports {
                println!("{port}");
            }
        }
    }
    Ok(SUCCESS)
}
