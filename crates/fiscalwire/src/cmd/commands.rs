use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use fiscalwire_format::{Command as FiscalCommand, CommandDescriptor};
use serde::Serialize;

use crate::cmd::CommandsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct CommandOutput {
    name: &'static str,
    message_number: u8,
    request: &'static str,
    response: &'static str,
}

impl From<&CommandDescriptor> for CommandOutput {
    fn from(descriptor: &CommandDescriptor) -> Self {
        Self {
            name: descriptor.name,
            message_number: descriptor.message_number,
            request: descriptor.host_format,
            response: descriptor.device_format,
        }
    }
}

pub fn run(args: CommandsArgs, format: OutputFormat) -> CliResult<i32> {
    let rows: Vec<CommandOutput> = FiscalCommand::all()
        .map(FiscalCommand::descriptor)
        .filter(|d| args.number.is_none_or(|number| d.message_number == number))
        .map(CommandOutput::from)
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "NUMBER", "REQUEST", "RESPONSE"]);
            for row in &rows {
                table.add_row(vec![
                    row.name.to_string(),
                    row.message_number.to_string(),
                    row.request.to_string(),
                    row.response.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!(
                    "{}\t{}\t{}\t{}",
                    row.name, row.message_number, row.request, row.response
                );
            }
        }
    }

    Ok(SUCCESS)
}
