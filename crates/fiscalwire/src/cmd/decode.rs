use fiscalwire_format::{decode_natural, Command as FiscalCommand};
use fiscalwire_frame::{parse_frame, Direction, Frame};

use crate::cmd::{parse_command, DecodeArgs};
use crate::exit::{format_error, frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{parse_hex, print_frame, FrameOutput, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.frame)?;
    let direction = Direction::from(args.from);
    let frame = parse_frame(&bytes, direction).map_err(|err| frame_error("decode failed", err))?;

    let command = args.command.as_deref().map(parse_command).transpose()?;
    let config = args.text.format_config();

    let values = match command {
        Some(command) => {
            check_message_number(command, &frame)?;
            let descriptor = command.descriptor();
            let template = match direction {
                Direction::HostToDevice => descriptor.host_template(config.legacy_codes),
                Direction::DeviceToHost => descriptor.device_template(config.legacy_codes),
            };
            decode_natural(&template, &frame.payload, &config.text_encoding)
                .map_err(|err| format_error("payload decode failed", err))?
        }
        None => Vec::new(),
    };

    let name = command.map(FiscalCommand::name);
    print_frame(&FrameOutput::new(name, &frame, &values), format);
    Ok(SUCCESS)
}

fn check_message_number(command: FiscalCommand, frame: &Frame) -> CliResult<()> {
    if command.message_number() == frame.message_number {
        return Ok(());
    }
    Err(CliError::new(
        DATA_INVALID,
        format!(
            "frame carries message number {}, {command} uses {}",
            frame.message_number,
            command.message_number()
        ),
    ))
}
