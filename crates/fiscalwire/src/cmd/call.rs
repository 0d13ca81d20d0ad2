use fiscalwire_format::SlotKind;
use fiscalwire_frame::Frame;
use tracing::debug;

use crate::cmd::{parse_command, parse_params, CallArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_frame, FrameOutput, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let command = parse_command(&args.command)?;
    let legacy = args.device.text.format_config().legacy_codes;
    let descriptor = command.descriptor();
    let params = parse_params(&descriptor.host_template(legacy), &args.params)?;

    let mut session = args.device.open()?;
    let response = session
        .exchange(command, &params)
        .map_err(|err| session_error("call failed", err))?;
    debug!(%command, payload_len = response.payload.len(), "response received");

    let slots: Vec<SlotKind> = descriptor
        .device_template(legacy)
        .fields()
        .map(SlotKind::natural)
        .collect();
    let values = session
        .decode(command, &response, &slots)
        .map_err(|err| session_error("decode failed", err))?;

    let frame = Frame {
        message_id: response.message_id,
        message_number: response.message_number,
        payload: response.payload,
        status: Some(response.status),
    };
    print_frame(&FrameOutput::new(Some(descriptor.name), &frame, &values), format);
    Ok(SUCCESS)
}
