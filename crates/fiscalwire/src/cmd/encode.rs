use bytes::BytesMut;
use fiscalwire_format::encode_fields;
use fiscalwire_frame::{encode_frame, FrameHeader, MAX_MESSAGE_ID, MIN_MESSAGE_ID};

use crate::cmd::{parse_command, parse_params, EncodeArgs};
use crate::exit::{format_error, frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_encoded, EncodedOutput, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    if !(MIN_MESSAGE_ID..=MAX_MESSAGE_ID).contains(&args.id) {
        return Err(CliError::new(
            USAGE,
            format!(
                "message id must be in {MIN_MESSAGE_ID}..={MAX_MESSAGE_ID}, got {}",
                args.id
            ),
        ));
    }

    let command = parse_command(&args.command)?;
    let config = args.text.format_config();
    let descriptor = command.descriptor();
    let template = descriptor.host_template(config.legacy_codes);
    let params = parse_params(&template, &args.params)?;

    let mut payload = Vec::new();
    encode_fields(&template, &params, &config.text_encoding, &mut payload)
        .map_err(|err| format_error("encode failed", err))?;

    let mut frame = BytesMut::new();
    let header = FrameHeader::new(args.id, descriptor.message_number);
    encode_frame(header, &payload, None, &mut frame)
        .map_err(|err| frame_error("encode failed", err))?;

    print_encoded(&EncodedOutput::new(descriptor, args.id, &frame), format);
    Ok(SUCCESS)
}
