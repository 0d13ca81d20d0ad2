use fiscalwire_format::Command as FiscalCommand;
use fiscalwire_session::SessionError;

use crate::cmd::StatusArgs;
use crate::exit::{session_error, CliResult, DEVICE_ERROR, SUCCESS};
use crate::output::{print_status, OutputFormat};

pub fn run(args: StatusArgs, format: OutputFormat) -> CliResult<i32> {
    let mut session = args.device.open()?;

    let result = if args.extended {
        session.exchange(FiscalCommand::M74O, &["X".into()])
    } else {
        session.exchange(FiscalCommand::M74, &[])
    };
    // An error status is still a status worth printing.
    let status = match result {
        Ok(response) => response.status,
        Err(SessionError::DeviceStatus(status)) => status,
        Err(err) => return Err(session_error("status failed", err)),
    };

    print_status(&status, format);
    Ok(if status.has_error() {
        DEVICE_ERROR
    } else {
        SUCCESS
    })
}
