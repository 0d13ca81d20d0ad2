use std::time::{Duration, Instant};

use fiscalwire_format::Command as FiscalCommand;
use fiscalwire_session::{CancelFlag, SessionError};
use tracing::info;

use crate::cmd::{parse_duration, WatchArgs};
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_status, OutputFormat};

const SLEEP_SLICE: Duration = Duration::from_millis(50);

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let mut session = args.device.open()?;

    let cancel = session.cancel_flag();
    install_ctrlc_handler(cancel.clone())?;

    let mut last = None;
    let mut printed = 0usize;

    while !cancel.is_cancelled() {
        let status = match session.exchange(FiscalCommand::M74, &[]) {
            Ok(response) => response.status,
            Err(SessionError::DeviceStatus(status)) => status,
            Err(SessionError::Cancelled) => break,
            Err(err) => return Err(session_error("status failed", err)),
        };

        if last != Some(status) {
            print_status(&status, format);
            last = Some(status);
            printed = printed.saturating_add(1);

            if let Some(count) = args.count {
                if printed >= count {
                    return Ok(SUCCESS);
                }
            }
        }

        sleep_unless_cancelled(interval, &cancel);
    }

    info!("watch interrupted");
    Ok(SUCCESS)
}

fn sleep_unless_cancelled(interval: Duration, cancel: &CancelFlag) {
    let deadline = Instant::now() + interval;
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

fn install_ctrlc_handler(cancel: CancelFlag) -> CliResult<()> {
    ctrlc::set_handler(move || cancel.cancel())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
