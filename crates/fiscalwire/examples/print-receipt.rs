//! Print a one-item fiscal receipt and pay it in cash.
//!
//! Run with:
//!   cargo run --example print-receipt -- /dev/ttyUSB0
//!
//! The port defaults to `FISCALWIRE_PORT` when no argument is given.

use fiscalwire::format::{FormatConfig, TextEncoding};
use fiscalwire::frame::DeviceStatus;
use fiscalwire::session::{CommandSession, FiscalPrinter, RibbonWait, SessionConfig};
use fiscalwire::transport::SerialChannel;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FISCALWIRE_PORT").ok())
        .ok_or("usage: print-receipt <serial-port>")?;

    let writer = SerialChannel::open(&port)?;
    let reader = writer.try_clone()?;
    let config = SessionConfig {
        format: FormatConfig {
            text_encoding: TextEncoding::Windows1251,
            ..FormatConfig::default()
        },
        ..SessionConfig::default()
    };
    let session = CommandSession::with_config(writer, reader, config).with_retry_policy(
        RibbonWait::with_notify(|status: &DeviceStatus| {
            eprintln!("ribbon problem ({status}), press Enter once it is fixed");
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
        }),
    );
    let mut printer = FiscalPrinter::new(session);

    if !printer.is_fiscalized()? {
        eprintln!("warning: printer is not fiscalized");
    }

    // Leave the printer in a known state before starting.
    printer.close_open_receipt(|| true, || true)?;

    printer.open_fiscal_receipt("1", "0000", 1)?;
    printer.sell_item(1, 2.0, true, false)?;
    eprintln!("amount due: {:.2}", printer.amount_to_pay()?);
    printer.record_payment("", 0.0)?;
    printer.close_fiscal_receipt()?;

    let totals = printer.day_totals()?;
    eprintln!(
        "day total {:.2} over {} fiscal receipts",
        totals.total, totals.fiscal_receipts
    );
    Ok(())
}
