//! Command sessions for fiscal printers.
//!
//! [`CommandSession`] pairs a frame writer and reader, hands out message ids,
//! checks that responses echo the request and turns the device status into
//! errors. A [`RetryPolicy`] decides whether a failed status is worth another
//! attempt. [`FiscalPrinter`] layers named operations on top.
//!
//! ```no_run
//! use fiscalwire_format::Command;
//! use fiscalwire_session::CommandSession;
//! use fiscalwire_transport::MemoryChannel;
//!
//! let line = MemoryChannel::new();
//! let mut session = CommandSession::new(line.clone(), line);
//! let values = session.call(Command::M99, &[])?;
//! println!("tax number: {}", values[0]);
//! # Ok::<(), fiscalwire_session::SessionError>(())
//! ```

pub mod error;
pub mod printer;
pub mod retry;
pub mod session;

pub use error::{Result, SessionError};
pub use printer::{
    DailyReportKind, DayPayments, DayTotals, FiscalMemoryReportKind, FiscalPrinter, Item,
    ItemsInfo, ItemsReportKind, TaxGroupTotals, TaxRates, TransactionStatus, INVALID_ITEM_NAME,
    TAX_GROUPS,
};
pub use retry::{CancelFlag, NeverRetry, RetryPolicy, RibbonWait, DEFAULT_RIBBON_DELAY};
pub use session::{CommandSession, Response, SessionConfig, DEFAULT_MAX_ATTEMPTS};
