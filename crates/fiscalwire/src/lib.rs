//! Driver for serial-attached fiscal printers.
//!
//! The printers speak a framed request/response protocol over RS-232: every
//! request carries a cycling message id, every response echoes it together with
//! a six-byte status block, and every frame ends in a four-digit block check.
//!
//! # Crate Structure
//!
//! - [`transport`]: blocking byte channels (serial port, in-memory, std streams)
//! - [`frame`]: frame encoding, the byte-at-a-time frame reader, device status
//! - [`format`]: payload templates, typed field values, the command table
//! - [`session`]: command round trips, retry policy and printer operations
//!   (behind the `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use fiscalwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use fiscalwire_frame::*;
}

/// Re-export payload format types.
pub mod format {
    pub use fiscalwire_format::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use fiscalwire_session::*;
}
