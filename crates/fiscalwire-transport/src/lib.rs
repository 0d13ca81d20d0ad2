//! Blocking byte channels for fiscal printer links.
//!
//! The protocol engine only ever needs two operations from the line: read one
//! byte (blocking, failing when nothing more can arrive) and write a complete
//! frame. This crate provides that contract as [`ByteChannel`] plus the
//! concrete channels used in practice:
//! - [`SerialChannel`] for RS-232 / USB-serial lines (feature `serial`)
//! - [`MemoryChannel`] for replaying captured exchanges and for tests
//! - [`IoChannel`] for any std `Read + Write` stream

pub mod error;
pub mod memory;
#[cfg(feature = "serial")]
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::MemoryChannel;
#[cfg(feature = "serial")]
pub use serial::{available_ports, ChannelConfig, SerialChannel};
pub use traits::{ByteChannel, IoChannel};
