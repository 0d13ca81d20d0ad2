use fiscalwire_transport::TransportError;

use crate::wire::{control_name, CHECKSUM_SIZE};

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A structural byte did not match what the frame layout requires.
    #[error(
        "malformed frame: {field} at byte {position} was 0x{found:02X} ({}), expected 0x{expected:02X} ({})",
        control_name(*.found),
        control_name(*.expected)
    )]
    Malformed {
        field: &'static str,
        position: usize,
        found: u8,
        expected: u8,
    },

    /// The length byte is too small to describe the mandatory frame parts.
    #[error("invalid length byte 0x{length:02X} (minimum 0x{minimum:02X})")]
    InvalidLength { length: u8, minimum: u8 },

    /// The buffer ends before the frame its length byte announces.
    #[error("truncated frame ({available} of {needed} bytes)")]
    Truncated { needed: usize, available: usize },

    /// The recomputed checksum differs from the one carried by the frame.
    #[error(
        "checksum mismatch (expected {}, found {})",
        String::from_utf8_lossy(expected),
        String::from_utf8_lossy(found)
    )]
    ChecksumMismatch {
        expected: [u8; CHECKSUM_SIZE],
        found: [u8; CHECKSUM_SIZE],
    },

    /// The device answered NAK: it rejected the previously sent frame.
    #[error("device rejected the previous frame (NAK)")]
    Rejected,

    /// The device kept signalling busy past the configured bound.
    #[error("device still busy after {signals} busy signals")]
    DeviceBusy { signals: usize },

    /// The frame body does not fit the one-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The underlying byte channel failed.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
