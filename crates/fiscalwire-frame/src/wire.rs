//! Wire-level constants.
//!
//! Every frame looks like
//! `START LEN ID NUM payload [STATUS_MARKER status(6)] PAYLOAD_END bcc(4) END`
//! where `LEN = 36 + body length` and the body is everything between the
//! header and the payload terminator.

/// Start-of-frame marker.
pub const START: u8 = 0x01;

/// Frame terminator.
pub const FRAME_END: u8 = 0x03;

/// Precedes the six status bytes in device responses.
pub const STATUS_MARKER: u8 = 0x04;

/// Ends the payload (and status block, if any).
pub const PAYLOAD_END: u8 = 0x05;

/// Device rejected the previous frame (negative acknowledge).
pub const NAK: u8 = 0x15;

/// Device is still working on the previous command.
pub const BUSY: u8 = 0x16;

/// Number of device status bytes.
pub const STATUS_SIZE: usize = 6;

/// Added to the body length to form the length byte.
pub const LENGTH_OFFSET: u8 = 36;

/// Start, length, message id, message number.
pub const HEADER_SIZE: usize = 4;

/// Rendered checksum digits.
pub const CHECKSUM_SIZE: usize = 4;

/// Payload terminator + checksum + frame terminator.
pub const TRAILER_SIZE: usize = 1 + CHECKSUM_SIZE + 1;

/// Status marker + status bytes carried by device responses.
pub const STATUS_BLOCK_SIZE: usize = 1 + STATUS_SIZE;

/// Largest body the one-byte length field can describe.
pub const MAX_BODY_SIZE: usize = (u8::MAX - LENGTH_OFFSET) as usize;

/// Largest complete frame on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_BODY_SIZE + TRAILER_SIZE;

/// Lowest message id a session hands out.
pub const MIN_MESSAGE_ID: u8 = 32;

/// Highest message id before wrapping back to [`MIN_MESSAGE_ID`].
pub const MAX_MESSAGE_ID: u8 = 127;

/// Returns a human-readable name for a control byte.
pub fn control_name(byte: u8) -> &'static str {
    match byte {
        START => "START",
        FRAME_END => "END",
        STATUS_MARKER => "STATUS",
        PAYLOAD_END => "PAYLOAD_END",
        NAK => "NAK",
        BUSY => "BUSY",
        _ => "DATA",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_limits() {
        assert_eq!(MAX_BODY_SIZE, 219);
        assert_eq!(MAX_FRAME_SIZE, 229);
    }

    #[test]
    fn names_control_bytes() {
        assert_eq!(control_name(0x15), "NAK");
        assert_eq!(control_name(0x16), "BUSY");
        assert_eq!(control_name(b'A'), "DATA");
    }
}
