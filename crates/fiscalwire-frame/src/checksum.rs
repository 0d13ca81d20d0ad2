//! Block check (BCC) over header and body.
//!
//! The sum starts at 4 and adds every byte from the start marker up to, but not
//! including, the payload terminator. The 16-bit result is rendered as four
//! digits, one per nibble, each written as `0x30 + nibble` (so 10..15 come out
//! as `:;<=>?`, not `A..F`).

use crate::error::{FrameError, Result};
use crate::wire::CHECKSUM_SIZE;

const SEED: u16 = 4;

/// Sum `header` and `body` into the 16-bit check value.
pub fn compute(header: &[u8], body: &[u8]) -> u16 {
    header
        .iter()
        .chain(body)
        .fold(SEED, |sum, &byte| sum.wrapping_add(u16::from(byte)))
}

/// Render a check value as four wire digits.
pub fn render(value: u16) -> [u8; CHECKSUM_SIZE] {
    let [high, low] = value.to_be_bytes();
    [
        0x30 + (high >> 4),
        0x30 + (high & 0x0F),
        0x30 + (low >> 4),
        0x30 + (low & 0x0F),
    ]
}

/// Parse four wire digits back into a check value.
///
/// Returns `None` if any digit is outside `0x30..=0x3F`.
pub fn parse(digits: &[u8]) -> Option<u16> {
    if digits.len() != CHECKSUM_SIZE {
        return None;
    }
    digits.iter().try_fold(0u16, |value, &digit| {
        let nibble = digit.checked_sub(0x30).filter(|n| *n < 16)?;
        Some((value << 4) | u16::from(nibble))
    })
}

/// Recompute the checksum and compare it byte-for-byte with `found`.
pub fn verify(header: &[u8], body: &[u8], found: &[u8]) -> Result<()> {
    let expected = render(compute(header, body));
    if found != expected {
        let mut actual = [0u8; CHECKSUM_SIZE];
        let n = found.len().min(CHECKSUM_SIZE);
        actual[..n].copy_from_slice(&found[..n]);
        return Err(FrameError::ChecksumMismatch {
            expected,
            found: actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_message_checksum() {
        let header = [0x01, 0x24, 0x20, 0x21];
        assert_eq!(compute(&header, &[]), 0x006A);
        assert_eq!(render(0x006A), *b"006:");
    }

    #[test]
    fn renders_high_nibbles_past_nine() {
        assert_eq!(render(0x073E), [0x30, 0x37, 0x33, 0x3E]);
        assert_eq!(render(0xFFFF), *b"????");
    }

    #[test]
    fn parse_inverts_render() {
        for value in [0u16, 0x006A, 0x073E, 0xABCD, 0xFFFF] {
            assert_eq!(parse(&render(value)), Some(value));
        }
        assert_eq!(parse(b"00A0"), None);
        assert_eq!(parse(b"000"), None);
    }

    #[test]
    fn flipping_a_body_byte_changes_digits() {
        let header = [0x01, 0x28, 0x20, 0x2C];
        let body = *b"3.29";
        let original = render(compute(&header, &body));
        for i in 0..body.len() {
            let mut flipped = body;
            flipped[i] ^= 0x01;
            assert_ne!(render(compute(&header, &flipped)), original);
        }
    }

    #[test]
    fn verify_reports_both_values() {
        let header = [0x01, 0x24, 0x20, 0x21];
        verify(&header, &[], b"006:").unwrap();

        let err = verify(&header, &[], b"0069").unwrap_err();
        match err {
            FrameError::ChecksumMismatch { expected, found } => {
                assert_eq!(&expected, b"006:");
                assert_eq!(&found, b"0069");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sum_wraps_at_16_bits() {
        let body = vec![0xFF; 300];
        let expected = (4u32 + 300 * 0xFF) % 65536;
        assert_eq!(u32::from(compute(&[], &body)), expected);
    }
}
