use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum;
use crate::error::{FrameError, Result};
use crate::status::DeviceStatus;
use crate::wire::{
    CHECKSUM_SIZE, FRAME_END, HEADER_SIZE, LENGTH_OFFSET, MAX_BODY_SIZE, PAYLOAD_END, START,
    STATUS_BLOCK_SIZE, STATUS_MARKER, STATUS_SIZE, TRAILER_SIZE,
};

/// Default bound on consecutive busy signals tolerated while waiting for a frame.
pub const DEFAULT_MAX_BUSY_SIGNALS: usize = 1024;

/// Which side produced the frame being decoded.
///
/// Only device responses carry a status block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

impl Direction {
    pub fn has_status(self) -> bool {
        matches!(self, Direction::DeviceToHost)
    }
}

/// Message id and message number carried after the length byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub message_id: u8,
    pub message_number: u8,
}

impl FrameHeader {
    pub fn new(message_id: u8, message_number: u8) -> Self {
        Self {
            message_id,
            message_number,
        }
    }
}

/// A validated frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub message_id: u8,
    pub message_number: u8,
    /// Encoded fields, without status block or terminators.
    pub payload: Bytes,
    /// Present on device responses only.
    pub status: Option<DeviceStatus>,
}

impl Frame {
    pub fn header(&self) -> FrameHeader {
        FrameHeader::new(self.message_id, self.message_number)
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        let status = if self.status.is_some() {
            STATUS_BLOCK_SIZE
        } else {
            0
        };
        HEADER_SIZE + self.payload.len() + status + TRAILER_SIZE
    }
}

/// Encode a frame into the wire format.
///
/// ```text
/// ┌───────┬─────┬────┬─────┬─────────┬───────────────┬──────┬─────────┬──────┐
/// │ 0x01  │ LEN │ ID │ NUM │ payload │ [0x04 status] │ 0x05 │ bcc(4)  │ 0x03 │
/// └───────┴─────┴────┴─────┴─────────┴───────────────┴──────┴─────────┴──────┘
/// ```
///
/// `LEN` is 36 plus the body length (payload and status block). The checksum
/// covers everything from `0x01` up to the byte before `0x05`.
pub fn encode_frame(
    header: FrameHeader,
    payload: &[u8],
    status: Option<&DeviceStatus>,
    dst: &mut BytesMut,
) -> Result<()> {
    let body_len = payload.len() + status.map_or(0, |_| STATUS_BLOCK_SIZE);
    if body_len > MAX_BODY_SIZE {
        return Err(FrameError::PayloadTooLarge {
            size: body_len,
            max: MAX_BODY_SIZE,
        });
    }

    let start = dst.len();
    dst.reserve(HEADER_SIZE + body_len + TRAILER_SIZE);
    dst.put_u8(START);
    dst.put_u8(LENGTH_OFFSET + body_len as u8);
    dst.put_u8(header.message_id);
    dst.put_u8(header.message_number);
    dst.put_slice(payload);
    if let Some(status) = status {
        dst.put_u8(STATUS_MARKER);
        dst.put_slice(status.as_bytes());
    }

    let covered = &dst[start..];
    let (head, body) = covered.split_at(HEADER_SIZE);
    let bcc = checksum::render(checksum::compute(head, body));
    dst.put_u8(PAYLOAD_END);
    dst.put_slice(&bcc);
    dst.put_u8(FRAME_END);
    Ok(())
}

/// Body length announced by a length byte, rejecting values below the offset
/// (or below the status block for device responses).
pub(crate) fn body_length(length: u8, direction: Direction) -> Result<(usize, usize)> {
    let status = if direction.has_status() {
        STATUS_BLOCK_SIZE as u8
    } else {
        0
    };
    let minimum = LENGTH_OFFSET + status;
    if length < minimum {
        return Err(FrameError::InvalidLength { length, minimum });
    }
    let body = usize::from(length - LENGTH_OFFSET);
    let payload = if direction.has_status() {
        body - STATUS_BLOCK_SIZE
    } else {
        body
    };
    Ok((body, payload))
}

pub(crate) fn expect_byte(
    field: &'static str,
    position: usize,
    found: u8,
    expected: u8,
) -> Result<()> {
    if found != expected {
        return Err(FrameError::Malformed {
            field,
            position,
            found,
            expected,
        });
    }
    Ok(())
}

/// Validate a complete frame held in memory.
///
/// `bytes` must start at the start marker; anything after the frame
/// terminator is ignored. Busy and NAK signals are the reader's concern.
pub fn parse_frame(bytes: &[u8], direction: Direction) -> Result<Frame> {
    if bytes.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }
    expect_byte("start", 0, bytes[0], START)?;
    let length = bytes[1];
    let (body_len, payload_len) = body_length(length, direction)?;

    let body_end = HEADER_SIZE + body_len;
    let frame_len = body_end + TRAILER_SIZE;
    if bytes.len() < frame_len {
        return Err(FrameError::Truncated {
            needed: frame_len,
            available: bytes.len(),
        });
    }

    let header = &bytes[..HEADER_SIZE];
    let payload = &bytes[HEADER_SIZE..HEADER_SIZE + payload_len];

    let status = if direction.has_status() {
        let marker = HEADER_SIZE + payload_len;
        expect_byte("status marker", marker, bytes[marker], STATUS_MARKER)?;
        DeviceStatus::from_slice(&bytes[marker + 1..marker + 1 + STATUS_SIZE])
    } else {
        None
    };

    expect_byte("payload end", body_end, bytes[body_end], PAYLOAD_END)?;
    let digits = &bytes[body_end + 1..body_end + 1 + CHECKSUM_SIZE];
    let end = body_end + 1 + CHECKSUM_SIZE;
    expect_byte("frame end", end, bytes[end], FRAME_END)?;
    checksum::verify(header, &bytes[HEADER_SIZE..body_end], digits)?;

    Ok(Frame {
        message_id: header[2],
        message_number: header[3],
        payload: Bytes::copy_from_slice(payload),
        status,
    })
}

/// Configuration for frame decoding.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Consecutive busy signals tolerated before giving up with
    /// [`FrameError::DeviceBusy`]. `None` waits forever.
    pub max_busy_signals: Option<usize>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_busy_signals: Some(DEFAULT_MAX_BUSY_SIGNALS),
        }
    }
}
