use bytes::{BufMut, Bytes, BytesMut};
use fiscalwire_transport::ByteChannel;
use tracing::{debug, trace};

use crate::checksum;
use crate::codec::{body_length, expect_byte, Direction, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::status::DeviceStatus;
use crate::wire::{
    BUSY, CHECKSUM_SIZE, FRAME_END, HEADER_SIZE, MAX_FRAME_SIZE, NAK, PAYLOAD_END, START,
    STATUS_MARKER, STATUS_SIZE,
};

/// Reads complete frames from a [`ByteChannel`], one byte at a time.
///
/// Leading busy signals are skipped (up to [`FrameConfig::max_busy_signals`]);
/// a NAK fails the read with [`FrameError::Rejected`] before anything else is
/// consumed. Every structural byte is checked as it arrives.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: ByteChannel> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
            config,
        }
    }

    /// Read the next device response (blocking).
    pub fn read_response(&mut self) -> Result<Frame> {
        self.read_frame(Direction::DeviceToHost)
    }

    /// Read the next frame (blocking).
    pub fn read_frame(&mut self, direction: Direction) -> Result<Frame> {
        self.buf.clear();
        self.await_start()?;
        self.buf.put_u8(START);

        let length = self.next()?;
        let (body_len, payload_len) = body_length(length, direction)?;
        let message_id = self.next()?;
        let message_number = self.next()?;

        for _ in 0..payload_len {
            self.next()?;
        }

        let status = if direction.has_status() {
            let position = self.buf.len();
            expect_byte("status marker", position, self.next()?, STATUS_MARKER)?;
            for _ in 0..STATUS_SIZE {
                self.next()?;
            }
            DeviceStatus::from_slice(&self.buf[position + 1..])
        } else {
            None
        };

        let body_end = HEADER_SIZE + body_len;
        expect_byte("payload end", body_end, self.next()?, PAYLOAD_END)?;
        for _ in 0..CHECKSUM_SIZE {
            self.next()?;
        }
        let end = self.buf.len();
        expect_byte("frame end", end, self.next()?, FRAME_END)?;

        trace!(bytes = ?&self.buf[..], "rx frame");

        let (header, rest) = self.buf.split_at(HEADER_SIZE);
        let (body, trailer) = rest.split_at(body_len);
        checksum::verify(header, body, &trailer[1..1 + CHECKSUM_SIZE])?;

        Ok(Frame {
            message_id,
            message_number,
            payload: Bytes::copy_from_slice(&self.buf[HEADER_SIZE..HEADER_SIZE + payload_len]),
            status,
        })
    }

    /// Skip busy signals until the start marker arrives.
    fn await_start(&mut self) -> Result<()> {
        let mut signals = 0usize;
        loop {
            match self.inner.read_byte()? {
                START => return Ok(()),
                BUSY => {
                    signals += 1;
                    debug!(signals, "device busy");
                    if let Some(max) = self.config.max_busy_signals {
                        if signals > max {
                            return Err(FrameError::DeviceBusy { signals });
                        }
                    }
                }
                NAK => return Err(FrameError::Rejected),
                other => {
                    return Err(FrameError::Malformed {
                        field: "start",
                        position: 0,
                        found: other,
                        expected: START,
                    })
                }
            }
        }
    }

    fn next(&mut self) -> Result<u8> {
        let byte = self.inner.read_byte()?;
        self.buf.put_u8(byte);
        Ok(byte)
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner channel.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Update the busy-signal bound for subsequent reads.
    pub fn set_max_busy_signals(&mut self, max_busy_signals: Option<usize>) {
        self.config.max_busy_signals = max_busy_signals;
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use fiscalwire_transport::{MemoryChannel, TransportError};

    use super::*;
    use crate::codec::{encode_frame, FrameHeader};

    const IDLE: [u8; 6] = [0x80, 0x80, 0x80, 0x85, 0x80, 0xBA];

    const M74_RESPONSE: [u8; 23] = [
        0x01, 0x31, 0x3C, 0x4A, 0x80, 0x80, 0x80, 0x85, 0x80, 0xBA, 0x04, 0x80, 0x80, 0x80, 0x85,
        0x80, 0xBA, 0x05, 0x30, 0x37, 0x33, 0x3E, 0x03,
    ];

    const M99_RESPONSE: [u8; 30] = [
        0x01, 0x38, 0x3E, 0x63, 0x31, 0x30, 0x30, 0x30, 0x37, 0x37, 0x35, 0x35, 0x36, 0x2C, 0xCF,
        0xC8, 0xC1, 0x04, 0x80, 0x80, 0x80, 0x85, 0x80, 0xBA, 0x05, 0x30, 0x38, 0x37, 0x34, 0x03,
    ];

    #[test]
    fn read_device_response() {
        let mut reader = FrameReader::new(MemoryChannel::with_input(M74_RESPONSE));
        let frame = reader.read_response().unwrap();

        assert_eq!(frame.message_id, 0x3C);
        assert_eq!(frame.message_number, 74);
        assert_eq!(frame.payload.as_ref(), &IDLE);
        assert!(frame.status.unwrap().is_fiscalized());
        assert_eq!(reader.get_ref().remaining(), 0);
    }

    #[test]
    fn read_response_with_text_payload() {
        let mut reader = FrameReader::new(MemoryChannel::with_input(M99_RESPONSE));
        let frame = reader.read_response().unwrap();

        assert_eq!(frame.message_number, 99);
        assert_eq!(&frame.payload[..10], b"100077556,");
        assert_eq!(&frame.payload[10..], &[0xCF, 0xC8, 0xC1]);
    }

    #[test]
    fn skips_busy_signals() {
        let channel = MemoryChannel::with_input([BUSY, BUSY, BUSY]);
        channel.push_input(M74_RESPONSE);
        let mut reader = FrameReader::new(channel);
        assert!(reader.read_response().is_ok());
    }

    #[test]
    fn busy_bound_is_enforced() {
        let channel = MemoryChannel::with_input([BUSY; 4]);
        channel.push_input(M74_RESPONSE);
        let config = FrameConfig {
            max_busy_signals: Some(3),
        };
        let mut reader = FrameReader::with_config(channel, config);
        let err = reader.read_response().unwrap_err();
        assert!(matches!(err, FrameError::DeviceBusy { signals: 4 }));
    }

    #[test]
    fn unbounded_busy_waits_for_frame() {
        let channel = MemoryChannel::with_input([BUSY; 5000]);
        channel.push_input(M74_RESPONSE);
        let mut reader = FrameReader::with_config(
            channel,
            FrameConfig {
                max_busy_signals: None,
            },
        );
        assert!(reader.read_response().is_ok());
    }

    #[test]
    fn nak_rejects_without_reading_further() {
        let channel = MemoryChannel::with_input([NAK]);
        channel.push_input(M74_RESPONSE);
        let mut reader = FrameReader::new(channel);

        assert!(matches!(reader.read_response().unwrap_err(), FrameError::Rejected));
        assert_eq!(reader.get_ref().remaining(), M74_RESPONSE.len());
    }

    #[test]
    fn unexpected_leading_byte() {
        let mut reader = FrameReader::new(MemoryChannel::with_input([0x02]));
        match reader.read_response().unwrap_err() {
            FrameError::Malformed { found, expected, .. } => {
                assert_eq!(found, 0x02);
                assert_eq!(expected, START);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_status_marker() {
        let mut wire = M74_RESPONSE;
        wire[10] = 0x00;
        let mut reader = FrameReader::new(MemoryChannel::with_input(wire));
        match reader.read_response().unwrap_err() {
            FrameError::Malformed {
                field,
                position,
                found,
                expected,
            } => {
                assert_eq!(field, "status marker");
                assert_eq!(position, 10);
                assert_eq!(found, 0x00);
                assert_eq!(expected, STATUS_MARKER);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_frame_terminator() {
        let mut wire = M74_RESPONSE;
        wire[22] = 0x04;
        let mut reader = FrameReader::new(MemoryChannel::with_input(wire));
        assert!(matches!(
            reader.read_response().unwrap_err(),
            FrameError::Malformed {
                field: "frame end",
                position: 22,
                ..
            }
        ));
    }

    #[test]
    fn checksum_mismatch_on_corrupted_payload() {
        let mut wire = M74_RESPONSE;
        wire[5] = 0x81;
        let mut reader = FrameReader::new(MemoryChannel::with_input(wire));
        assert!(matches!(
            reader.read_response().unwrap_err(),
            FrameError::ChecksumMismatch { .. }
        ));
    }

    #[test]
    fn exhausted_channel_surfaces_transport_error() {
        let mut reader = FrameReader::new(MemoryChannel::with_input(&M74_RESPONSE[..12]));
        assert!(matches!(
            reader.read_response().unwrap_err(),
            FrameError::Transport(TransportError::Exhausted)
        ));
    }

    #[test]
    fn reads_host_frames_back_to_back() {
        let mut wire = BytesMut::new();
        encode_frame(FrameHeader::new(32, 33), b"", None, &mut wire).unwrap();
        encode_frame(FrameHeader::new(33, 44), b"3.29", None, &mut wire).unwrap();

        let mut reader = FrameReader::new(MemoryChannel::with_input(&wire));
        let first = reader.read_frame(Direction::HostToDevice).unwrap();
        let second = reader.read_frame(Direction::HostToDevice).unwrap();

        assert_eq!(first.header(), FrameHeader::new(32, 33));
        assert_eq!(second.payload.as_ref(), b"3.29");
    }
}
