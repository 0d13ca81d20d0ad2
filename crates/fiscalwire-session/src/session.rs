use std::fmt;

use bytes::Bytes;
use fiscalwire_format::{
    decode_fields, encode_fields, Command, FieldValue, FormatConfig, SlotKind,
};
use fiscalwire_frame::{
    DeviceStatus, FrameConfig, FrameHeader, FrameReader, FrameWriter, MAX_MESSAGE_ID,
    MIN_MESSAGE_ID,
};
use fiscalwire_transport::ByteChannel;
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::retry::{CancelFlag, NeverRetry, RetryPolicy};

/// Default bound on attempts per call when a retry policy keeps asking for more.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// First message id handed out; clamped to `32..=127`.
    pub starting_message_id: u8,
    /// Attempts per call before [`SessionError::RetriesExhausted`]. `None`
    /// lets the retry policy loop forever.
    pub max_attempts: Option<u32>,
    /// Require responses to echo the request's message id and number.
    pub verify_echo: bool,
    pub frame: FrameConfig,
    pub format: FormatConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_message_id: MIN_MESSAGE_ID,
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            verify_echo: true,
            frame: FrameConfig::default(),
            format: FormatConfig::default(),
        }
    }
}

/// A validated response whose status carries no error.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub message_id: u8,
    pub message_number: u8,
    /// Undecoded response fields.
    pub payload: Bytes,
    pub status: DeviceStatus,
}

/// Drives request/response round trips with one device.
///
/// Requests go out through `W` and responses come back through `R`; both may
/// be handles to the same line. Exactly one exchange is in flight at a time.
pub struct CommandSession<W, R = W> {
    writer: FrameWriter<W>,
    reader: FrameReader<R>,
    next_id: u8,
    config: SessionConfig,
    retry: Box<dyn RetryPolicy + Send>,
    cancel: CancelFlag,
}

impl<W: ByteChannel, R: ByteChannel> CommandSession<W, R> {
    /// Create a session with default configuration.
    pub fn new(writer: W, reader: R) -> Self {
        Self::with_config(writer, reader, SessionConfig::default())
    }

    /// Create a session with explicit configuration.
    pub fn with_config(writer: W, reader: R, config: SessionConfig) -> Self {
        let next_id = config
            .starting_message_id
            .clamp(MIN_MESSAGE_ID, MAX_MESSAGE_ID);
        Self {
            writer: FrameWriter::new(writer),
            reader: FrameReader::with_config(reader, config.frame.clone()),
            next_id,
            config,
            retry: Box::new(NeverRetry),
            cancel: CancelFlag::new(),
        }
    }

    /// Replace the retry policy.
    pub fn set_retry_policy(&mut self, policy: impl RetryPolicy + Send + 'static) {
        self.retry = Box::new(policy);
    }

    /// Builder form of [`set_retry_policy`](Self::set_retry_policy).
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + Send + 'static) -> Self {
        self.set_retry_policy(policy);
        self
    }

    /// Share an externally owned cancel flag.
    pub fn set_cancel_flag(&mut self, flag: CancelFlag) {
        self.cancel = flag;
    }

    /// Handle that cancels this session's calls between attempts.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Hand out the current message id and advance, wrapping 127 → 32.
    pub fn next_message_id(&mut self) -> u8 {
        let id = self.next_id;
        self.next_id = if id >= MAX_MESSAGE_ID {
            MIN_MESSAGE_ID
        } else {
            id + 1
        };
        id
    }

    /// One validated round trip: encode, send, receive, apply the retry
    /// policy, then fail on any error-class status.
    pub fn exchange(&mut self, command: Command, params: &[FieldValue]) -> Result<Response> {
        let descriptor = command.descriptor();
        let format = self.config.format;
        let template = descriptor.host_template(format.legacy_codes);
        let mut payload = Vec::new();
        encode_fields(&template, params, &format.text_encoding, &mut payload)?;

        let mut attempt = 0u32;
        loop {
            if self.cancel.is_cancelled() {
                return Err(SessionError::Cancelled);
            }
            attempt += 1;

            let header = FrameHeader::new(self.next_message_id(), descriptor.message_number);
            debug!(
                %command,
                message_id = header.message_id,
                attempt,
                "sending command"
            );
            self.writer.send(header, &payload)?;
            let frame = self.reader.read_response()?;

            if self.config.verify_echo && frame.header() != header {
                return Err(SessionError::ResponseMismatch {
                    expected_id: header.message_id,
                    expected_number: header.message_number,
                    found_id: frame.message_id,
                    found_number: frame.message_number,
                });
            }
            let status = frame.status.ok_or(SessionError::MissingStatus)?;

            if self.retry.should_retry(&status, attempt) {
                if self.config.max_attempts.is_some_and(|max| attempt >= max) {
                    return Err(SessionError::RetriesExhausted {
                        attempts: attempt,
                        status,
                    });
                }
                info!(%command, attempt, %status, "retrying command");
                continue;
            }

            if status.has_error() {
                return Err(SessionError::DeviceStatus(status));
            }
            if status.has_warning() {
                warn!(%command, %status, "device warning");
            }

            return Ok(Response {
                message_id: frame.message_id,
                message_number: frame.message_number,
                payload: frame.payload,
                status,
            });
        }
    }

    /// Round trip, decoding the response into each field's natural slot.
    pub fn call(&mut self, command: Command, params: &[FieldValue]) -> Result<Vec<FieldValue>> {
        let response = self.exchange(command, params)?;
        let slots: Vec<SlotKind> = command
            .descriptor()
            .device_template(self.config.format.legacy_codes)
            .fields()
            .map(SlotKind::natural)
            .collect();
        self.decode(command, &response, &slots)
    }

    /// Round trip, decoding the response into caller-chosen slots.
    pub fn call_with_slots(
        &mut self,
        command: Command,
        params: &[FieldValue],
        slots: &[SlotKind],
    ) -> Result<Vec<FieldValue>> {
        let response = self.exchange(command, params)?;
        self.decode(command, &response, slots)
    }

    /// Decode a response payload against `command`'s response layout.
    pub fn decode(
        &self,
        command: Command,
        response: &Response,
        slots: &[SlotKind],
    ) -> Result<Vec<FieldValue>> {
        let format = self.config.format;
        let template = command.descriptor().device_template(format.legacy_codes);
        Ok(decode_fields(
            &template,
            &response.payload,
            slots,
            &format.text_encoding,
        )?)
    }

    /// Borrow the request channel.
    pub fn writer(&self) -> &W {
        self.writer.get_ref()
    }

    /// Borrow the response channel.
    pub fn reader(&self) -> &R {
        self.reader.get_ref()
    }

    /// Consume the session and return both channels.
    pub fn into_channels(self) -> (W, R) {
        (self.writer.into_inner(), self.reader.into_inner())
    }
}

impl<W, R> fmt::Debug for CommandSession<W, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSession")
            .field("next_id", &self.next_id)
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use fiscalwire_format::TextEncoding;
    use fiscalwire_frame::{encode_frame, FrameError};
    use fiscalwire_transport::{MemoryChannel, TransportError};

    use super::*;

    const IDLE: [u8; 6] = [0x80, 0x80, 0x80, 0x85, 0x80, 0xBA];
    const RIBBON_OUT: [u8; 6] = [0x80, 0x80, 0x81, 0x80, 0x80, 0xBA];

    fn response(id: u8, number: u8, payload: &[u8], status: [u8; 6]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        let status = DeviceStatus::new(status);
        encode_frame(FrameHeader::new(id, number), payload, Some(&status), &mut wire)
            .expect("response should encode");
        wire.to_vec()
    }

    fn session(start: u8) -> (CommandSession<MemoryChannel>, MemoryChannel) {
        let line = MemoryChannel::new();
        let config = SessionConfig {
            starting_message_id: start,
            ..SessionConfig::default()
        };
        let session = CommandSession::with_config(line.clone(), line.clone(), config);
        (session, line)
    }

    #[test]
    fn status_round_trip() {
        let (mut session, line) = session(60);
        line.push_input(response(60, 74, &IDLE, IDLE));

        let response = session
            .exchange(Command::M74O, &["X".into()])
            .expect("exchange should succeed");

        assert_eq!(
            line.written(),
            [0x01, 0x25, 0x3C, 0x4A, 0x58, 0x05, 0x30, 0x31, 0x30, 0x38, 0x03]
        );
        assert!(response.status.is_fiscalized());
        assert_eq!(response.payload.as_ref(), &IDLE);
    }

    #[test]
    fn call_decodes_natural_slots() {
        let (mut session, line) = session(32);
        line.push_input(response(32, 48, b"0007,00A1", IDLE));

        let values = session
            .call(Command::M48, &["1".into(), "0000".into(), 1.into()])
            .expect("call should succeed");

        assert_eq!(values, vec![FieldValue::Integer(7), FieldValue::Integer(0xA1)]);
        assert_eq!(&line.written()[4..12], b"1;0000,1");
    }

    #[test]
    fn message_ids_wrap() {
        let (mut session, _) = session(126);
        assert_eq!(session.next_message_id(), 126);
        assert_eq!(session.next_message_id(), 127);
        assert_eq!(session.next_message_id(), 32);
        assert_eq!(session.next_message_id(), 33);
    }

    #[test]
    fn starting_id_is_clamped() {
        let (mut low, _) = session(0);
        assert_eq!(low.next_message_id(), 32);
        let (mut high, _) = session(200);
        assert_eq!(high.next_message_id(), 127);
        assert_eq!(high.next_message_id(), 32);
    }

    #[test]
    fn error_status_fails_with_snapshot() {
        let (mut session, line) = session(32);
        line.push_input(response(32, 33, b"", RIBBON_OUT));

        let err = session.exchange(Command::M33, &[]).unwrap_err();
        match err {
            SessionError::DeviceStatus(status) => assert!(status.is_ribbon_out()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn retry_policy_repeats_round_trip() {
        let (session, line) = session(32);
        let mut session = session.with_retry_policy(|status: &DeviceStatus, _attempt: u32| {
            status.is_ribbon_out()
        });
        line.push_input(response(32, 33, b"", RIBBON_OUT));
        line.push_input(response(33, 33, b"", IDLE));

        let response = session
            .exchange(Command::M33, &[])
            .expect("second attempt should succeed");
        assert_eq!(response.message_id, 33);
        assert_eq!(line.written().len(), 20);
    }

    #[test]
    fn retries_are_bounded() {
        let line = MemoryChannel::new();
        let config = SessionConfig {
            max_attempts: Some(2),
            ..SessionConfig::default()
        };
        let mut session = CommandSession::with_config(line.clone(), line.clone(), config)
            .with_retry_policy(|_: &DeviceStatus, _: u32| true);
        line.push_input(response(32, 33, b"", IDLE));
        line.push_input(response(33, 33, b"", IDLE));
        line.push_input(response(34, 33, b"", IDLE));

        let err = session.exchange(Command::M33, &[]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::RetriesExhausted { attempts: 2, .. }
        ));
        assert_eq!(line.remaining(), response(34, 33, b"", IDLE).len());
    }

    #[test]
    fn cancelled_session_sends_nothing() {
        let (mut session, line) = session(32);
        session.cancel_flag().cancel();

        let err = session.exchange(Command::M33, &[]).unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
        assert!(line.written().is_empty());
    }

    #[test]
    fn echo_mismatch_is_rejected() {
        let (mut session, line) = session(32);
        line.push_input(response(40, 33, b"", IDLE));

        let err = session.exchange(Command::M33, &[]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::ResponseMismatch {
                expected_id: 32,
                found_id: 40,
                ..
            }
        ));
    }

    #[test]
    fn echo_check_can_be_disabled() {
        let line = MemoryChannel::new();
        let config = SessionConfig {
            verify_echo: false,
            ..SessionConfig::default()
        };
        let mut session = CommandSession::with_config(line.clone(), line.clone(), config);
        line.push_input(response(40, 33, b"", IDLE));
        assert!(session.exchange(Command::M33, &[]).is_ok());
    }

    #[test]
    fn nak_surfaces_as_frame_error() {
        let (mut session, line) = session(32);
        line.push_input([0x15]);

        let err = session.exchange(Command::M33, &[]).unwrap_err();
        assert!(matches!(err, SessionError::Frame(FrameError::Rejected)));
    }

    #[test]
    fn silent_device_surfaces_transport_error() {
        let (mut session, _) = session(32);
        let err = session.exchange(Command::M33, &[]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::Transport(TransportError::Exhausted))
        ));
    }

    #[test]
    fn bad_parameters_fail_before_sending() {
        let (mut session, line) = session(32);
        let err = session.exchange(Command::M44LO, &[1.into()]).unwrap_err();
        assert!(matches!(err, SessionError::Format(_)));
        assert!(line.written().is_empty());
    }

    #[test]
    fn decodes_cyrillic_tax_number() {
        let line = MemoryChannel::new();
        let config = SessionConfig {
            starting_message_id: 62,
            format: FormatConfig {
                text_encoding: TextEncoding::Windows1251,
                ..FormatConfig::default()
            },
            ..SessionConfig::default()
        };
        let mut session = CommandSession::with_config(line.clone(), line.clone(), config);
        line.push_input([
            0x01, 0x38, 0x3E, 0x63, 0x31, 0x30, 0x30, 0x30, 0x37, 0x37, 0x35, 0x35, 0x36, 0x2C,
            0xCF, 0xC8, 0xC1, 0x04, 0x80, 0x80, 0x80, 0x85, 0x80, 0xBA, 0x05, 0x30, 0x38, 0x37,
            0x34, 0x03,
        ]);

        let values = session.call(Command::M99, &[]).expect("call should succeed");
        assert_eq!(
            values,
            vec![
                FieldValue::Text("100077556".into()),
                FieldValue::Text("ПИБ".into())
            ]
        );
        assert_eq!(
            line.written(),
            [0x01, 0x24, 0x3E, 0x63, 0x05, 0x30, 0x30, 0x3C, 0x3A, 0x03]
        );
    }

    #[test]
    fn separate_send_and_receive_channels() {
        let tx = MemoryChannel::new();
        let rx = MemoryChannel::with_input(response(32, 33, b"", IDLE));
        let mut session = CommandSession::new(tx.clone(), rx.clone());

        session.exchange(Command::M33, &[]).expect("exchange should succeed");
        assert_eq!(tx.written().len(), 10);
        assert!(rx.written().is_empty());
        assert_eq!(rx.remaining(), 0);
    }
}
