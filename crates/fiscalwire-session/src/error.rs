use fiscalwire_format::{Command, FormatError};
use fiscalwire_frame::{DeviceStatus, FrameError};
use fiscalwire_transport::TransportError;

/// Errors from a command round trip.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// The device reported an error condition; the full status is attached.
    #[error("device reported an error: {0}")]
    DeviceStatus(DeviceStatus),

    /// The retry policy kept asking for another attempt past the bound.
    #[error("giving up after {attempts} attempts (status: {status})")]
    RetriesExhausted { attempts: u32, status: DeviceStatus },

    /// The response does not echo the request's message id and number.
    #[error(
        "response id {found_id}/number {found_number} does not match request \
         id {expected_id}/number {expected_number}"
    )]
    ResponseMismatch {
        expected_id: u8,
        expected_number: u8,
        found_id: u8,
        found_number: u8,
    },

    /// The response frame carried no status block.
    #[error("response carried no status block")]
    MissingStatus,

    /// A response decoded cleanly but its values make no sense for the command.
    #[error("unexpected {command} response: {reason}")]
    InvalidResponse { command: Command, reason: String },

    /// The call was cancelled between attempts.
    #[error("cancelled")]
    Cancelled,
}

impl SessionError {
    /// Device status attached to this error, if any.
    pub fn device_status(&self) -> Option<&DeviceStatus> {
        match self {
            SessionError::DeviceStatus(status)
            | SessionError::RetriesExhausted { status, .. } => Some(status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
