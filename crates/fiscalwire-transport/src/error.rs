use std::time::Duration;

/// Errors that can occur on a byte channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the named port.
    #[error("failed to open {port}: {reason}")]
    Open { port: String, reason: String },

    /// Failed to enumerate serial ports.
    #[error("failed to list serial ports: {0}")]
    Enumerate(String),

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No byte arrived within the configured read timeout.
    #[error("read timed out after {0:?}")]
    TimedOut(Duration),

    /// The channel has no more data and never will (scripted channels).
    #[error("no more data available on channel")]
    Exhausted,

    /// The stream reached end-of-file.
    #[error("channel closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
