//! Framing for the fiscal printer serial protocol.
//!
//! Every message travels in a frame:
//! - a start marker, a length byte, a message id and a message number
//! - the encoded fields, followed on device responses by a six-byte status block
//! - a payload terminator, a four-digit block check and a frame terminator
//!
//! Frames are read one byte at a time from a [`ByteChannel`], skipping busy
//! signals and failing fast on NAK.
//!
//! [`ByteChannel`]: fiscalwire_transport::ByteChannel

pub mod checksum;
pub mod codec;
pub mod error;
pub mod reader;
pub mod status;
pub mod wire;
pub mod writer;

pub use codec::{
    encode_frame, parse_frame, Direction, Frame, FrameConfig, FrameHeader,
    DEFAULT_MAX_BUSY_SIGNALS,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use status::{ConditionClass, DeviceStatus, StatusCondition};
pub use wire::{MAX_BODY_SIZE, MAX_FRAME_SIZE, MAX_MESSAGE_ID, MIN_MESSAGE_ID};
pub use writer::FrameWriter;
