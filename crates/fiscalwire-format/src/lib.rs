//! Payload fields for the fiscal printer protocol.
//!
//! Each command has two format templates, one for the request and one for
//! the response. A template is a string of literal punctuation and typed
//! field codes:
//!
//! | code | field |
//! |------|-------|
//! | `W`  | four uppercase hex digits |
//! | `B`  | a number as text |
//! | `T`  | text, bytes below 0x20 escaped |
//! | `Q`  | `DD-MM-YY HH-MM` |
//! | `q`  | `DD-MM-YY HH-MM-SS` |
//!
//! [`encode_fields`] turns typed parameters into payload bytes;
//! [`decode_fields`] recovers them from a response payload.

pub mod codec;
pub mod config;
pub mod error;
pub mod registry;
pub mod template;
pub mod text;
pub mod value;

pub use codec::{decode_fields, decode_natural, encode_fields, ESCAPE};
pub use config::FormatConfig;
pub use error::{FormatError, Result};
pub use registry::{Command, CommandDescriptor};
pub use template::{FieldCode, FormatTemplate, LegacyCodes, Token};
pub use text::{TextCodec, TextEncoding};
pub use value::{FieldValue, SlotKind};
