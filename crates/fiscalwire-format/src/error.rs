use crate::template::FieldCode;
use crate::value::SlotKind;

/// Errors raised while encoding or decoding payload fields.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// A payload byte did not match a literal in the template.
    #[error(
        "payload byte {position} is 0x{found:02X} [{}], expected 0x{expected:02X} [{}]",
        printable(*found),
        printable(*expected)
    )]
    LiteralMismatch {
        position: usize,
        found: u8,
        expected: u8,
    },

    /// A `B` field (or a `W` field of the wrong width) is not a number.
    #[error("field at byte {position} is not a number: {text:?}")]
    InvalidNumber { position: usize, text: String },

    /// A `W` field contains a byte that is not a hex digit.
    #[error("field at byte {position} has non-hex digit 0x{found:02X}")]
    InvalidHexDigit { position: usize, found: u8 },

    /// A date/time field does not describe a valid moment.
    #[error("field at byte {position} is not a valid {code} value: {text:?}")]
    InvalidDateTime {
        position: usize,
        code: FieldCode,
        text: String,
    },

    /// The payload ends before a field or literal is complete.
    #[error("payload truncated at byte {position} (needed {needed}, {available} left)")]
    Truncated {
        position: usize,
        needed: usize,
        available: usize,
    },

    /// A text field ends in an escape marker with nothing after it.
    #[error("dangling escape marker at byte {position}")]
    DanglingEscape { position: usize },

    /// Fewer parameters than typed fields.
    #[error("missing parameter {index} for `{code}` field")]
    MissingParameter { index: usize, code: FieldCode },

    /// More parameters than typed fields.
    #[error("template takes {expected} parameters, got {found}")]
    UnusedParameters { expected: usize, found: usize },

    /// A parameter cannot be encoded by the field it is bound to.
    #[error("parameter {index} ({found}) cannot be encoded as `{code}`")]
    ParameterType {
        index: usize,
        code: FieldCode,
        found: SlotKind,
    },

    /// A parameter is outside the range its field can carry.
    #[error("parameter {index} is out of range for `{code}`: {value}")]
    ValueOutOfRange {
        index: usize,
        code: FieldCode,
        value: String,
    },

    /// An output slot kind cannot receive the field decoded into it.
    #[error("slot {index} ({slot}) cannot receive a `{code}` field")]
    SlotMismatch {
        index: usize,
        code: FieldCode,
        slot: SlotKind,
    },

    /// Fewer output slots than typed fields.
    #[error("no output slot for field {index}")]
    MissingSlot { index: usize },

    /// More output slots than typed fields.
    #[error("template fills {expected} slots, got {found}")]
    UnusedSlots { expected: usize, found: usize },

    /// A `Char` slot received text that is not exactly one character.
    #[error("field at byte {position} is not a single character: {text:?}")]
    NotSingleChar { position: usize, text: String },

    /// Text contains a character the configured encoding cannot represent.
    #[error("character {ch:?} (U+{:04X}) is not representable in {encoding}", *ch as u32)]
    Unencodable { ch: char, encoding: &'static str },

    /// No command with this name exists in the command table.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

fn printable(byte: u8) -> char {
    if byte.is_ascii_graphic() || byte == b' ' {
        char::from(byte)
    } else {
        '.'
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;
