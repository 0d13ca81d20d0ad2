use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::template::FieldCode;

/// A typed parameter or decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Char(char),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

/// The kind of value an output slot receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Integer,
    Real,
    Text,
    Char,
    DateTime,
    Date,
    Time,
}

impl SlotKind {
    /// Slot a field decodes into when the caller does not choose one.
    pub fn natural(code: FieldCode) -> Self {
        match code {
            FieldCode::Word => SlotKind::Integer,
            FieldCode::Number => SlotKind::Real,
            FieldCode::Text => SlotKind::Text,
            FieldCode::DateTime | FieldCode::DateTimeSeconds => SlotKind::DateTime,
            FieldCode::Date => SlotKind::Date,
            FieldCode::Time => SlotKind::Time,
        }
    }

    /// Whether a `code` field can be decoded into this slot.
    pub fn accepts(self, code: FieldCode) -> bool {
        matches!(
            (code, self),
            (FieldCode::Word, SlotKind::Integer | SlotKind::Real)
                | (FieldCode::Number, SlotKind::Integer | SlotKind::Real)
                | (FieldCode::Text, SlotKind::Text | SlotKind::Char)
                | (
                    FieldCode::DateTime | FieldCode::DateTimeSeconds,
                    SlotKind::DateTime
                )
                | (FieldCode::Date, SlotKind::Date)
                | (FieldCode::Time, SlotKind::Time)
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            SlotKind::Integer => "integer",
            SlotKind::Real => "real",
            SlotKind::Text => "text",
            SlotKind::Char => "char",
            SlotKind::DateTime => "datetime",
            SlotKind::Date => "date",
            SlotKind::Time => "time",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FieldValue {
    pub fn kind(&self) -> SlotKind {
        match self {
            FieldValue::Integer(_) => SlotKind::Integer,
            FieldValue::Real(_) => SlotKind::Real,
            FieldValue::Text(_) => SlotKind::Text,
            FieldValue::Char(_) => SlotKind::Char,
            FieldValue::DateTime(_) => SlotKind::DateTime,
            FieldValue::Date(_) => SlotKind::Date,
            FieldValue::Time(_) => SlotKind::Time,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric value of an `Integer` or `Real`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(value) => Some(*value as f64),
            FieldValue::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            FieldValue::Char(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::DateTime(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            FieldValue::Time(value) => Some(*value),
            _ => None,
        }
    }

    /// Take the text out of a `Text` value.
    pub fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Real(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
            FieldValue::Char(value) => write!(f, "{value}"),
            FieldValue::DateTime(value) => write!(f, "{value}"),
            FieldValue::Date(value) => write!(f, "{value}"),
            FieldValue::Time(value) => write!(f, "{value}"),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    i64 => Integer,
    i32 => Integer,
    u32 => Integer,
    u16 => Integer,
    u8 => Integer,
    f64 => Real,
    f32 => Real,
    String => Text,
    &str => Text,
    char => Char,
    NaiveDateTime => DateTime,
    NaiveDate => Date,
    NaiveTime => Time,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_slots_are_accepted() {
        for code in [
            FieldCode::Word,
            FieldCode::Number,
            FieldCode::Text,
            FieldCode::DateTime,
            FieldCode::DateTimeSeconds,
            FieldCode::Date,
            FieldCode::Time,
        ] {
            assert!(SlotKind::natural(code).accepts(code), "{code}");
        }
    }

    #[test]
    fn cross_kind_slots_are_rejected() {
        assert!(SlotKind::Integer.accepts(FieldCode::Number));
        assert!(SlotKind::Char.accepts(FieldCode::Text));
        assert!(!SlotKind::Text.accepts(FieldCode::Number));
        assert!(!SlotKind::Integer.accepts(FieldCode::Text));
        assert!(!SlotKind::Date.accepts(FieldCode::DateTime));
    }

    #[test]
    fn conversions_pick_the_matching_variant() {
        assert_eq!(FieldValue::from(42u16), FieldValue::Integer(42));
        assert_eq!(FieldValue::from(3.29), FieldValue::Real(3.29));
        assert_eq!(FieldValue::from("X"), FieldValue::Text("X".into()));
        assert_eq!(FieldValue::from('X').kind(), SlotKind::Char);
    }

    #[test]
    fn display_uses_shortest_numeric_form() {
        assert_eq!(FieldValue::Real(3.29).to_string(), "3.29");
        assert_eq!(FieldValue::Real(42.0).to_string(), "42");
        assert_eq!(FieldValue::Integer(-7).to_string(), "-7");
    }

    #[test]
    fn accessors() {
        assert_eq!(FieldValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(FieldValue::Real(3.5).as_i64(), None);
        assert_eq!(FieldValue::Text("ab".into()).as_str(), Some("ab"));
        assert_eq!(FieldValue::Text("ab".into()).into_text().as_deref(), Some("ab"));
    }
}
