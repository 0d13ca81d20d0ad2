use std::fmt;

/// How the two legacy single-purpose codes `Y` (date) and `Z` (time) are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegacyCodes {
    /// `Y` and `Z` are ordinary literal characters.
    #[default]
    Literal,
    /// `Y` is a `DD0MMYY` date field and `Z` an `HHMM` time field.
    Typed,
}

/// A typed field code within a format template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCode {
    /// `W`: four uppercase hex digits.
    Word,
    /// `B`: a number in its textual form.
    Number,
    /// `T`: free text, control bytes escaped.
    Text,
    /// `Q`: `DD-MM-YY HH-MM`.
    DateTime,
    /// `q`: `DD-MM-YY HH-MM-SS`.
    DateTimeSeconds,
    /// `Y`: `DD0MMYY` (legacy).
    Date,
    /// `Z`: `HHMM` (legacy).
    Time,
}

impl FieldCode {
    pub fn from_byte(byte: u8, legacy: LegacyCodes) -> Option<Self> {
        match byte {
            b'W' => Some(FieldCode::Word),
            b'B' => Some(FieldCode::Number),
            b'T' => Some(FieldCode::Text),
            b'Q' => Some(FieldCode::DateTime),
            b'q' => Some(FieldCode::DateTimeSeconds),
            b'Y' if legacy == LegacyCodes::Typed => Some(FieldCode::Date),
            b'Z' if legacy == LegacyCodes::Typed => Some(FieldCode::Time),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            FieldCode::Word => b'W',
            FieldCode::Number => b'B',
            FieldCode::Text => b'T',
            FieldCode::DateTime => b'Q',
            FieldCode::DateTimeSeconds => b'q',
            FieldCode::Date => b'Y',
            FieldCode::Time => b'Z',
        }
    }

    /// Width assumed when this field is directly followed by another typed field.
    ///
    /// Variable-width `T` and `B` fields take a single byte in that position.
    pub fn adjacent_width(self) -> usize {
        match self {
            FieldCode::Word => 4,
            FieldCode::DateTime => 14,
            FieldCode::DateTimeSeconds => 17,
            FieldCode::Date => 7,
            FieldCode::Time => 4,
            FieldCode::Number | FieldCode::Text => 1,
        }
    }
}

impl fmt::Display for FieldCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.as_byte()))
    }
}

/// One element of a format template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Fixed punctuation, emitted as-is and matched exactly on decode.
    Literal(u8),
    Field(FieldCode),
}

/// An ordered field layout for one direction of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTemplate {
    source: String,
    tokens: Vec<Token>,
}

impl FormatTemplate {
    /// Split a template string into literal and typed tokens.
    pub fn parse(source: &str, legacy: LegacyCodes) -> Self {
        let tokens = source
            .bytes()
            .map(|byte| match FieldCode::from_byte(byte, legacy) {
                Some(code) => Token::Field(code),
                None => Token::Literal(byte),
            })
            .collect();
        Self {
            source: source.to_owned(),
            tokens,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Typed fields, in order.
    pub fn fields(&self) -> impl Iterator<Item = FieldCode> + '_ {
        self.tokens.iter().filter_map(|token| match token {
            Token::Field(code) => Some(*code),
            Token::Literal(_) => None,
        })
    }

    /// Number of parameters this template consumes (or slots it fills).
    pub fn field_count(&self) -> usize {
        self.fields().count()
    }
}

impl fmt::Display for FormatTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_template() {
        let template = FormatTemplate::parse("T;T,B", LegacyCodes::Literal);
        assert_eq!(
            template.tokens(),
            &[
                Token::Field(FieldCode::Text),
                Token::Literal(b';'),
                Token::Field(FieldCode::Text),
                Token::Literal(b','),
                Token::Field(FieldCode::Number),
            ]
        );
        assert_eq!(template.field_count(), 3);
        assert_eq!(template.to_string(), "T;T,B");
    }

    #[test]
    fn command_letters_stay_literal() {
        let template = FormatTemplate::parse("STT*T", LegacyCodes::Literal);
        assert_eq!(template.tokens()[0], Token::Literal(b'S'));
        assert_eq!(template.field_count(), 3);
    }

    #[test]
    fn legacy_codes_follow_configuration() {
        let literal = FormatTemplate::parse("Y,Z", LegacyCodes::Literal);
        assert_eq!(literal.field_count(), 0);

        let typed = FormatTemplate::parse("Y,Z", LegacyCodes::Typed);
        assert_eq!(
            typed.fields().collect::<Vec<_>>(),
            vec![FieldCode::Date, FieldCode::Time]
        );
    }

    #[test]
    fn empty_template() {
        let template = FormatTemplate::parse("", LegacyCodes::Literal);
        assert!(template.is_empty());
        assert_eq!(template.field_count(), 0);
    }

    #[test]
    fn date_time_codes_are_case_sensitive() {
        let template = FormatTemplate::parse("Qq", LegacyCodes::Literal);
        assert_eq!(
            template.fields().collect::<Vec<_>>(),
            vec![FieldCode::DateTime, FieldCode::DateTimeSeconds]
        );
        assert_eq!(FieldCode::DateTime.adjacent_width(), 14);
        assert_eq!(FieldCode::DateTimeSeconds.adjacent_width(), 17);
    }
}
