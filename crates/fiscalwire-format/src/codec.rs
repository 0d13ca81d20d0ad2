//! Encoding typed parameters into payload bytes, and back.
//!
//! Fields carry no length prefix. On decode, a field's extent is:
//! - the rest of the payload if it is the last token;
//! - its fixed width if the next token is another typed field;
//! - everything up to the next literal byte otherwise (escape-aware).

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::trace;

use crate::error::{FormatError, Result};
use crate::template::{FieldCode, FormatTemplate, Token};
use crate::text::TextCodec;
use crate::value::{FieldValue, SlotKind};

/// Prefix for text bytes below 0x20; the following byte is the value + 64.
pub const ESCAPE: u8 = 0x10;

const ESCAPE_OFFSET: u8 = 64;

/// Encode `params` against `template`, appending to `dst`.
///
/// One parameter is consumed per typed field; the counts must match exactly.
pub fn encode_fields<C: TextCodec + ?Sized>(
    template: &FormatTemplate,
    params: &[FieldValue],
    codec: &C,
    dst: &mut Vec<u8>,
) -> Result<()> {
    let mut index = 0;
    for token in template.tokens() {
        let code = match token {
            Token::Literal(byte) => {
                dst.push(*byte);
                continue;
            }
            Token::Field(code) => *code,
        };
        let value = params
            .get(index)
            .ok_or(FormatError::MissingParameter { index, code })?;
        encode_field(code, index, value, codec, dst)?;
        index += 1;
    }

    if index != params.len() {
        return Err(FormatError::UnusedParameters {
            expected: index,
            found: params.len(),
        });
    }
    Ok(())
}

fn encode_field<C: TextCodec + ?Sized>(
    code: FieldCode,
    index: usize,
    value: &FieldValue,
    codec: &C,
    dst: &mut Vec<u8>,
) -> Result<()> {
    let wrong_type = || FormatError::ParameterType {
        index,
        code,
        found: value.kind(),
    };
    let out_of_range = || FormatError::ValueOutOfRange {
        index,
        code,
        value: value.to_string(),
    };

    match code {
        FieldCode::Word => {
            let word = match value {
                FieldValue::Integer(v) => *v,
                FieldValue::Real(v) if v.is_finite() => v.round() as i64,
                FieldValue::Real(_) => return Err(out_of_range()),
                _ => return Err(wrong_type()),
            };
            let word = u16::try_from(word).map_err(|_| out_of_range())?;
            dst.extend_from_slice(format!("{word:04X}").as_bytes());
        }
        FieldCode::Number => {
            let text = match value {
                FieldValue::Integer(v) => v.to_string(),
                FieldValue::Real(v) if v.is_finite() => v.to_string(),
                FieldValue::Real(_) => return Err(out_of_range()),
                FieldValue::Text(text) if parse_number(text).is_some() => text.clone(),
                _ => return Err(wrong_type()),
            };
            dst.extend_from_slice(&codec.encode(&text)?);
        }
        FieldCode::Text => {
            for byte in codec.encode(&value.to_string())? {
                if byte < 0x20 {
                    dst.push(ESCAPE);
                    dst.push(byte + ESCAPE_OFFSET);
                } else {
                    dst.push(byte);
                }
            }
        }
        FieldCode::DateTime | FieldCode::DateTimeSeconds => {
            let dt = value.as_datetime().ok_or_else(wrong_type)?;
            let mut text = format!(
                "{:02}-{:02}-{:02} {:02}-{:02}",
                dt.day(),
                dt.month(),
                dt.year().rem_euclid(100),
                dt.hour(),
                dt.minute()
            );
            if code == FieldCode::DateTimeSeconds {
                text.push_str(&format!("-{:02}", dt.second()));
            }
            dst.extend_from_slice(text.as_bytes());
        }
        FieldCode::Date => {
            let date = value.as_date().ok_or_else(wrong_type)?;
            let text = format!(
                "{:02}0{:02}{:02}",
                date.day(),
                date.month(),
                date.year().rem_euclid(100)
            );
            dst.extend_from_slice(text.as_bytes());
        }
        FieldCode::Time => {
            let time = value.as_time().ok_or_else(wrong_type)?;
            dst.extend_from_slice(format!("{:02}{:02}", time.hour(), time.minute()).as_bytes());
        }
    }
    Ok(())
}

/// Decode `payload` against `template`, filling one value per slot.
///
/// Bytes left over after the last token are ignored.
pub fn decode_fields<C: TextCodec + ?Sized>(
    template: &FormatTemplate,
    payload: &[u8],
    slots: &[SlotKind],
    codec: &C,
) -> Result<Vec<FieldValue>> {
    let expected = template.field_count();
    if slots.len() > expected {
        return Err(FormatError::UnusedSlots {
            expected,
            found: slots.len(),
        });
    }

    let tokens = template.tokens();
    let mut values = Vec::with_capacity(expected);
    let mut position = 0;

    for (i, token) in tokens.iter().enumerate() {
        let code = match token {
            Token::Literal(literal) => {
                let found = *payload.get(position).ok_or(FormatError::Truncated {
                    position,
                    needed: 1,
                    available: 0,
                })?;
                if found != *literal {
                    return Err(FormatError::LiteralMismatch {
                        position,
                        found,
                        expected: *literal,
                    });
                }
                position += 1;
                continue;
            }
            Token::Field(code) => *code,
        };

        let index = values.len();
        let slot = *slots.get(index).ok_or(FormatError::MissingSlot { index })?;
        if !slot.accepts(code) {
            return Err(FormatError::SlotMismatch { index, code, slot });
        }

        let rest = &payload[position..];
        let width = match tokens.get(i + 1) {
            None => rest.len(),
            Some(Token::Field(_)) => {
                let width = code.adjacent_width();
                if rest.len() < width {
                    return Err(FormatError::Truncated {
                        position,
                        needed: width,
                        available: rest.len(),
                    });
                }
                width
            }
            Some(Token::Literal(terminator)) => scan_to(rest, *terminator),
        };

        let field = &rest[..width];
        trace!(%code, position, width, "decode field");
        values.push(decode_field(code, slot, field, position, codec)?);
        position += width;
    }

    Ok(values)
}

/// Decode with each field's natural slot kind.
pub fn decode_natural<C: TextCodec + ?Sized>(
    template: &FormatTemplate,
    payload: &[u8],
    codec: &C,
) -> Result<Vec<FieldValue>> {
    let slots: Vec<SlotKind> = template.fields().map(SlotKind::natural).collect();
    decode_fields(template, payload, &slots, codec)
}

/// Length of the prefix of `bytes` before the first unescaped `terminator`.
fn scan_to(bytes: &[u8], terminator: u8) -> usize {
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            ESCAPE => i += 2,
            byte if byte == terminator => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn decode_field<C: TextCodec + ?Sized>(
    code: FieldCode,
    slot: SlotKind,
    field: &[u8],
    position: usize,
    codec: &C,
) -> Result<FieldValue> {
    match code {
        FieldCode::Word => {
            let word = parse_word(field, position)?;
            Ok(match slot {
                SlotKind::Real => FieldValue::Real(f64::from(word)),
                _ => FieldValue::Integer(i64::from(word)),
            })
        }
        FieldCode::Number => {
            let text = codec.decode(&unescape(field, position)?);
            let number = parse_number(&text).ok_or(FormatError::InvalidNumber { position, text })?;
            Ok(match slot {
                SlotKind::Integer => FieldValue::Integer(number.round() as i64),
                _ => FieldValue::Real(number),
            })
        }
        FieldCode::Text => {
            let text = codec.decode(&unescape(field, position)?);
            if slot == SlotKind::Char {
                let mut chars = text.chars();
                return match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(FieldValue::Char(ch)),
                    _ => Err(FormatError::NotSingleChar { position, text }),
                };
            }
            Ok(FieldValue::Text(text))
        }
        FieldCode::DateTime | FieldCode::DateTimeSeconds => {
            parse_datetime(code, field, position).map(FieldValue::DateTime)
        }
        FieldCode::Date => {
            let invalid = || invalid_datetime(code, field, position);
            if field.len() != 7 || field[2] != b'0' {
                return Err(invalid());
            }
            let day = two_digits(&field[0..2]).ok_or_else(invalid)?;
            let month = two_digits(&field[3..5]).ok_or_else(invalid)?;
            let year = two_digits(&field[5..7]).ok_or_else(invalid)?;
            NaiveDate::from_ymd_opt(2000 + year as i32, month, day)
                .map(FieldValue::Date)
                .ok_or_else(invalid)
        }
        FieldCode::Time => {
            let invalid = || invalid_datetime(code, field, position);
            if field.len() != 4 {
                return Err(invalid());
            }
            let hour = two_digits(&field[0..2]).ok_or_else(invalid)?;
            let minute = two_digits(&field[2..4]).ok_or_else(invalid)?;
            NaiveTime::from_hms_opt(hour, minute, 0)
                .map(FieldValue::Time)
                .ok_or_else(invalid)
        }
    }
}

fn parse_word(field: &[u8], position: usize) -> Result<u16> {
    if field.len() < 4 {
        return Err(FormatError::Truncated {
            position,
            needed: 4,
            available: field.len(),
        });
    }
    if field.len() > 4 {
        return Err(FormatError::InvalidNumber {
            position,
            text: String::from_utf8_lossy(field).into_owned(),
        });
    }
    field.iter().enumerate().try_fold(0u16, |word, (offset, &byte)| {
        let digit = char::from(byte)
            .to_digit(16)
            .ok_or(FormatError::InvalidHexDigit {
                position: position + offset,
                found: byte,
            })?;
        Ok((word << 4) | digit as u16)
    })
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Reverse text escaping: `ESCAPE x` becomes `x - 64`.
fn unescape(field: &[u8], position: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(field.len());
    let mut bytes = field.iter().enumerate();
    while let Some((offset, &byte)) = bytes.next() {
        if byte == ESCAPE {
            let (_, &next) = bytes.next().ok_or(FormatError::DanglingEscape {
                position: position + offset,
            })?;
            out.push(next.wrapping_sub(ESCAPE_OFFSET));
        } else {
            out.push(byte);
        }
    }
    Ok(out)
}

fn two_digits(bytes: &[u8]) -> Option<u32> {
    match bytes {
        [tens @ b'0'..=b'9', units @ b'0'..=b'9'] => {
            Some(u32::from(tens - b'0') * 10 + u32::from(units - b'0'))
        }
        _ => None,
    }
}

fn invalid_datetime(code: FieldCode, field: &[u8], position: usize) -> FormatError {
    FormatError::InvalidDateTime {
        position,
        code,
        text: String::from_utf8_lossy(field).into_owned(),
    }
}

/// `DD-MM-YY HH-MM[-SS]`, year 2000 + YY.
fn parse_datetime(code: FieldCode, field: &[u8], position: usize) -> Result<NaiveDateTime> {
    let invalid = || invalid_datetime(code, field, position);
    let with_seconds = code == FieldCode::DateTimeSeconds;
    let expected_len = if with_seconds { 17 } else { 14 };
    if field.len() != expected_len {
        return Err(invalid());
    }

    let separators = [(2, b'-'), (5, b'-'), (8, b' '), (11, b'-')];
    if separators.iter().any(|&(i, sep)| field[i] != sep) || (with_seconds && field[14] != b'-')
    {
        return Err(invalid());
    }

    let day = two_digits(&field[0..2]).ok_or_else(invalid)?;
    let month = two_digits(&field[3..5]).ok_or_else(invalid)?;
    let year = two_digits(&field[6..8]).ok_or_else(invalid)?;
    let hour = two_digits(&field[9..11]).ok_or_else(invalid)?;
    let minute = two_digits(&field[12..14]).ok_or_else(invalid)?;
    let second = if with_seconds {
        two_digits(&field[15..17]).ok_or_else(invalid)?
    } else {
        0
    };

    NaiveDate::from_ymd_opt(2000 + year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::LegacyCodes;
    use crate::text::TextEncoding;

    fn template(source: &str) -> FormatTemplate {
        FormatTemplate::parse(source, LegacyCodes::Literal)
    }

    fn encode(source: &str, params: &[FieldValue]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        encode_fields(&template(source), params, &TextEncoding::Latin1, &mut out)?;
        Ok(out)
    }

    fn decode(source: &str, payload: &[u8]) -> Result<Vec<FieldValue>> {
        decode_natural(&template(source), payload, &TextEncoding::Latin1)
    }

    fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .unwrap()
    }

    #[test]
    fn encodes_number_pair() {
        let out = encode("B,B", &[3.29.into(), 42.into()]).unwrap();
        assert_eq!(out, b"3.29,42");
    }

    #[test]
    fn number_pair_round_trip() {
        let payload = encode("B,B", &[3.29.into(), 42.into()]).unwrap();
        let slots = [SlotKind::Real, SlotKind::Integer];
        let values =
            decode_fields(&template("B,B"), &payload, &slots, &TextEncoding::Latin1).unwrap();
        assert_eq!(values, vec![FieldValue::Real(3.29), FieldValue::Integer(42)]);
    }

    #[test]
    fn encodes_words_as_uppercase_hex() {
        assert_eq!(encode("W", &[0x1AB.into()]).unwrap(), b"01AB");
        assert_eq!(encode("W,W", &[0.into(), 0xFFFF.into()]).unwrap(), b"0000,FFFF");
    }

    #[test]
    fn word_out_of_range() {
        assert!(matches!(
            encode("W", &[0x10000.into()]).unwrap_err(),
            FormatError::ValueOutOfRange { index: 0, .. }
        ));
        assert!(matches!(
            encode("W", &[(-1).into()]).unwrap_err(),
            FormatError::ValueOutOfRange { .. }
        ));
    }

    #[test]
    fn escapes_control_bytes_in_text() {
        let out = encode("T", &["a\u{1}b\tc".into()]).unwrap();
        assert_eq!(out, [b'a', 0x10, 0x41, b'b', 0x10, 0x49, b'c']);

        let values = decode("T", &out).unwrap();
        assert_eq!(values, vec![FieldValue::Text("a\u{1}b\tc".into())]);
    }

    #[test]
    fn escaped_terminator_does_not_end_field() {
        // An escaped 0x0C ("L") inside text must not be taken for a literal `L`.
        let template = template("TLT");
        let mut payload = Vec::new();
        encode_fields(
            &template,
            &["x\u{c}y".into(), "z".into()],
            &TextEncoding::Latin1,
            &mut payload,
        )
        .unwrap();
        assert_eq!(payload, [b'x', 0x10, b'L', b'y', b'L', b'z']);

        let values = decode_natural(&template, &payload, &TextEncoding::Latin1).unwrap();
        assert_eq!(
            values,
            vec![FieldValue::Text("x\u{c}y".into()), FieldValue::Text("z".into())]
        );
    }

    #[test]
    fn dangling_escape_is_rejected() {
        assert!(matches!(
            decode("T", &[b'a', 0x10]).unwrap_err(),
            FormatError::DanglingEscape { position: 1 }
        ));
    }

    #[test]
    fn number_text_must_parse() {
        assert_eq!(encode("B", &["12.50".into()]).unwrap(), b"12.50");
        assert!(matches!(
            encode("B", &["twelve".into()]).unwrap_err(),
            FormatError::ParameterType { index: 0, .. }
        ));
        assert!(matches!(
            decode("B", b"1x").unwrap_err(),
            FormatError::InvalidNumber { position: 0, .. }
        ));
    }

    #[test]
    fn parameter_count_must_match() {
        assert!(matches!(
            encode("B,B", &[1.into()]).unwrap_err(),
            FormatError::MissingParameter { index: 1, .. }
        ));
        assert!(matches!(
            encode("B", &[1.into(), 2.into()]).unwrap_err(),
            FormatError::UnusedParameters {
                expected: 1,
                found: 2
            }
        ));
        assert!(encode("", &[]).unwrap().is_empty());
    }

    #[test]
    fn date_time_fields() {
        let dt = datetime(2013, 2, 20, 9, 5, 7);
        assert_eq!(encode("Q", &[dt.into()]).unwrap(), b"20-02-13 09-05");
        assert_eq!(encode("q", &[dt.into()]).unwrap(), b"20-02-13 09-05-07");

        let values = decode("q", b"20-02-13 09-05-07").unwrap();
        assert_eq!(values, vec![FieldValue::DateTime(dt)]);
        let values = decode("Q", b"20-02-13 09-05").unwrap();
        assert_eq!(values, vec![FieldValue::DateTime(datetime(2013, 2, 20, 9, 5, 0))]);
    }

    #[test]
    fn date_time_requires_datetime_parameter() {
        assert!(matches!(
            encode("Q", &["now".into()]).unwrap_err(),
            FormatError::ParameterType { .. }
        ));
        assert!(matches!(
            decode("Q", b"31-02-13 09-05").unwrap_err(),
            FormatError::InvalidDateTime { .. }
        ));
    }

    #[test]
    fn device_clock_template() {
        let values = decode("B-B-B B:B:B", b"20-02-13 09:05:07").unwrap();
        let numbers: Vec<f64> = values.iter().filter_map(FieldValue::as_f64).collect();
        assert_eq!(numbers, vec![20.0, 2.0, 13.0, 9.0, 5.0, 7.0]);
    }

    #[test]
    fn adjacent_typed_fields_use_fixed_widths() {
        let values = decode("TTTTTT", &[0x80, 0x80, 0x80, 0x85, 0x80, 0xBA]).unwrap();
        assert_eq!(values.len(), 6);
        assert_eq!(values[3], FieldValue::Text("\u{85}".into()));

        let values = decode("WT", b"00FFrest").unwrap();
        assert_eq!(
            values,
            vec![FieldValue::Integer(255), FieldValue::Text("rest".into())]
        );

        let values = decode("TB", b"F12.5").unwrap();
        assert_eq!(
            values,
            vec![FieldValue::Text("F".into()), FieldValue::Real(12.5)]
        );
    }

    #[test]
    fn adjacent_field_past_payload_end() {
        assert!(matches!(
            decode("WT", b"00F").unwrap_err(),
            FormatError::Truncated {
                position: 0,
                needed: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn literal_mismatch_reports_both_bytes() {
        let err = decode("T;T", b"ab,cd").unwrap_err();
        // The scan finds no ';', so the first field takes everything and the
        // literal check runs off the end.
        assert!(matches!(err, FormatError::Truncated { position: 5, .. }));

        let err = decode("ST", b"Px").unwrap_err();
        match err {
            FormatError::LiteralMismatch {
                position,
                found,
                expected,
            } => {
                assert_eq!(position, 0);
                assert_eq!(found, b'P');
                assert_eq!(expected, b'S');
            }
            other => panic!("unexpected error: {other}"),
        }
        let message = decode("ST", b"Px").unwrap_err().to_string();
        assert!(message.contains("[P]") && message.contains("[S]"));
    }

    #[test]
    fn invalid_hex_digit() {
        assert!(matches!(
            decode("W,T", b"00G1,x").unwrap_err(),
            FormatError::InvalidHexDigit {
                position: 2,
                found: b'G'
            }
        ));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let values = decode("W,W", b"0001,0002").unwrap();
        assert_eq!(values, vec![FieldValue::Integer(1), FieldValue::Integer(2)]);
        let values = decode("", b"anything").unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn char_slot_needs_exactly_one_character() {
        let tpl = template("T,T");
        let slots = [SlotKind::Char, SlotKind::Text];
        let values = decode_fields(&tpl, b"F,rest", &slots, &TextEncoding::Latin1).unwrap();
        assert_eq!(values[0], FieldValue::Char('F'));

        let err = decode_fields(&tpl, b"FX,rest", &slots, &TextEncoding::Latin1).unwrap_err();
        assert!(matches!(err, FormatError::NotSingleChar { position: 0, .. }));
    }

    #[test]
    fn slot_kinds_are_checked() {
        let tpl = template("T");
        let err = decode_fields(&tpl, b"x", &[SlotKind::Real], &TextEncoding::Latin1).unwrap_err();
        assert!(matches!(err, FormatError::SlotMismatch { index: 0, .. }));

        let err = decode_fields(&tpl, b"x", &[], &TextEncoding::Latin1).unwrap_err();
        assert!(matches!(err, FormatError::MissingSlot { index: 0 }));

        let slots = [SlotKind::Text, SlotKind::Text];
        let err = decode_fields(&tpl, b"x", &slots, &TextEncoding::Latin1).unwrap_err();
        assert!(matches!(err, FormatError::UnusedSlots { .. }));
    }

    #[test]
    fn windows_1251_text_fields() {
        let tpl = template("T,T");
        let payload = b"100077556,\xCF\xC8\xC1";
        let values = decode_natural(&tpl, payload, &TextEncoding::Windows1251).unwrap();
        assert_eq!(
            values,
            vec![
                FieldValue::Text("100077556".into()),
                FieldValue::Text("ПИБ".into())
            ]
        );

        let mut out = Vec::new();
        encode_fields(
            &tpl,
            &["100077556".into(), "ПИБ".into()],
            &TextEncoding::Windows1251,
            &mut out,
        )
        .unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn legacy_date_and_time_codes() {
        let tpl = FormatTemplate::parse("Y,Z", LegacyCodes::Typed);
        let date = NaiveDate::from_ymd_opt(2013, 2, 20).unwrap();
        let time = NaiveTime::from_hms_opt(9, 5, 0).unwrap();

        let mut out = Vec::new();
        encode_fields(&tpl, &[date.into(), time.into()], &TextEncoding::Latin1, &mut out).unwrap();
        assert_eq!(out, b"2000213,0905");

        let values = decode_natural(&tpl, &out, &TextEncoding::Latin1).unwrap();
        assert_eq!(values, vec![FieldValue::Date(date), FieldValue::Time(time)]);
    }
}
