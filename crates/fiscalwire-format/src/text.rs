//! Byte ↔ text mapping applied to `T` and `B` fields.
//!
//! Fiscal printers use single-byte code pages. [`TextEncoding::Latin1`] maps
//! every byte to the code point of the same value; [`TextEncoding::Windows1251`]
//! covers Cyrillic devices.

use std::fmt;

use crate::error::{FormatError, Result};

/// Converts between text and the device's single-byte encoding.
pub trait TextCodec {
    /// Encode `text`, failing on the first character the encoding lacks.
    fn encode(&self, text: &str) -> Result<Vec<u8>>;

    /// Decode `bytes`. Unmapped bytes become U+FFFD.
    fn decode(&self, bytes: &[u8]) -> String;
}

impl<T: TextCodec + ?Sized> TextCodec for &T {
    fn encode(&self, text: &str) -> Result<Vec<u8>> {
        (**self).encode(text)
    }

    fn decode(&self, bytes: &[u8]) -> String {
        (**self).decode(bytes)
    }
}

/// Built-in single-byte encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// Byte value = code point (U+0000–U+00FF).
    #[default]
    Latin1,
    /// Windows code page 1251 (Cyrillic).
    Windows1251,
}

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Windows1251 => "windows-1251",
        }
    }

    /// Look up an encoding by name (`latin1`, `windows-1251`, `cp1251`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" | "ascii" => Some(TextEncoding::Latin1),
            "windows-1251" | "windows1251" | "cp1251" => Some(TextEncoding::Windows1251),
            _ => None,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TextCodec for TextEncoding {
    fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let byte = match self {
                TextEncoding::Latin1 => u8::try_from(u32::from(ch)).ok(),
                TextEncoding::Windows1251 => unicode_to_cp1251(ch),
            };
            match byte {
                Some(byte) => out.push(byte),
                None => {
                    return Err(FormatError::Unencodable {
                        ch,
                        encoding: self.name(),
                    })
                }
            }
        }
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            TextEncoding::Windows1251 => bytes.iter().map(|&b| cp1251_to_unicode(b)).collect(),
        }
    }
}

/// Windows-1251 0x80–0xBF. 0x98 is unassigned.
const CP1251_HIGH: [char; 64] = [
    // 0x80
    'Ђ', 'Ѓ', '‚', 'ѓ', '„', '…', '†', '‡', '€', '‰', 'Љ', '‹', 'Њ', 'Ќ', 'Ћ', 'Џ',
    // 0x90
    'ђ', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '•', '–', '—', '\u{FFFD}', '™', 'љ',
    '›', 'њ', 'ќ', 'ћ', 'џ',
    // 0xA0
    '\u{00A0}', 'Ў', 'ў', 'Ј', '¤', 'Ґ', '¦', '§', 'Ё', '©', 'Є', '«', '¬', '\u{00AD}', '®', 'Ї',
    // 0xB0
    '°', '±', 'І', 'і', 'ґ', 'µ', '¶', '·', 'ё', '№', 'є', '»', 'ј', 'Ѕ', 'ѕ', 'ї',
];

fn cp1251_to_unicode(byte: u8) -> char {
    match byte {
        0x00..=0x7F => char::from(byte),
        0x80..=0xBF => CP1251_HIGH[usize::from(byte - 0x80)],
        // А..я are contiguous from 0xC0.
        _ => char::from_u32(0x0410 + u32::from(byte - 0xC0)).unwrap_or('\u{FFFD}'),
    }
}

fn unicode_to_cp1251(ch: char) -> Option<u8> {
    let code = u32::from(ch);
    if code < 0x80 {
        return Some(code as u8);
    }
    if (0x0410..=0x044F).contains(&code) {
        return Some((code - 0x0410) as u8 + 0xC0);
    }
    if ch == '\u{FFFD}' {
        return None;
    }
    CP1251_HIGH
        .iter()
        .position(|&c| c == ch)
        .map(|index| 0x80 + index as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_is_identity_on_bytes() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = TextEncoding::Latin1.decode(&bytes);
        assert_eq!(TextEncoding::Latin1.encode(&text).unwrap(), bytes);
    }

    #[test]
    fn latin1_rejects_wide_characters() {
        let err = TextEncoding::Latin1.encode("ПИБ").unwrap_err();
        assert!(matches!(err, FormatError::Unencodable { ch: 'П', .. }));
    }

    #[test]
    fn cp1251_cyrillic_letters() {
        let codec = TextEncoding::Windows1251;
        assert_eq!(codec.decode(&[0xCF, 0xC8, 0xC1]), "ПИБ");
        assert_eq!(codec.decode(&[0xC0, 0xA3, b'0', b'7']), "АЈ07");
        assert_eq!(codec.encode("Ёё№").unwrap(), vec![0xA8, 0xB8, 0xB9]);
        assert_eq!(codec.encode("яЯ").unwrap(), vec![0xFF, 0xDF]);
    }

    #[test]
    fn cp1251_high_half_round_trips() {
        let codec = TextEncoding::Windows1251;
        for byte in 0x80..=0xFFu8 {
            if byte == 0x98 {
                continue;
            }
            let text = codec.decode(&[byte]);
            assert_eq!(codec.encode(&text).unwrap(), vec![byte], "byte 0x{byte:02X}");
        }
    }

    #[test]
    fn cp1251_unassigned_byte() {
        let codec = TextEncoding::Windows1251;
        assert_eq!(codec.decode(&[0x98]), "\u{FFFD}");
        assert!(codec.encode("\u{FFFD}").is_err());
        assert!(codec.encode("ü").is_err());
    }

    #[test]
    fn encoding_names() {
        assert_eq!(TextEncoding::from_name("CP1251"), Some(TextEncoding::Windows1251));
        assert_eq!(TextEncoding::from_name("latin1"), Some(TextEncoding::Latin1));
        assert_eq!(TextEncoding::from_name("utf-8"), None);
        assert_eq!(TextEncoding::Windows1251.to_string(), "windows-1251");
    }
}
