//! Single-byte font encodings used when a font has no ToUnicode map.
//!
//! WinAnsi and MacRoman decode through [`encoding_rs`]. `/Differences`
//! entries are resolved from their glyph names where the name says which
//! character it is.

use std::collections::HashMap;

use encoding_rs::{Encoding, MACINTOSH, WINDOWS_1252};

use crate::dictionary::PdfObject;

/// Base encoding of a simple font.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BaseEncoding {
    WinAnsi,
    MacRoman,
    Standard,
    /// Any other name, or none: codes are read as code points.
    #[default]
    Unspecified,
}

impl BaseEncoding {
    pub fn from_name(name: &str) -> Self {
        match name {
            "WinAnsiEncoding" => BaseEncoding::WinAnsi,
            "MacRomanEncoding" => BaseEncoding::MacRoman,
            "StandardEncoding" => BaseEncoding::Standard,
            _ => BaseEncoding::Unspecified,
        }
    }

    fn decode(&self, code: u8) -> Option<char> {
        match self {
            BaseEncoding::WinAnsi => decode_single(WINDOWS_1252, code),
            BaseEncoding::MacRoman => decode_single(MACINTOSH, code),
            BaseEncoding::Standard => match code {
                0x27 => Some('\u{2019}'),
                0x60 => Some('\u{2018}'),
                0x20..=0x7E => Some(char::from(code)),
                _ => None,
            },
            BaseEncoding::Unspecified => None,
        }
    }
}

fn decode_single(encoding: &'static Encoding, code: u8) -> Option<char> {
    let bytes = [code];
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes);
    if had_errors {
        return None;
    }
    text.chars().next()
}

/// Encoding of a simple font: a base table plus `/Differences`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimpleEncoding {
    pub base: BaseEncoding,
    differences: HashMap<u8, char>,
}

impl SimpleEncoding {
    pub fn new(base: BaseEncoding) -> Self {
        Self {
            base,
            differences: HashMap::new(),
        }
    }

    /// Read an `/Encoding` value: a name, or a dictionary with
    /// `/BaseEncoding` and `/Differences`.
    pub fn from_object(value: Option<&PdfObject>) -> Self {
        match value {
            Some(PdfObject::Name(name)) => Self::new(BaseEncoding::from_name(name)),
            Some(PdfObject::Dictionary(dict)) => {
                let mut encoding = Self::new(
                    dict.get_name("BaseEncoding")
                        .map(BaseEncoding::from_name)
                        .unwrap_or_default(),
                );
                if let Some(diffs) = dict.get_array("Differences") {
                    encoding.apply_differences(diffs);
                }
                encoding
            }
            _ => Self::default(),
        }
    }

    /// Apply a `/Differences` array: a code followed by the glyph names of
    /// consecutive codes, repeated.
    pub fn apply_differences(&mut self, diffs: &[PdfObject]) {
        let mut code: Option<u32> = None;
        for item in diffs {
            match item {
                PdfObject::Integer(n) => code = u32::try_from(*n).ok(),
                PdfObject::Name(name) => {
                    if let Some(c) = code {
                        if let (Ok(byte), Some(ch)) = (u8::try_from(c), glyph_name_to_char(name)) {
                            self.differences.insert(byte, ch);
                        }
                        code = Some(c + 1);
                    }
                }
                _ => {}
            }
        }
    }

    /// Character for a one-byte code, if the encoding defines it.
    pub fn decode(&self, code: u8) -> Option<char> {
        self.differences
            .get(&code)
            .copied()
            .or_else(|| self.base.decode(code))
    }
}

/// Common glyph names outside the single-letter and `uniXXXX` forms.
/// Sorted for binary search.
static GLYPH_NAMES: &[(&str, char)] = &[
    ("ampersand", '&'),
    ("asterisk", '*'),
    ("at", '@'),
    ("backslash", '\\'),
    ("braceleft", '{'),
    ("braceright", '}'),
    ("bracketleft", '['),
    ("bracketright", ']'),
    ("bullet", '\u{2022}'),
    ("colon", ':'),
    ("comma", ','),
    ("copyright", '\u{00A9}'),
    ("degree", '\u{00B0}'),
    ("dollar", '$'),
    ("eight", '8'),
    ("ellipsis", '\u{2026}'),
    ("emdash", '\u{2014}'),
    ("endash", '\u{2013}'),
    ("equal", '='),
    ("exclam", '!'),
    ("fi", '\u{FB01}'),
    ("five", '5'),
    ("fl", '\u{FB02}'),
    ("four", '4'),
    ("greater", '>'),
    ("hyphen", '-'),
    ("less", '<'),
    ("nine", '9'),
    ("numbersign", '#'),
    ("one", '1'),
    ("parenleft", '('),
    ("parenright", ')'),
    ("percent", '%'),
    ("period", '.'),
    ("plus", '+'),
    ("question", '?'),
    ("quotedbl", '"'),
    ("quotedblleft", '\u{201C}'),
    ("quotedblright", '\u{201D}'),
    ("quoteleft", '\u{2018}'),
    ("quoteright", '\u{2019}'),
    ("quotesingle", '\''),
    ("registered", '\u{00AE}'),
    ("semicolon", ';'),
    ("seven", '7'),
    ("six", '6'),
    ("slash", '/'),
    ("space", ' '),
    ("three", '3'),
    ("trademark", '\u{2122}'),
    ("two", '2'),
    ("underscore", '_'),
    ("zero", '0'),
];

/// Resolve a glyph name to a character.
///
/// Handles `uniXXXX`, `uXXXX`..`uXXXXXX`, single-character names, and a
/// table of common punctuation and digit names.
pub fn glyph_name_to_char(name: &str) -> Option<char> {
    let name = name.split('.').next().unwrap_or(name);
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() == 4 {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c);
    }
    GLYPH_NAMES
        .binary_search_by_key(&name, |&(n, _)| n)
        .ok()
        .map(|i| GLYPH_NAMES[i].1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::parse_object;

    #[test]
    fn winansi_high_bytes() {
        let enc = SimpleEncoding::new(BaseEncoding::WinAnsi);
        assert_eq!(enc.decode(0x41), Some('A'));
        assert_eq!(enc.decode(0x80), Some('\u{20AC}'));
        assert_eq!(enc.decode(0x93), Some('\u{201C}'));
        assert_eq!(enc.decode(0xE9), Some('\u{00E9}'));
    }

    #[test]
    fn macroman_high_bytes() {
        let enc = SimpleEncoding::new(BaseEncoding::MacRoman);
        assert_eq!(enc.decode(0x8E), Some('\u{00E9}'));
        assert_eq!(enc.decode(0xA5), Some('\u{2022}'));
    }

    #[test]
    fn standard_quotes() {
        let enc = SimpleEncoding::new(BaseEncoding::Standard);
        assert_eq!(enc.decode(0x27), Some('\u{2019}'));
        assert_eq!(enc.decode(0x61), Some('a'));
        assert_eq!(enc.decode(0xE1), None);
    }

    #[test]
    fn unspecified_defines_nothing() {
        assert_eq!(SimpleEncoding::default().decode(0x41), None);
    }

    #[test]
    fn differences_override_base() {
        let obj = parse_object(
            "<< /BaseEncoding /WinAnsiEncoding /Differences [65 /B /C 90 /uni03A9 /bullet] >>",
        )
        .unwrap();
        let enc = SimpleEncoding::from_object(Some(&obj));
        assert_eq!(enc.base, BaseEncoding::WinAnsi);
        assert_eq!(enc.decode(65), Some('B'));
        assert_eq!(enc.decode(66), Some('C'));
        assert_eq!(enc.decode(67), Some('C'));
        assert_eq!(enc.decode(90), Some('\u{03A9}'));
        assert_eq!(enc.decode(91), Some('\u{2022}'));
    }

    #[test]
    fn glyph_names() {
        assert_eq!(glyph_name_to_char("space"), Some(' '));
        assert_eq!(glyph_name_to_char("uni20AC"), Some('\u{20AC}'));
        assert_eq!(glyph_name_to_char("u1D400"), Some('\u{1D400}'));
        assert_eq!(glyph_name_to_char("a.sc"), Some('a'));
        assert_eq!(glyph_name_to_char("g123"), None);
        assert!(GLYPH_NAMES.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
