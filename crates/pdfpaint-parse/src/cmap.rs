//! ToUnicode CMap parser.
//!
//! Reads `begincodespacerange`, `beginbfchar` and `beginbfrange` sections
//! of a `/ToUnicode` stream into a code length and a code → text table.
//! Any structurally broken section rejects the whole CMap, so callers
//! never mistake a half-read table for a complete one.

use std::collections::HashMap;

use crate::error::BackendError;
use crate::tokenizer::{Lexeme, Lexer};

/// Largest `bfrange` span accepted.
const MAX_RANGE_SPAN: u32 = 0xFFFF;

/// A parsed ToUnicode CMap.
#[derive(Debug, Clone, PartialEq)]
pub struct ToUnicodeCMap {
    /// Bytes per character code from the codespace ranges, if declared.
    code_length: Option<usize>,
    mappings: HashMap<u32, String>,
}

impl ToUnicodeCMap {
    /// Parse a CMap from its decoded stream bytes.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Parse`] when a section is unterminated or its
    /// entries do not have the expected shape.
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let mut lexer = Lexer::new(data);
        let mut code_length: Option<usize> = None;
        let mut mappings = HashMap::new();

        while let Some(lexeme) = lexer.next_lexeme()? {
            let Lexeme::Keyword(keyword) = lexeme else {
                continue;
            };
            match keyword.as_str() {
                "begincodespacerange" => {
                    let section = section(&mut lexer, "endcodespacerange")?;
                    let len = parse_codespace(&section)?;
                    code_length = Some(code_length.map_or(len, |cur| cur.max(len)));
                }
                "beginbfchar" => {
                    let section = section(&mut lexer, "endbfchar")?;
                    parse_bfchar(&section, &mut mappings)?;
                }
                "beginbfrange" => {
                    let section = section(&mut lexer, "endbfrange")?;
                    parse_bfrange(&section, &mut mappings)?;
                }
                _ => {}
            }
        }

        Ok(ToUnicodeCMap {
            code_length,
            mappings,
        })
    }

    /// Bytes per code declared by the codespace ranges.
    pub fn code_length(&self) -> Option<usize> {
        self.code_length
    }

    /// Unicode text for a character code.
    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Collect lexemes up to the closing keyword.
fn section(lexer: &mut Lexer<'_>, end: &str) -> Result<Vec<Lexeme>, BackendError> {
    let mut lexemes = Vec::new();
    loop {
        match lexer.next_lexeme()? {
            None => return Err(BackendError::Parse(format!("missing {end}"))),
            Some(Lexeme::Keyword(kw)) if kw == end => return Ok(lexemes),
            Some(other) => lexemes.push(other),
        }
    }
}

fn hex_bytes(lexeme: &Lexeme) -> Option<&[u8]> {
    match lexeme {
        Lexeme::HexString(b) => Some(b),
        _ => None,
    }
}

/// Big-endian code value of 1 to 4 bytes.
fn code_value(bytes: &[u8]) -> Result<u32, BackendError> {
    if bytes.is_empty() || bytes.len() > 4 {
        return Err(BackendError::Parse(format!(
            "character code of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}

/// UTF-16BE destination text. A lone byte is read as a code unit.
fn utf16be_text(bytes: &[u8]) -> Result<String, BackendError> {
    let units: Vec<u16> = match bytes.len() {
        0 => return Err(BackendError::Parse("empty destination".to_string())),
        1 => vec![u16::from(bytes[0])],
        n if n % 2 != 0 => {
            return Err(BackendError::Parse(format!(
                "destination of odd length {n}"
            )));
        }
        _ => bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect(),
    };
    Ok(String::from_utf16_lossy(&units))
}

fn parse_codespace(lexemes: &[Lexeme]) -> Result<usize, BackendError> {
    if lexemes.is_empty() || lexemes.len() % 2 != 0 {
        return Err(BackendError::Parse("malformed codespace range".to_string()));
    }
    let mut len = 0;
    for pair in lexemes.chunks_exact(2) {
        let (Some(lo), Some(hi)) = (hex_bytes(&pair[0]), hex_bytes(&pair[1])) else {
            return Err(BackendError::Parse("codespace bound is not a hex string".to_string()));
        };
        if lo.is_empty() || lo.len() > 4 || lo.len() != hi.len() {
            return Err(BackendError::Parse("codespace bounds differ in length".to_string()));
        }
        len = len.max(lo.len());
    }
    Ok(len)
}

fn parse_bfchar(lexemes: &[Lexeme], mappings: &mut HashMap<u32, String>) -> Result<(), BackendError> {
    if lexemes.len() % 2 != 0 {
        return Err(BackendError::Parse("bfchar entry without destination".to_string()));
    }
    for pair in lexemes.chunks_exact(2) {
        let src = hex_bytes(&pair[0])
            .ok_or_else(|| BackendError::Parse("bfchar source is not a hex string".to_string()))?;
        let code = code_value(src)?;
        match &pair[1] {
            Lexeme::HexString(dst) | Lexeme::LiteralString(dst) => {
                mappings.insert(code, utf16be_text(dst)?);
            }
            // glyph-name destinations carry no Unicode value
            Lexeme::Name(_) => {}
            _ => {
                return Err(BackendError::Parse(
                    "bfchar destination is not a string".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn parse_bfrange(
    lexemes: &[Lexeme],
    mappings: &mut HashMap<u32, String>,
) -> Result<(), BackendError> {
    let malformed = |what: &str| BackendError::Parse(format!("malformed bfrange: {what}"));
    let mut i = 0;
    while i < lexemes.len() {
        let (Some(lo), Some(hi)) = (
            lexemes.get(i).and_then(hex_bytes),
            lexemes.get(i + 1).and_then(hex_bytes),
        ) else {
            return Err(malformed("bounds are not hex strings"));
        };
        let (lo, hi) = (code_value(lo)?, code_value(hi)?);
        if lo > hi || hi - lo > MAX_RANGE_SPAN {
            return Err(malformed("invalid code span"));
        }
        i += 2;
        match lexemes.get(i) {
            Some(Lexeme::HexString(dst)) => {
                let base = utf16be_text(dst)?;
                for offset in 0..=(hi - lo) {
                    mappings.insert(lo + offset, offset_text(&base, offset));
                }
                i += 1;
            }
            Some(Lexeme::ArrayStart) => {
                i += 1;
                let mut code = lo;
                loop {
                    match lexemes.get(i) {
                        Some(Lexeme::ArrayEnd) => break,
                        Some(Lexeme::HexString(dst)) => {
                            if code <= hi {
                                mappings.insert(code, utf16be_text(dst)?);
                            }
                            code = code.saturating_add(1);
                        }
                        _ => return Err(malformed("unterminated destination array")),
                    }
                    i += 1;
                }
                i += 1;
            }
            _ => return Err(malformed("missing destination")),
        }
    }
    Ok(())
}

/// Destination text for `lo + offset`: the last character is advanced by
/// `offset` code points.
fn offset_text(base: &str, offset: u32) -> String {
    if offset == 0 {
        return base.to_string();
    }
    let mut chars: Vec<char> = base.chars().collect();
    if let Some(last) = chars.last_mut() {
        *last = char::from_u32(u32::from(*last) + offset).unwrap_or('\u{FFFD}');
    }
    chars.into_iter().collect()
}
