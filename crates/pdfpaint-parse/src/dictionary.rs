//! Typed reading of PDF object text.
//!
//! A small recursive-descent reader over the tokenizer's lexemes. It is
//! permissive the way viewers are: junk before the first object is skipped,
//! an unterminated container yields what was read, and a stray closer ends
//! the container it appears in. Lookups return `Option` so callers treat a
//! missing or mistyped key as absent.

use crate::store::ObjRef;
use crate::tokenizer::{Lexeme, Lexer};

/// A parsed PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(String),
    String(Vec<u8>),
    Array(Vec<PdfObject>),
    Dictionary(Dictionary),
    Reference(ObjRef),
}

impl PdfObject {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PdfObject::Integer(i) => Some(*i as f64),
            PdfObject::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Integer value; reals are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            PdfObject::Real(r) if r.is_finite() => Some(*r as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PdfObject::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjRef> {
        match self {
            PdfObject::Reference(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfObject]> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PdfObject::String(s) => Some(s),
            _ => None,
        }
    }
}

/// A PDF dictionary in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    entries: Vec<(String, PdfObject)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PdfObject) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// First key of `keys` that is present. For inline-image style
    /// abbreviations such as `["W", "Width"]`.
    pub fn get_any(&self, keys: &[&str]) -> Option<&PdfObject> {
        keys.iter().find_map(|k| self.get(k))
    }

    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_name()
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_i64()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    pub fn get_ref(&self, key: &str) -> Option<ObjRef> {
        self.get(key)?.as_reference()
    }

    pub fn get_array(&self, key: &str) -> Option<&[PdfObject]> {
        self.get(key)?.as_array()
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key)?.as_dict()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PdfObject)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const MAX_DEPTH: usize = 128;

struct Reader {
    lexemes: Vec<Lexeme>,
    pos: usize,
}

impl Reader {
    /// Lex the whole input, keeping everything read before a lexer error.
    fn new(text: &[u8]) -> Self {
        let mut lexer = Lexer::new(text);
        let mut lexemes = Vec::new();
        while let Ok(Some(lexeme)) = lexer.next_lexeme() {
            lexemes.push(lexeme);
        }
        let mut reader = Self { lexemes, pos: 0 };
        reader.skip_object_header();
        reader
    }

    fn skip_object_header(&mut self) {
        if let [Lexeme::Integer(_), Lexeme::Integer(_), Lexeme::Keyword(kw), ..] =
            self.lexemes.as_slice()
        {
            if kw == "obj" {
                self.pos = 3;
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<&Lexeme> {
        self.lexemes.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Lexeme> {
        let lexeme = self.lexemes.get(self.pos).cloned();
        self.pos += 1;
        lexeme
    }

    /// First complete object, skipping anything that cannot start one.
    fn first_object(&mut self) -> Option<PdfObject> {
        while self.pos < self.lexemes.len() {
            if let Some(obj) = self.value(0) {
                return Some(obj);
            }
        }
        None
    }

    fn value(&mut self, depth: usize) -> Option<PdfObject> {
        let lexeme = self.next()?;
        Some(match lexeme {
            Lexeme::Integer(num) => {
                if let (Some(Lexeme::Integer(generation)), Some(Lexeme::Keyword(r))) =
                    (self.peek(0), self.peek(1))
                {
                    if r == "R" {
                        let (Ok(num), Ok(generation)) =
                            (u32::try_from(num), u16::try_from(*generation))
                        else {
                            self.pos += 2;
                            return Some(PdfObject::Null);
                        };
                        self.pos += 2;
                        return Some(PdfObject::Reference(ObjRef::new(num, generation)));
                    }
                }
                PdfObject::Integer(num)
            }
            Lexeme::Real(r) => PdfObject::Real(r),
            Lexeme::Name(n) => PdfObject::Name(n),
            Lexeme::LiteralString(s) | Lexeme::HexString(s) => PdfObject::String(s),
            Lexeme::ArrayStart if depth >= MAX_DEPTH => PdfObject::Null,
            Lexeme::DictStart if depth >= MAX_DEPTH => PdfObject::Null,
            Lexeme::ArrayStart => PdfObject::Array(self.array(depth + 1)),
            Lexeme::DictStart => PdfObject::Dictionary(self.dictionary(depth + 1)),
            Lexeme::Keyword(kw) => match kw.as_str() {
                "true" => PdfObject::Boolean(true),
                "false" => PdfObject::Boolean(false),
                "null" => PdfObject::Null,
                _ => return None,
            },
            Lexeme::ArrayEnd | Lexeme::DictEnd => return None,
        })
    }

    fn array(&mut self, depth: usize) -> Vec<PdfObject> {
        let mut items = Vec::new();
        while let Some(lexeme) = self.peek(0) {
            match lexeme {
                Lexeme::ArrayEnd | Lexeme::DictEnd => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    if let Some(item) = self.value(depth) {
                        items.push(item);
                    }
                }
            }
        }
        items
    }

    fn dictionary(&mut self, depth: usize) -> Dictionary {
        let mut dict = Dictionary::new();
        while let Some(lexeme) = self.peek(0) {
            match lexeme {
                Lexeme::DictEnd | Lexeme::ArrayEnd => {
                    self.pos += 1;
                    break;
                }
                Lexeme::Name(key) => {
                    let key = key.clone();
                    self.pos += 1;
                    if matches!(self.peek(0), Some(Lexeme::DictEnd) | None) {
                        continue;
                    }
                    if let Some(value) = self.value(depth) {
                        dict.insert(key, value);
                    }
                }
                // a key must be a name
                _ => self.pos += 1,
            }
        }
        dict
    }
}

/// Parse the first object in `text`.
pub fn parse_object(text: impl AsRef<[u8]>) -> Option<PdfObject> {
    Reader::new(text.as_ref()).first_object()
}

/// Parse the first dictionary in `text`, ignoring anything before its `<<`.
pub fn parse_dictionary(text: impl AsRef<[u8]>) -> Option<Dictionary> {
    let mut reader = Reader::new(text.as_ref());
    let start = reader
        .lexemes
        .iter()
        .position(|l| *l == Lexeme::DictStart)?;
    reader.pos = start + 1;
    Some(reader.dictionary(1))
}
