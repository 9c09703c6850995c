//! Content stream tokenizer.
//!
//! A [`Lexer`] splits PDF syntax into lexemes. [`tokenize`] groups those
//! lexemes into [`Operator`]s for content stream execution: operands are
//! collected on a stack and handed to the next operator keyword, so each
//! operator sees exactly the values written before it. The dictionary
//! reader drives the same lexer for nested object parsing.

use crate::error::BackendError;

/// A content stream operand value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Integer number (e.g., `42`, `-7`).
    Integer(i64),
    /// Real number (e.g., `3.14`, `.5`).
    Real(f64),
    /// Name object stored without the leading `/`.
    Name(String),
    /// Literal string delimited by parentheses, escapes decoded.
    LiteralString(Vec<u8>),
    /// Hexadecimal string delimited by angle brackets, stored as bytes.
    HexString(Vec<u8>),
    /// Array of operands (e.g., `[1 2 3]`).
    Array(Vec<Operand>),
    /// Boolean value (`true` or `false`).
    Boolean(bool),
    /// The null object.
    Null,
    /// Dictionary object (`<< /Key value ... >>`).
    Dictionary(Vec<(String, Operand)>),
}

impl Operand {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Operand::Integer(i) => Some(*i as f64),
            Operand::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Raw bytes of a literal or hex string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Operand::LiteralString(b) | Operand::HexString(b) => Some(b),
            _ => None,
        }
    }
}

/// A content stream operator with its preceding operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    /// Operator name (e.g., `"BT"`, `"Tf"`, `"Tj"`, `"m"`).
    pub name: String,
    /// Operands that preceded this operator on the operand stack.
    ///
    /// For `BI` the operands are the inline image dictionary followed by
    /// the raw image bytes as a `LiteralString`.
    pub operands: Vec<Operand>,
}

/// One lexical unit of PDF syntax.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lexeme {
    Integer(i64),
    Real(f64),
    Name(String),
    LiteralString(Vec<u8>),
    HexString(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
    /// Any bare word: operators, `true`, `false`, `null`, `R`, `obj`.
    Keyword(String),
}

/// Byte-level scanner over PDF syntax.
pub(crate) struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Next lexeme, `Ok(None)` at end of input.
    pub(crate) fn next_lexeme(&mut self) -> Result<Option<Lexeme>, BackendError> {
        loop {
            self.skip_whitespace_and_comments();
            let Some(&b) = self.input.get(self.pos) else {
                return Ok(None);
            };
            let lexeme = match b {
                b'(' => Lexeme::LiteralString(self.literal_string()?),
                b'<' if self.peek_at(1) == Some(b'<') => {
                    self.pos += 2;
                    Lexeme::DictStart
                }
                b'<' => Lexeme::HexString(self.hex_string()),
                b'>' if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    Lexeme::DictEnd
                }
                b'[' => {
                    self.pos += 1;
                    Lexeme::ArrayStart
                }
                b']' => {
                    self.pos += 1;
                    Lexeme::ArrayEnd
                }
                b'/' => Lexeme::Name(self.name()),
                b'0'..=b'9' | b'+' | b'-' | b'.' => self.number(),
                b')' | b'>' | b'{' | b'}' => {
                    // stray delimiter
                    self.pos += 1;
                    continue;
                }
                _ => Lexeme::Keyword(self.keyword()),
            };
            return Ok(Some(lexeme));
        }
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&b) = self.input.get(self.pos) {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(&c) = self.input.get(self.pos) {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Balanced-parenthesis literal with escape decoding.
    fn literal_string(&mut self) -> Result<Vec<u8>, BackendError> {
        let input = self.input;
        self.pos += 1;
        let mut result = Vec::new();
        let mut depth = 1u32;

        while let Some(&b) = input.get(self.pos) {
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    result.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(result);
                    }
                    result.push(b);
                }
                b'\\' => {
                    let Some(&escaped) = input.get(self.pos) else {
                        break;
                    };
                    self.pos += 1;
                    match escaped {
                        b'n' => result.push(b'\n'),
                        b'r' => result.push(b'\r'),
                        b't' => result.push(b'\t'),
                        b'b' => result.push(0x08),
                        b'f' => result.push(0x0C),
                        b'\r' => {
                            // line continuation, CR or CRLF
                            if input.get(self.pos) == Some(&b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut val = u32::from(escaped - b'0');
                            for _ in 0..2 {
                                match input.get(self.pos) {
                                    Some(&d @ b'0'..=b'7') => {
                                        val = val * 8 + u32::from(d - b'0');
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            result.push((val & 0xFF) as u8);
                        }
                        // `\\`, `\(`, `\)` and unknown escapes keep the character
                        other => result.push(other),
                    }
                }
                _ => result.push(b),
            }
        }

        Err(BackendError::Interpreter(
            "unterminated literal string".to_string(),
        ))
    }

    /// `<...>` hex string; whitespace and non-hex bytes are ignored, an odd
    /// digit count is padded with a trailing 0.
    fn hex_string(&mut self) -> Vec<u8> {
        self.pos += 1;
        let mut digits = Vec::new();
        while let Some(&b) = self.input.get(self.pos) {
            self.pos += 1;
            if b == b'>' {
                break;
            }
            if let Some(v) = hex_value(b) {
                digits.push(v);
            }
        }
        if digits.len() % 2 != 0 {
            digits.push(0);
        }
        digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect()
    }

    /// `/Name` with `#XX` escapes decoded.
    fn name(&mut self) -> String {
        self.pos += 1;
        let start = self.pos;
        while let Some(&b) = self.input.get(self.pos) {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            self.pos += 1;
        }
        decode_name(&self.input[start..self.pos])
    }

    /// Integer or real. A malformed number (`-`, `.`) reads as zero.
    fn number(&mut self) -> Lexeme {
        let start = self.pos;
        if matches!(self.input.get(self.pos), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut has_dot = false;
        while let Some(&b) = self.input.get(self.pos) {
            if b == b'.' && !has_dot {
                has_dot = true;
            } else if !b.is_ascii_digit() {
                break;
            }
            self.pos += 1;
        }
        let token = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or("0");
        if !token.bytes().any(|b| b.is_ascii_digit()) {
            return Lexeme::Integer(0);
        }
        if has_dot {
            Lexeme::Real(token.parse().unwrap_or(0.0))
        } else {
            match token.parse::<i64>() {
                Ok(v) => Lexeme::Integer(v),
                // out of i64 range
                Err(_) => Lexeme::Real(token.parse().unwrap_or(0.0)),
            }
        }
    }

    fn keyword(&mut self) -> String {
        let start = self.pos;
        while let Some(&b) = self.input.get(self.pos) {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn skip_one_whitespace(&mut self) {
        match self.input.get(self.pos) {
            Some(b'\r') => {
                self.pos += 1;
                if self.input.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
            }
            Some(&b) if is_whitespace(b) => self.pos += 1,
            _ => {}
        }
    }

    /// Whether the bytes at the cursor are the keyword `EI` (after optional
    /// whitespace). Consumes it when present.
    fn take_ei(&mut self) -> bool {
        let save = self.pos;
        self.skip_whitespace_and_comments();
        if self.input[self.pos..].starts_with(b"EI")
            && self
                .input
                .get(self.pos + 2)
                .is_none_or(|&b| is_whitespace(b) || is_delimiter(b))
        {
            self.pos += 2;
            return true;
        }
        self.pos = save;
        false
    }

    /// Scan forward for `EI` preceded by whitespace and followed by
    /// whitespace, a delimiter, or end of input. Returns the data before it.
    fn scan_to_ei(&mut self, data_start: usize) -> Option<Vec<u8>> {
        let input = self.input;
        let mut i = data_start;
        while i + 2 <= input.len() {
            if &input[i..i + 2] == b"EI"
                && (i == data_start || is_whitespace(input[i - 1]))
                && input
                    .get(i + 2)
                    .is_none_or(|&b| is_whitespace(b) || is_delimiter(b))
            {
                let mut end = i;
                if end > data_start && is_whitespace(input[end - 1]) {
                    end -= 1;
                }
                self.pos = i + 2;
                return Some(input[data_start..end].to_vec());
            }
            i += 1;
        }
        None
    }
}

pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn decode_name(raw: &[u8]) -> String {
    let mut name = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            if let (Some(hi), Some(lo)) = (hex_value(raw[i + 1]), hex_value(raw[i + 2])) {
                name.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        name.push(raw[i]);
        i += 1;
    }
    String::from_utf8_lossy(&name).into_owned()
}

/// Parse content stream bytes into a sequence of operators.
///
/// Comments are stripped. Inline images (`BI` ... `ID` ... `EI`) become a
/// single `BI` operator.
///
/// # Errors
///
/// Returns [`BackendError::Interpreter`] when the stream cannot be read to
/// the end (unterminated string, array, dictionary, or inline image).
pub fn tokenize(input: &[u8]) -> Result<Vec<Operator>, BackendError> {
    match tokenize_partial(input) {
        (ops, None) => Ok(ops),
        (_, Some(err)) => Err(err),
    }
}

/// Like [`tokenize`], but keeps the operators read before an error.
pub fn tokenize_partial(input: &[u8]) -> (Vec<Operator>, Option<BackendError>) {
    let mut lexer = Lexer::new(input);
    let mut ops = Vec::new();
    let mut stack: Vec<Operand> = Vec::new();

    loop {
        let lexeme = match lexer.next_lexeme() {
            Ok(Some(lexeme)) => lexeme,
            Ok(None) => return (ops, None),
            Err(err) => return (ops, Some(err)),
        };
        match lexeme {
            Lexeme::Keyword(kw) => match kw.as_str() {
                "true" => stack.push(Operand::Boolean(true)),
                "false" => stack.push(Operand::Boolean(false)),
                "null" => stack.push(Operand::Null),
                "BI" => match read_inline_image(&mut lexer) {
                    Ok((dict, data)) => {
                        stack.clear();
                        ops.push(Operator {
                            name: kw,
                            operands: vec![Operand::Dictionary(dict), Operand::LiteralString(data)],
                        });
                    }
                    Err(err) => return (ops, Some(err)),
                },
                _ => ops.push(Operator {
                    name: kw,
                    operands: std::mem::take(&mut stack),
                }),
            },
            // stray closers at top level
            Lexeme::ArrayEnd | Lexeme::DictEnd => {}
            other => match operand_from(&mut lexer, other) {
                Ok(operand) => stack.push(operand),
                Err(err) => return (ops, Some(err)),
            },
        }
    }
}

/// Nesting depth beyond which arrays and dictionaries are rejected.
const MAX_NESTING: usize = 256;

/// Build an operand from a lexeme, reading nested arrays and dictionaries.
fn operand_from(lexer: &mut Lexer<'_>, lexeme: Lexeme) -> Result<Operand, BackendError> {
    nested_operand(lexer, lexeme, 0)
}

fn nested_operand(
    lexer: &mut Lexer<'_>,
    lexeme: Lexeme,
    depth: usize,
) -> Result<Operand, BackendError> {
    if depth > MAX_NESTING {
        return Err(BackendError::Interpreter(
            "operand nesting too deep".to_string(),
        ));
    }
    Ok(match lexeme {
        Lexeme::Integer(i) => Operand::Integer(i),
        Lexeme::Real(r) => Operand::Real(r),
        Lexeme::Name(n) => Operand::Name(n),
        Lexeme::LiteralString(s) => Operand::LiteralString(s),
        Lexeme::HexString(s) => Operand::HexString(s),
        Lexeme::ArrayStart => Operand::Array(read_array(lexer, depth + 1)?),
        Lexeme::DictStart => Operand::Dictionary(read_dictionary(lexer, depth + 1)?),
        Lexeme::Keyword(kw) => match kw.as_str() {
            "true" => Operand::Boolean(true),
            "false" => Operand::Boolean(false),
            "null" => Operand::Null,
            // operators never appear inside arrays; keep the word
            _ => Operand::Name(kw),
        },
        Lexeme::ArrayEnd | Lexeme::DictEnd => Operand::Null,
    })
}

fn read_array(lexer: &mut Lexer<'_>, depth: usize) -> Result<Vec<Operand>, BackendError> {
    let mut elements = Vec::new();
    loop {
        match lexer.next_lexeme()? {
            None => return Err(BackendError::Interpreter("unterminated array".to_string())),
            Some(Lexeme::ArrayEnd) => return Ok(elements),
            Some(Lexeme::DictEnd) => {}
            Some(other) => elements.push(nested_operand(lexer, other, depth)?),
        }
    }
}

fn read_dictionary(
    lexer: &mut Lexer<'_>,
    depth: usize,
) -> Result<Vec<(String, Operand)>, BackendError> {
    let mut entries = Vec::new();
    loop {
        match lexer.next_lexeme()? {
            None => {
                return Err(BackendError::Interpreter(
                    "unterminated dictionary".to_string(),
                ));
            }
            Some(Lexeme::DictEnd) => return Ok(entries),
            Some(Lexeme::Name(key)) => {
                let Some(value) = lexer.next_lexeme()? else {
                    return Err(BackendError::Interpreter(
                        "unterminated dictionary".to_string(),
                    ));
                };
                if value == Lexeme::DictEnd {
                    return Ok(entries);
                }
                entries.push((key, nested_operand(lexer, value, depth)?));
            }
            // non-name key, skip it
            Some(_) => {}
        }
    }
}

/// Read `<entries> ID <data> EI` after a `BI` keyword.
///
/// Unfiltered data is taken by its declared size so binary samples that
/// happen to contain `EI` do not end the image early. Filtered data (whose
/// encoded length is unknown) is delimited by scanning for `EI`.
fn read_inline_image(
    lexer: &mut Lexer<'_>,
) -> Result<(Vec<(String, Operand)>, Vec<u8>), BackendError> {
    let mut dict = Vec::new();
    loop {
        match lexer.next_lexeme()? {
            None => {
                return Err(BackendError::Interpreter(
                    "unterminated inline image (missing ID)".to_string(),
                ));
            }
            Some(Lexeme::Keyword(kw)) if kw == "ID" => break,
            Some(Lexeme::Name(key)) => {
                let Some(value) = lexer.next_lexeme()? else {
                    return Err(BackendError::Interpreter(
                        "unterminated inline image dictionary".to_string(),
                    ));
                };
                if value == Lexeme::Keyword("ID".to_string()) {
                    break;
                }
                dict.push((key, operand_from(lexer, value)?));
            }
            Some(_) => {}
        }
    }
    lexer.skip_one_whitespace();
    let data_start = lexer.position();

    if let Some(len) = unfiltered_inline_len(&dict) {
        let end = data_start.saturating_add(len);
        if end <= lexer.input.len() {
            lexer.pos = end;
            if lexer.take_ei() {
                return Ok((dict, lexer.input[data_start..end].to_vec()));
            }
            lexer.pos = data_start;
        }
    }

    lexer.scan_to_ei(data_start).map(|data| (dict, data)).ok_or_else(|| {
        BackendError::Interpreter("unterminated inline image (missing EI)".to_string())
    })
}

fn inline_entry<'d>(dict: &'d [(String, Operand)], keys: &[&str]) -> Option<&'d Operand> {
    dict.iter()
        .find(|(k, _)| keys.contains(&k.as_str()))
        .map(|(_, v)| v)
}

/// Byte length of unfiltered inline image data, when it can be derived
/// from the dictionary.
fn unfiltered_inline_len(dict: &[(String, Operand)]) -> Option<usize> {
    match inline_entry(dict, &["F", "Filter"]) {
        None | Some(Operand::Null) => {}
        Some(Operand::Array(filters)) if filters.is_empty() => {}
        Some(_) => return None,
    }
    let dim = |keys: &[&str]| -> Option<usize> {
        let v = inline_entry(dict, keys)?.as_f64()?;
        (v >= 1.0).then_some(v as usize)
    };
    let width = dim(&["W", "Width"])?;
    let height = dim(&["H", "Height"])?;
    let image_mask = matches!(
        inline_entry(dict, &["IM", "ImageMask"]),
        Some(Operand::Boolean(true))
    );
    let (components, bpc) = if image_mask {
        (1, 1)
    } else {
        let bpc = dim(&["BPC", "BitsPerComponent"])?;
        let components = match inline_entry(dict, &["CS", "ColorSpace"])? {
            Operand::Name(n) => match n.as_str() {
                "G" | "DeviceGray" | "CalGray" => 1,
                "RGB" | "DeviceRGB" | "CalRGB" => 3,
                "CMYK" | "DeviceCMYK" => 4,
                "I" | "Indexed" => 1,
                _ => return None,
            },
            Operand::Array(parts) => match parts.first().and_then(Operand::as_name) {
                Some("I" | "Indexed") => 1,
                _ => return None,
            },
            _ => return None,
        };
        (components, bpc)
    };
    let row_bits = width.checked_mul(components)?.checked_mul(bpc)?;
    row_bits.div_ceil(8).checked_mul(height)
}
