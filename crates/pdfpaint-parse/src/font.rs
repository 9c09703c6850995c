//! Font resource resolution.
//!
//! [`resolve_font`] turns one `/Font` resource entry into a [`FontResource`]:
//! subtype, family name, embedded program, width table, ToUnicode map, and
//! the byte length of character codes. Broken links in the font's object
//! chain degrade single fields and are reported as [`RenderWarning`]s; only
//! an unreadable font dictionary fails resolution.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use pdfpaint_core::{
    FontFormat, FontProgram, RenderResult, RenderWarning, WarningCode, WritingMode,
};
use tracing::{debug, warn};

use crate::cmap::ToUnicodeCMap;
use crate::dictionary::{Dictionary, PdfObject, parse_dictionary, parse_object};
use crate::encoding::SimpleEncoding;
use crate::error::{BackendError, StoreError};
use crate::store::{ObjRef, ObjectStore};
use crate::widths::{DEFAULT_WIDTH, WidthTable};

/// Font dictionary `/Subtype`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSubtype {
    Type0,
    Type1,
    MMType1,
    TrueType,
    Type3,
    Other(String),
}

impl FontSubtype {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Type0" => FontSubtype::Type0,
            "Type1" => FontSubtype::Type1,
            "MMType1" => FontSubtype::MMType1,
            "TrueType" => FontSubtype::TrueType,
            "Type3" => FontSubtype::Type3,
            other => FontSubtype::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FontSubtype::Type0 => "Type0",
            FontSubtype::Type1 => "Type1",
            FontSubtype::MMType1 => "MMType1",
            FontSubtype::TrueType => "TrueType",
            FontSubtype::Type3 => "Type3",
            FontSubtype::Other(name) => name,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, FontSubtype::Type0)
    }
}

/// A resolved font, built once per page and font tag.
#[derive(Debug, Clone, PartialEq)]
pub struct FontResource {
    /// Resource name the content stream uses, e.g. `F1`.
    pub tag: String,
    pub subtype: FontSubtype,
    /// `/BaseFont` as declared.
    pub base_name: String,
    /// Base name without a subset tag; the resource tag when no base name.
    pub family: String,
    /// Declared `/Encoding` name.
    pub encoding_name: Option<String>,
    /// Single-byte fallback decoding for simple fonts.
    pub simple_encoding: SimpleEncoding,
    pub program: Option<FontProgram>,
    pub to_unicode: Option<ToUnicodeCMap>,
    pub widths: Option<WidthTable>,
    pub default_width: f64,
    pub writing_mode: WritingMode,
    /// Bytes per character code.
    pub code_length: usize,
}

impl FontResource {
    /// Placeholder for a tag the page does not define or whose dictionary is
    /// unreadable: one-byte codes, code-as-code-point text, default widths.
    pub fn fallback(tag: &str) -> Self {
        FontResource {
            tag: tag.to_string(),
            subtype: FontSubtype::Other(String::new()),
            base_name: String::new(),
            family: tag.to_string(),
            encoding_name: None,
            simple_encoding: SimpleEncoding::default(),
            program: None,
            to_unicode: None,
            widths: None,
            default_width: DEFAULT_WIDTH,
            writing_mode: WritingMode::Horizontal,
            code_length: 1,
        }
    }

    /// Split string bytes into character codes. A short trailing chunk is
    /// read as a code of its own.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks(self.code_length.max(1))
            .map(|chunk| chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
            .collect()
    }

    /// Unicode text of one character code.
    pub fn decode_code(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.lookup(code)) {
            return text.to_string();
        }
        if !self.subtype.is_composite() {
            if let Some(ch) = u8::try_from(code)
                .ok()
                .and_then(|b| self.simple_encoding.decode(b))
            {
                return ch.to_string();
            }
        }
        char::from_u32(code).unwrap_or('\u{FFFD}').to_string()
    }

    /// Width of a code in glyph space (1/1000 em).
    pub fn glyph_width(&self, code: u32) -> f64 {
        self.widths
            .as_ref()
            .and_then(|w| w.explicit(code))
            .unwrap_or(self.default_width)
    }

    pub fn is_vertical(&self) -> bool {
        self.writing_mode == WritingMode::Vertical
    }
}

/// Strip a six-uppercase-letter subset tag such as `ABCDEF+`.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((prefix, rest))
            if prefix.len() == 6 && prefix.bytes().all(|b| b.is_ascii_uppercase()) =>
        {
            rest
        }
        _ => name,
    }
}

/// Resolve a font resource entry.
///
/// `dict_text` is the font dictionary's PDF syntax. Referenced objects are
/// fetched through `store`.
///
/// # Errors
///
/// Returns [`BackendError::Font`] when `dict_text` holds no dictionary.
pub fn resolve_font<S: ObjectStore + ?Sized>(
    tag: &str,
    dict_text: &str,
    store: &S,
) -> Result<RenderResult<FontResource>, BackendError> {
    let dict = parse_dictionary(dict_text)
        .ok_or_else(|| BackendError::Font(format!("font {tag} has no dictionary")))?;
    Ok(resolve_font_dictionary(tag, &dict, store))
}

/// Resolve an already parsed font dictionary.
pub fn resolve_font_dictionary<S: ObjectStore + ?Sized>(
    tag: &str,
    dict: &Dictionary,
    store: &S,
) -> RenderResult<FontResource> {
    let mut resolver = Resolver {
        tag,
        store,
        warnings: Vec::new(),
    };
    let font = resolver.resolve(dict);
    debug!(
        tag,
        subtype = font.subtype.as_str(),
        family = %font.family,
        program = font.program.as_ref().map(|p| p.format.as_str()),
        to_unicode = font.to_unicode.is_some(),
        warnings = resolver.warnings.len(),
        "resolved font"
    );
    RenderResult::with_warnings(font, resolver.warnings)
}

struct Resolver<'a, S: ?Sized> {
    tag: &'a str,
    store: &'a S,
    warnings: Vec<RenderWarning>,
}

impl<S: ObjectStore + ?Sized> Resolver<'_, S> {
    fn resolve(&mut self, dict: &Dictionary) -> FontResource {
        let subtype = FontSubtype::from_name(dict.get_name("Subtype").unwrap_or_default());
        let base_name = dict.get_name("BaseFont").unwrap_or_default().to_string();
        let family = match strip_subset_prefix(&base_name) {
            "" => self.tag.to_string(),
            stripped => stripped.to_string(),
        };
        let encoding = dict.get("Encoding").and_then(|e| self.value(e, "Encoding"));
        let encoding_name = encoding.as_ref().and_then(PdfObject::as_name).map(str::to_string);

        let mut font = FontResource {
            tag: self.tag.to_string(),
            subtype: subtype.clone(),
            base_name,
            family,
            encoding_name,
            ..FontResource::fallback(self.tag)
        };

        font.to_unicode = dict.get("ToUnicode").and_then(|v| self.to_unicode(v));

        match subtype {
            FontSubtype::Type0 => self.resolve_composite(dict, encoding.as_ref(), &mut font),
            FontSubtype::Type3 => {
                font.simple_encoding = SimpleEncoding::from_object(encoding.as_ref());
                let scale = dict
                    .get_array("FontMatrix")
                    .and_then(|m| m.first())
                    .and_then(PdfObject::as_f64)
                    .map_or(1.0, |a| a * 1000.0);
                font.default_width = DEFAULT_WIDTH * scale;
                font.widths = self.simple_widths(dict, None).map(|t| t.scaled(scale));
            }
            _ => {
                font.simple_encoding = SimpleEncoding::from_object(encoding.as_ref());
                let descriptor = self.descriptor(dict);
                let missing = descriptor.as_ref().and_then(|d| d.get_f64("MissingWidth"));
                if let Some(missing) = missing {
                    font.default_width = missing;
                }
                font.widths = self.simple_widths(dict, missing);
                font.program = descriptor.as_ref().and_then(|d| self.program(d));
            }
        }
        font
    }

    fn resolve_composite(
        &mut self,
        dict: &Dictionary,
        encoding: Option<&PdfObject>,
        font: &mut FontResource,
    ) {
        font.code_length = 2;
        match encoding {
            Some(PdfObject::Name(name)) => {
                if name.ends_with("-V") {
                    font.writing_mode = WritingMode::Vertical;
                }
            }
            // an embedded CMap stream
            Some(PdfObject::Dictionary(cmap_dict)) => {
                if cmap_dict.get_i64("WMode") == Some(1) {
                    font.writing_mode = WritingMode::Vertical;
                }
                if let Some(r) = dict.get_ref("Encoding") {
                    if let Some(len) = self
                        .stream(r, "Encoding")
                        .and_then(|data| ToUnicodeCMap::parse(&data).ok())
                        .and_then(|cmap| cmap.code_length())
                    {
                        font.code_length = len;
                    }
                }
            }
            _ => {}
        }
        if dict.get_ref("Encoding").is_none() {
            if let Some(len) = font.to_unicode.as_ref().and_then(ToUnicodeCMap::code_length) {
                font.code_length = len;
            }
        }

        let descendant = dict
            .get("DescendantFonts")
            .and_then(|v| self.value(v, "DescendantFonts"))
            .and_then(|v| match v {
                PdfObject::Array(items) => items.into_iter().next(),
                _ => None,
            })
            .and_then(|first| self.dict_value(&first, "DescendantFonts"));
        let Some(descendant) = descendant else {
            self.warn(
                WarningCode::MalformedDictionary,
                "Type0 font without a descendant font",
                None,
            );
            return;
        };

        let default_width = descendant
            .get("DW")
            .and_then(|v| self.value(v, "DW"))
            .and_then(|v| v.as_f64());
        font.default_width = default_width.unwrap_or(DEFAULT_WIDTH);
        if let Some(w) = descendant.get("W").and_then(|v| self.value(v, "W")) {
            match w {
                PdfObject::Array(items) => {
                    match WidthTable::from_cid_widths(&items, default_width) {
                        Ok(table) => font.widths = Some(table),
                        Err(err) => {
                            self.warn(WarningCode::MalformedDictionary, format!("/W: {err}"), None)
                        }
                    }
                }
                _ => self.warn(WarningCode::MalformedDictionary, "/W is not an array", None),
            }
        }
        if let Some(desc) = self.descriptor(&descendant) {
            font.program = self.program(&desc);
        }
    }

    fn simple_widths(&mut self, dict: &Dictionary, missing: Option<f64>) -> Option<WidthTable> {
        let widths = dict.get("Widths").and_then(|v| self.value(v, "Widths"))?;
        let Some(items) = widths.as_array() else {
            self.warn(WarningCode::MalformedDictionary, "/Widths is not an array", None);
            return None;
        };
        let first_char = dict
            .get("FirstChar")
            .and_then(|v| self.value(v, "FirstChar"))
            .and_then(|v| v.as_i64())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);
        match WidthTable::from_simple_widths(first_char, items, missing) {
            Ok(table) => Some(table),
            Err(err) => {
                self.warn(WarningCode::MalformedDictionary, format!("/Widths: {err}"), None);
                None
            }
        }
    }

    fn descriptor(&mut self, dict: &Dictionary) -> Option<Dictionary> {
        let value = dict.get("FontDescriptor")?;
        self.dict_value(value, "FontDescriptor")
    }

    /// Embedded program: `FontFile2`, then `FontFile`, then `FontFile3`.
    fn program(&mut self, descriptor: &Dictionary) -> Option<FontProgram> {
        for key in ["FontFile2", "FontFile", "FontFile3"] {
            let Some(r) = descriptor.get_ref(key) else {
                continue;
            };
            let format = match key {
                "FontFile2" => FontFormat::TrueType,
                "FontFile" => FontFormat::Type1,
                _ => match self.dictionary(r, key).as_ref().and_then(|d| d.get_name("Subtype")) {
                    Some("Type1C" | "CIDFontType0C") => FontFormat::OpenType,
                    _ => FontFormat::Binary,
                },
            };
            return self
                .stream(r, key)
                .map(|bytes| FontProgram::new(bytes, format));
        }
        None
    }

    fn to_unicode(&mut self, value: &PdfObject) -> Option<ToUnicodeCMap> {
        let Some(r) = value.as_reference() else {
            // a name such as /Identity-H carries no mapping
            return None;
        };
        let data = self.stream(r, "ToUnicode")?;
        match ToUnicodeCMap::parse(&data) {
            Ok(cmap) if cmap.is_empty() => {
                debug!(tag = self.tag, object = %r, "ToUnicode map is empty");
                None
            }
            Ok(cmap) => Some(cmap),
            Err(err) => {
                self.warn(
                    WarningCode::MalformedDictionary,
                    format!("ToUnicode: {err}"),
                    Some(r),
                );
                None
            }
        }
    }

    /// Follow a reference to its object; direct values pass through.
    fn value(&mut self, value: &PdfObject, key: &str) -> Option<PdfObject> {
        let PdfObject::Reference(r) = value else {
            return Some(value.clone());
        };
        let text = self.fetch(r, key, |s, r| s.dictionary_of(r))?;
        let parsed = parse_object(text.as_bytes());
        if parsed.is_none() {
            self.warn(
                WarningCode::MalformedDictionary,
                format!("/{key} object is unreadable"),
                Some(*r),
            );
        }
        parsed
    }

    fn dict_value(&mut self, value: &PdfObject, key: &str) -> Option<Dictionary> {
        match value {
            PdfObject::Dictionary(d) => Some(d.clone()),
            PdfObject::Reference(r) => self.dictionary(*r, key),
            _ => {
                self.warn(
                    WarningCode::MalformedDictionary,
                    format!("/{key} is not a dictionary"),
                    None,
                );
                None
            }
        }
    }

    fn dictionary(&mut self, r: ObjRef, key: &str) -> Option<Dictionary> {
        let text = self.fetch(&r, key, |s, r| s.dictionary_of(r))?;
        let dict = parse_dictionary(text.as_bytes());
        if dict.is_none() {
            self.warn(
                WarningCode::MalformedDictionary,
                format!("/{key} is not a dictionary"),
                Some(r),
            );
        }
        dict
    }

    fn stream(&mut self, r: ObjRef, key: &str) -> Option<Arc<[u8]>> {
        self.fetch(&r, key, |s, r| s.decoded_stream_of(r))
    }

    fn fetch<T>(
        &mut self,
        r: &ObjRef,
        key: &str,
        get: impl FnOnce(&S, ObjRef) -> Result<T, StoreError>,
    ) -> Option<T> {
        match get(self.store, *r) {
            Ok(value) => Some(value),
            Err(err) => {
                self.warn(err.warning_code(), format!("/{key}: {err}"), Some(*r));
                None
            }
        }
    }

    fn warn(&mut self, code: WarningCode, description: impl Into<String>, object: Option<ObjRef>) {
        let mut warning = RenderWarning::new(code, description).with_font(self.tag);
        if let Some(r) = object {
            warning = warning.with_object(r.to_string());
        }
        warn!(tag = self.tag, "{warning}");
        self.warnings.push(warning);
    }
}

/// How a font resource is given in a page's `/Font` dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum FontEntry {
    Reference(ObjRef),
    /// Dictionary written directly in the resources.
    Inline(Dictionary),
}

/// Per-page cache of resolved fonts, keyed by resource tag.
///
/// Each tag is resolved at most once; tags that fail to resolve are cached
/// as [`FontResource::fallback`].
#[derive(Debug, Default)]
pub struct FontCache {
    fonts: HashMap<String, Arc<FontResource>>,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<FontResource>> {
        self.fonts.get(tag)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// All cached fonts, ordered by tag.
    pub fn fonts(&self) -> Vec<Arc<FontResource>> {
        let mut fonts: Vec<_> = self.fonts.values().cloned().collect();
        fonts.sort_by(|a, b| a.tag.cmp(&b.tag));
        fonts
    }

    /// Cached font for `tag`, resolving `entry` on first use.
    pub fn get_or_resolve<S: ObjectStore + ?Sized>(
        &mut self,
        tag: &str,
        entry: Option<&FontEntry>,
        store: &S,
    ) -> RenderResult<Arc<FontResource>> {
        if let Some(font) = self.fonts.get(tag) {
            return RenderResult::ok(Arc::clone(font));
        }
        let resolved = resolve_entry(tag, entry, store).map(Arc::new);
        self.fonts.insert(tag.to_string(), Arc::clone(&resolved.value));
        resolved
    }

    /// Resolve every font of a page up front.
    ///
    /// With the `parallel` feature the fonts resolve concurrently; shared
    /// descriptors and font files are decoded once if `store` memoizes.
    pub fn preload<S: ObjectStore + ?Sized>(
        &mut self,
        entries: &BTreeMap<String, FontEntry>,
        store: &S,
    ) -> Vec<RenderWarning> {
        let pending: Vec<(&String, &FontEntry)> = entries
            .iter()
            .filter(|(tag, _)| !self.fonts.contains_key(tag.as_str()))
            .collect();

        #[cfg(feature = "parallel")]
        let resolved: Vec<(String, RenderResult<FontResource>)> = {
            use rayon::prelude::*;
            pending
                .into_par_iter()
                .map(|(tag, entry)| (tag.clone(), resolve_entry(tag, Some(entry), store)))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let resolved: Vec<(String, RenderResult<FontResource>)> = pending
            .into_iter()
            .map(|(tag, entry)| (tag.clone(), resolve_entry(tag, Some(entry), store)))
            .collect();

        let mut warnings = Vec::new();
        for (tag, result) in resolved {
            warnings.extend(result.warnings);
            self.fonts.insert(tag, Arc::new(result.value));
        }
        warnings
    }
}

fn resolve_entry<S: ObjectStore + ?Sized>(
    tag: &str,
    entry: Option<&FontEntry>,
    store: &S,
) -> RenderResult<FontResource> {
    let failure = match entry {
        Some(FontEntry::Inline(dict)) => return resolve_font_dictionary(tag, dict, store),
        Some(FontEntry::Reference(r)) => match store.dictionary_of(*r) {
            Ok(text) => match resolve_font(tag, &text, store) {
                Ok(resolved) => return resolved,
                Err(err) => RenderWarning::new(WarningCode::MalformedDictionary, err.to_string())
                    .with_object(r.to_string()),
            },
            Err(err) => RenderWarning::new(WarningCode::MissingReference, err.to_string())
                .with_object(r.to_string()),
        },
        None => RenderWarning::new(WarningCode::MissingReference, "font not in page resources"),
    };
    let warning = failure.with_font(tag);
    warn!(tag, "{warning}");
    RenderResult::with_warnings(FontResource::fallback(tag), vec![warning])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, MemoStore};

    fn r(n: u32) -> ObjRef {
        ObjRef::new(n, 0)
    }

    const TO_UNICODE: &str = "/CIDInit /ProcSet findresource begin 12 dict begin begincmap \
        1 begincodespacerange <0000> <FFFF> endcodespacerange \
        1 beginbfrange <0001> <0003> <0041> endbfrange \
        endcmap end end";

    fn type0_store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.insert_object(
            r(10),
            "<< /Type /Font /Subtype /Type0 /BaseFont /ABCDEF+NotoSans /Encoding /Identity-H \
             /DescendantFonts [11 0 R] /ToUnicode 14 0 R >>",
        );
        store.insert_object(
            r(11),
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /ABCDEF+NotoSans \
             /W [1 [500 600] 10 12 700] /DW 900 /FontDescriptor 12 0 R >>",
        );
        store.insert_object(
            r(12),
            "<< /Type /FontDescriptor /FontName /ABCDEF+NotoSans /FontFile2 13 0 R >>",
        );
        store.insert_stream(r(13), "<< /Length 4 >>", b"\x00\x01\x00\x00".to_vec());
        store.insert_stream(r(14), "<< >>", TO_UNICODE.as_bytes().to_vec());
        store
    }

    fn resolve(store: &InMemoryStore, obj: u32) -> RenderResult<FontResource> {
        let text = store.dictionary_of(r(obj)).unwrap();
        resolve_font("F1", &text, store).unwrap()
    }

    #[test]
    fn subset_prefix_stripping() {
        assert_eq!(strip_subset_prefix("ABCDEF+Helvetica"), "Helvetica");
        assert_eq!(strip_subset_prefix("Helvetica"), "Helvetica");
        assert_eq!(strip_subset_prefix("ABCDE+Helvetica"), "ABCDE+Helvetica");
        assert_eq!(strip_subset_prefix("AbCDEF+Helvetica"), "AbCDEF+Helvetica");
    }

    #[test]
    fn type0_chain_is_resolved() {
        let store = type0_store();
        let result = resolve(&store, 10);
        assert!(result.is_clean(), "{:?}", result.warnings);
        let font = result.value;
        assert_eq!(font.subtype, FontSubtype::Type0);
        assert_eq!(font.family, "NotoSans");
        assert_eq!(font.base_name, "ABCDEF+NotoSans");
        assert_eq!(font.encoding_name.as_deref(), Some("Identity-H"));
        assert_eq!(font.writing_mode, WritingMode::Horizontal);
        assert_eq!(font.code_length, 2);
        assert_eq!(font.glyph_width(1), 500.0);
        assert_eq!(font.glyph_width(11), 700.0);
        assert_eq!(font.glyph_width(5), 900.0);
        let program = font.program.as_ref().unwrap();
        assert_eq!(program.format, FontFormat::TrueType);
        assert_eq!(program.len(), 4);
        assert_eq!(font.codes(&[0, 1, 0, 3]), vec![1, 3]);
        assert_eq!(font.decode_code(2), "B");
    }

    #[test]
    fn identity_v_is_vertical() {
        let mut store = type0_store();
        store.insert_object(
            r(10),
            "<< /Subtype /Type0 /BaseFont /X /Encoding /Identity-V /DescendantFonts [11 0 R] >>",
        );
        assert_eq!(resolve(&store, 10).value.writing_mode, WritingMode::Vertical);
    }

    #[test]
    fn missing_descriptor_degrades_program_only() {
        let mut store = type0_store();
        store.insert_object(
            r(11),
            "<< /Subtype /CIDFontType2 /W [1 [500]] /FontDescriptor 99 0 R >>",
        );
        let result = resolve(&store, 10);
        assert!(result.value.program.is_none());
        assert_eq!(result.value.glyph_width(1), 500.0);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].code, WarningCode::MissingReference);
        assert_eq!(result.warnings[0].object.as_deref(), Some("99 0 R"));
        assert_eq!(result.warnings[0].font_name.as_deref(), Some("F1"));
    }

    #[test]
    fn corrupt_to_unicode_is_absent_and_flagged() {
        let mut store = type0_store();
        store.insert_stream(r(14), "<< /Filter /FlateDecode >>", vec![0xFF; 10]);
        let result = resolve(&store, 10);
        assert!(result.value.to_unicode.is_none());
        assert_eq!(result.warnings[0].code, WarningCode::CorruptStream);
        // without a map, the code is its own code point
        assert_eq!(result.value.decode_code(0x41), "A");
    }

    #[test]
    fn malformed_cmap_is_absent_not_partial() {
        let mut store = type0_store();
        store.insert_stream(
            r(14),
            "<< >>",
            b"1 beginbfchar <0001> <0041> endbfchar 1 beginbfrange <0002> endbfrange".to_vec(),
        );
        let result = resolve(&store, 10);
        assert!(result.value.to_unicode.is_none());
        assert_eq!(result.warnings[0].code, WarningCode::MalformedDictionary);
    }

    #[test]
    fn malformed_w_keeps_default_width() {
        let mut store = type0_store();
        store.insert_object(r(11), "<< /Subtype /CIDFontType2 /W [1] /DW 750 >>");
        let result = resolve(&store, 10);
        assert!(result.value.widths.is_none());
        assert_eq!(result.value.glyph_width(1), 750.0);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn simple_truetype_with_widths_and_winansi() {
        let mut store = InMemoryStore::new();
        store.insert_object(
            r(1),
            "<< /Type /Font /Subtype /TrueType /BaseFont /Arial /FirstChar 32 /LastChar 34 \
             /Widths 3 0 R /Encoding /WinAnsiEncoding /FontDescriptor 2 0 R >>",
        );
        store.insert_object(r(2), "<< /Type /FontDescriptor /MissingWidth 250 >>");
        store.insert_object(r(3), "[278 278 355]");
        let result = resolve(&store, 1);
        assert!(result.is_clean());
        let font = result.value;
        assert_eq!(font.subtype, FontSubtype::TrueType);
        assert_eq!(font.code_length, 1);
        assert_eq!(font.glyph_width(34), 355.0);
        assert_eq!(font.glyph_width(65), 250.0);
        assert!(font.program.is_none());
        assert_eq!(font.decode_code(0x80), "\u{20AC}");
        assert_eq!(font.codes(b"AB"), vec![0x41, 0x42]);
    }

    #[test]
    fn fontfile3_subtype_selects_format() {
        let mut store = InMemoryStore::new();
        store.insert_object(r(1), "<< /Subtype /Type1 /BaseFont /Foo /FontDescriptor 2 0 R >>");
        store.insert_object(r(2), "<< /FontFile3 3 0 R >>");
        store.insert_stream(r(3), "<< /Subtype /Type1C >>", b"cff".to_vec());
        assert_eq!(
            resolve(&store, 1).value.program.unwrap().format,
            FontFormat::OpenType
        );
        store.insert_stream(r(3), "<< /Subtype /OpenType >>", b"otf".to_vec());
        assert_eq!(
            resolve(&store, 1).value.program.unwrap().format,
            FontFormat::Binary
        );
    }

    #[test]
    fn fontfile2_wins_over_fontfile() {
        let mut store = InMemoryStore::new();
        store.insert_object(r(1), "<< /Subtype /TrueType /BaseFont /Foo /FontDescriptor 2 0 R >>");
        store.insert_object(r(2), "<< /FontFile 3 0 R /FontFile2 4 0 R >>");
        store.insert_stream(r(3), "<< >>", b"t1".to_vec());
        store.insert_stream(r(4), "<< >>", b"ttf".to_vec());
        let program = resolve(&store, 1).value.program.unwrap();
        assert_eq!(program.format, FontFormat::TrueType);
        assert_eq!(&*program.bytes, b"ttf");
    }

    #[test]
    fn type3_has_no_program() {
        let mut store = InMemoryStore::new();
        store.insert_object(
            r(1),
            "<< /Subtype /Type3 /FontMatrix [0.01 0 0 0.01 0 0] /FirstChar 65 /Widths [50] \
             /FontDescriptor 2 0 R >>",
        );
        store.insert_object(r(2), "<< /FontFile 3 0 R >>");
        let font = resolve(&store, 1).value;
        assert_eq!(font.subtype, FontSubtype::Type3);
        assert!(font.program.is_none());
        assert_eq!(font.glyph_width(65), 500.0);
        assert_eq!(font.family, "F1");
    }

    #[test]
    fn type3_missing_widths_use_scaled_default() {
        let mut store = InMemoryStore::new();
        store.insert_object(
            r(1),
            "<< /Subtype /Type3 /FontMatrix [0.0005 0 0 0.0005 0 0] /FirstChar 65 /Widths [400] >>",
        );
        let font = resolve(&store, 1).value;
        assert_eq!(font.glyph_width(65), 200.0);
        assert_eq!(font.glyph_width(90), 500.0);
    }

    #[test]
    fn garbled_dictionary_is_an_error() {
        let store = InMemoryStore::new();
        assert!(resolve_font("F1", "not a dictionary", &store).is_err());
    }

    #[test]
    fn cache_resolves_each_tag_once() {
        let store = type0_store();
        let mut cache = FontCache::new();
        let entry = FontEntry::Reference(r(10));
        let first = cache.get_or_resolve("F1", Some(&entry), &store);
        let second = cache.get_or_resolve("F1", Some(&entry), &store);
        assert!(Arc::ptr_eq(&first.value, &second.value));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_falls_back_for_unknown_tag() {
        let store = InMemoryStore::new();
        let mut cache = FontCache::new();
        let result = cache.get_or_resolve("F9", None, &store);
        assert_eq!(result.value.family, "F9");
        assert_eq!(result.warnings[0].code, WarningCode::MissingReference);
        assert_eq!(result.value.code_length, 1);
    }

    #[test]
    fn preload_shares_descriptor_decodes() {
        let mut inner = type0_store();
        inner.insert_object(
            r(20),
            "<< /Subtype /Type0 /BaseFont /ABCDEF+NotoSans /Encoding /Identity-H \
             /DescendantFonts [11 0 R] >>",
        );
        let store = MemoStore::new(inner);
        let entries: BTreeMap<String, FontEntry> = [
            ("F1".to_string(), FontEntry::Reference(r(10))),
            ("F2".to_string(), FontEntry::Reference(r(20))),
            (
                "F3".to_string(),
                FontEntry::Inline(
                    parse_dictionary("<< /Subtype /Type1 /BaseFont /Helvetica >>").unwrap(),
                ),
            ),
        ]
        .into_iter()
        .collect();
        let mut cache = FontCache::new();
        let warnings = cache.preload(&entries, &store);
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(cache.len(), 3);
        let tags: Vec<String> = cache.fonts().iter().map(|f| f.tag.clone()).collect();
        assert_eq!(tags, ["F1", "F2", "F3"]);
        // font file 13 and ToUnicode 14: each decoded once
        assert_eq!(store.decoded_len(), 2);
        let f1 = cache.get("F1").unwrap();
        let f2 = cache.get("F2").unwrap();
        assert_eq!(f1.program, f2.program);
    }
}
