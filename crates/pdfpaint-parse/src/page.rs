//! Page-level rendering: resource lookup, font preloading, and the content
//! stream pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use pdfpaint_core::{DisplayList, RenderOptions, RenderResult, RenderWarning, WarningCode};
use tracing::{debug, warn};

use crate::dictionary::{Dictionary, PdfObject, parse_dictionary};
use crate::font::{FontCache, FontEntry, FontResource};
use crate::interpreter::{PageContext, interpret};
use crate::store::{ObjRef, ObjectStore};

/// Named resources a content stream can refer to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResources {
    /// `/Font`: tag → font dictionary.
    pub fonts: BTreeMap<String, FontEntry>,
    /// `/XObject`: name → stream object.
    pub xobjects: BTreeMap<String, ObjRef>,
    /// `/ExtGState`: name → parameter dictionary.
    pub extgstates: BTreeMap<String, Dictionary>,
}

impl PageResources {
    /// Read a `/Resources` dictionary given as PDF text. Empty text means
    /// no resources.
    pub fn parse<S: ObjectStore + ?Sized>(text: &str, store: &S) -> RenderResult<Self> {
        if text.trim().is_empty() {
            return RenderResult::ok(Self::default());
        }
        match parse_dictionary(text) {
            Some(dict) => Self::from_dictionary(&dict, store),
            None => {
                let warning = RenderWarning::new(
                    WarningCode::MalformedDictionary,
                    "/Resources is not a dictionary",
                );
                warn!("{warning}");
                RenderResult::with_warnings(Self::default(), vec![warning])
            }
        }
    }

    /// Collect the resources of an already parsed dictionary, following
    /// references to the category dictionaries through `store`.
    pub fn from_dictionary<S: ObjectStore + ?Sized>(dict: &Dictionary, store: &S) -> RenderResult<Self> {
        let mut reader = ResourceReader {
            store,
            warnings: Vec::new(),
        };
        let mut resources = Self::default();

        if let Some(fonts) = reader.category(dict, "Font") {
            for (tag, value) in fonts.iter() {
                match value {
                    PdfObject::Reference(r) => {
                        resources
                            .fonts
                            .insert(tag.to_string(), FontEntry::Reference(*r));
                    }
                    PdfObject::Dictionary(d) => {
                        resources
                            .fonts
                            .insert(tag.to_string(), FontEntry::Inline(d.clone()));
                    }
                    _ => reader.malformed(format!("/Font /{tag} is neither a dictionary nor a reference")),
                }
            }
        }

        if let Some(xobjects) = reader.category(dict, "XObject") {
            for (name, value) in xobjects.iter() {
                match value.as_reference() {
                    Some(r) => {
                        resources.xobjects.insert(name.to_string(), r);
                    }
                    None => reader.malformed(format!("/XObject /{name} is not a reference")),
                }
            }
        }

        if let Some(states) = reader.category(dict, "ExtGState") {
            for (name, value) in states.iter() {
                if let Some(params) = reader.dictionary(value, name) {
                    resources.extgstates.insert(name.to_string(), params);
                }
            }
        }

        RenderResult::with_warnings(resources, reader.warnings)
    }
}

struct ResourceReader<'a, S: ?Sized> {
    store: &'a S,
    warnings: Vec<RenderWarning>,
}

impl<S: ObjectStore + ?Sized> ResourceReader<'_, S> {
    fn category(&mut self, dict: &Dictionary, key: &str) -> Option<Dictionary> {
        let value = dict.get(key)?;
        self.dictionary(value, key)
    }

    fn dictionary(&mut self, value: &PdfObject, key: &str) -> Option<Dictionary> {
        match value {
            PdfObject::Dictionary(d) => Some(d.clone()),
            PdfObject::Reference(r) => match self.store.dictionary_of(*r) {
                Ok(text) => {
                    let parsed = parse_dictionary(&*text);
                    if parsed.is_none() {
                        self.push(
                            RenderWarning::new(
                                WarningCode::MalformedDictionary,
                                format!("/{key} is not a dictionary"),
                            )
                            .with_object(r.to_string()),
                        );
                    }
                    parsed
                }
                Err(err) => {
                    self.push(
                        RenderWarning::new(err.warning_code(), format!("/{key}: {err}"))
                            .with_object(r.to_string()),
                    );
                    None
                }
            },
            _ => {
                self.malformed(format!("/{key} is not a dictionary"));
                None
            }
        }
    }

    fn malformed(&mut self, description: String) {
        self.push(RenderWarning::new(WarningCode::MalformedDictionary, description));
    }

    fn push(&mut self, warning: RenderWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }
}

/// Everything needed to render one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageInput {
    /// y coordinate of the page's top edge in PDF space; output y is
    /// `page_height - y`.
    pub page_height: f64,
    /// PDF text of the `/Resources` dictionary.
    pub resources_text: String,
    /// Decoded content stream bytes.
    pub content: Vec<u8>,
}

/// A rendered page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub display_list: DisplayList,
    /// Every font the page declares, ordered by tag, for registration by
    /// the caller.
    pub fonts: Vec<Arc<FontResource>>,
    /// Set when the content was cut short: byte or operator limit, or
    /// unreadable syntax.
    pub truncated: Option<String>,
}

/// Render one page to a display list.
///
/// All declared fonts are resolved before interpretation starts. Wrap
/// `store` in [`MemoStore`](crate::MemoStore) so objects shared between
/// fonts are decoded once.
pub fn render_page<S: ObjectStore>(
    store: &S,
    page: &PageInput,
    options: &RenderOptions,
) -> RenderResult<RenderedPage> {
    let RenderResult {
        value: resources,
        mut warnings,
    } = PageResources::parse(&page.resources_text, store);

    let mut fonts = FontCache::new();
    warnings.extend(fonts.preload(&resources.fonts, store));

    let mut truncated = None;
    let mut content = page.content.as_slice();
    if content.len() > options.max_stream_bytes {
        let reason = format!(
            "content stream of {} bytes exceeds the limit of {}",
            content.len(),
            options.max_stream_bytes
        );
        let warning = RenderWarning::new(WarningCode::ResourceLimitReached, reason.clone());
        warn!("{warning}");
        warnings.push(warning);
        truncated = Some(reason);
        content = &content[..options.max_stream_bytes];
    }

    let ctx = PageContext {
        store,
        page_height: page.page_height,
        resources: &resources,
    };
    let run = interpret(content, &ctx, &mut fonts, options);
    warnings.extend(run.warnings);
    let truncated = truncated.or(run.stopped_early);

    debug!(
        items = run.list.len(),
        fonts = fonts.len(),
        warnings = warnings.len(),
        truncated = truncated.is_some(),
        "rendered page"
    );

    let rendered = RenderedPage {
        display_list: run.list,
        fonts: fonts.fonts(),
        truncated,
    };
    if options.collect_warnings {
        RenderResult::with_warnings(rendered, warnings)
    } else {
        RenderResult::ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, MemoStore};

    fn r(n: u32) -> ObjRef {
        ObjRef::new(n, 0)
    }

    #[test]
    fn empty_resources() {
        let result = PageResources::parse("", &InMemoryStore::new());
        assert!(result.is_clean());
        assert_eq!(result.value, PageResources::default());
    }

    #[test]
    fn resources_follow_references() {
        let mut store = InMemoryStore::new();
        store.insert_object(r(10), "<< /F1 11 0 R /F2 << /Subtype /Type1 /BaseFont /Courier >> >>");
        store.insert_object(r(20), "<< /LW 3 >>");
        let result = PageResources::parse(
            "<< /Font 10 0 R /XObject << /Im1 12 0 R >> /ExtGState << /GS1 20 0 R /GS2 << /LC 1 >> >> >>",
            &store,
        );
        assert!(result.is_clean(), "{:?}", result.warnings);
        let resources = result.value;
        assert_eq!(resources.fonts["F1"], FontEntry::Reference(r(11)));
        assert!(matches!(resources.fonts["F2"], FontEntry::Inline(_)));
        assert_eq!(resources.xobjects["Im1"], r(12));
        assert_eq!(resources.extgstates["GS1"].get_f64("LW"), Some(3.0));
        assert_eq!(resources.extgstates["GS2"].get_i64("LC"), Some(1));
    }

    #[test]
    fn unresolvable_category_warns_and_continues() {
        let result = PageResources::parse(
            "<< /Font 99 0 R /XObject << /Im1 5 0 R /Bad 3 >> >>",
            &InMemoryStore::new(),
        );
        assert!(result.value.fonts.is_empty());
        assert_eq!(result.value.xobjects.len(), 1);
        let codes: Vec<_> = result.warnings.iter().map(|w| w.code.clone()).collect();
        assert_eq!(
            codes,
            vec![WarningCode::MissingReference, WarningCode::MalformedDictionary]
        );
    }

    #[test]
    fn render_page_returns_all_declared_fonts() {
        let mut store = InMemoryStore::new();
        store.insert_object(r(4), "<< /Type /Font /Subtype /Type1 /BaseFont /ABCDEF+Times-Roman >>");
        let page = PageInput {
            page_height: 792.0,
            resources_text: "<< /Font << /F1 4 0 R /F2 << /Subtype /Type1 /BaseFont /Courier >> >> >>"
                .to_string(),
            content: b"BT /F1 12 Tf 72 720 Td (Hello) Tj ET".to_vec(),
        };
        let store = MemoStore::new(store);
        let result = render_page(&store, &page, &RenderOptions::default());
        assert!(result.is_clean(), "{:?}", result.warnings);
        let rendered = result.value;
        assert!(rendered.truncated.is_none());
        let tags: Vec<_> = rendered.fonts.iter().map(|f| f.tag.as_str()).collect();
        assert_eq!(tags, vec!["F1", "F2"]);
        let text = rendered.display_list.texts().next().unwrap();
        assert_eq!(text.font_family, "Times-Roman");
        assert_eq!(text.position.y, 72.0);
    }

    #[test]
    fn byte_limit_truncates_content() {
        let page = PageInput {
            page_height: 100.0,
            resources_text: String::new(),
            content: b"0 0 m 1 1 l S 0 0 m 2 2 l S".to_vec(),
        };
        let options = RenderOptions {
            max_stream_bytes: 14,
            ..RenderOptions::default()
        };
        let result = render_page(&InMemoryStore::new(), &page, &options);
        assert_eq!(result.value.display_list.len(), 1);
        assert!(result.value.truncated.is_some());
        assert_eq!(result.warnings[0].code, WarningCode::ResourceLimitReached);
    }

    #[test]
    fn unreadable_syntax_marks_page_truncated() {
        let page = PageInput {
            page_height: 100.0,
            resources_text: String::new(),
            content: b"0 0 m 1 1 l S [ (open".to_vec(),
        };
        let result = render_page(&InMemoryStore::new(), &page, &RenderOptions::default());
        assert_eq!(result.value.display_list.len(), 1);
        assert!(result.value.truncated.is_some());
    }

    #[test]
    fn warnings_can_be_discarded() {
        let page = PageInput {
            page_height: 100.0,
            resources_text: "<< /Font << /F1 8 0 R >> >>".to_string(),
            content: b"BT /F1 10 Tf (x) Tj ET".to_vec(),
        };
        let options = RenderOptions {
            collect_warnings: false,
            ..RenderOptions::default()
        };
        let result = render_page(&InMemoryStore::new(), &page, &options);
        assert!(result.is_clean());
        assert_eq!(result.value.display_list.texts().count(), 1);
    }
}
