//! [`ObjectStore`] over a document parsed by [lopdf](https://crates.io/crates/lopdf).
//!
//! lopdf materializes objects held in compressed object streams when the
//! file is loaded, so every object is addressable by its key. Objects are
//! written back to PDF syntax for the dictionary reader.

use std::fmt::Write as _;
use std::sync::Arc;

use lopdf::{Object, ObjectId};
use tracing::debug;

use crate::error::{BackendError, StoreError};
use crate::page::PageInput;
use crate::store::{ObjRef, ObjectStore};

/// A parsed PDF file.
pub struct LopdfStore {
    doc: lopdf::Document,
    /// Page object ids in page order.
    page_ids: Vec<ObjectId>,
}

impl std::fmt::Debug for LopdfStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LopdfStore")
            .field("page_count", &self.page_ids.len())
            .finish_non_exhaustive()
    }
}

impl LopdfStore {
    /// Parse a PDF file held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Parse`] for unreadable or encrypted files.
    pub fn load(bytes: &[u8]) -> Result<Self, BackendError> {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| BackendError::Parse(format!("failed to parse PDF: {e}")))?;
        Self::from_document(doc)
    }

    /// Wrap an already loaded document.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Parse`] when the document is encrypted.
    pub fn from_document(doc: lopdf::Document) -> Result<Self, BackendError> {
        if doc.is_encrypted() {
            return Err(BackendError::Parse(
                "encrypted documents are not supported".to_string(),
            ));
        }
        let page_ids = doc.get_pages().values().copied().collect();
        Ok(Self { doc, page_ids })
    }

    pub fn document(&self) -> &lopdf::Document {
        &self.doc
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Gather what [`render_page`](crate::render_page) needs for the page at
    /// 0-based `index`: inherited `/MediaBox` and `/Resources`, and all
    /// `/Contents` streams decoded and joined.
    ///
    /// # Errors
    ///
    /// Fails when the index is out of range, the page has no usable
    /// `/MediaBox`, or a content stream cannot be decoded.
    pub fn page(&self, index: usize) -> Result<PageInput, BackendError> {
        let &page_id = self.page_ids.get(index).ok_or_else(|| {
            BackendError::Parse(format!(
                "page index {index} out of range (0..{})",
                self.page_ids.len()
            ))
        })?;

        let media_box = self
            .inherited(page_id, b"MediaBox")?
            .and_then(|obj| self.resolve(obj).as_array().ok())
            .ok_or_else(|| BackendError::Parse("MediaBox not found on page or ancestors".into()))?;
        let page_height = page_top(media_box, |obj| self.resolve(obj))?;

        let resources_text = match self.inherited(page_id, b"Resources")? {
            Some(obj) => object_text(self.resolve(obj)),
            None => String::new(),
        };

        let content = self.page_content(page_id)?;
        debug!(index, page_height, content_bytes = content.len(), "loaded page");
        Ok(PageInput {
            page_height,
            resources_text,
            content,
        })
    }

    /// Follow a reference one level; anything else is returned as is.
    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            other => other,
        }
    }

    /// Look a key up on the page, then on its `/Parent` chain.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<&Object>, BackendError> {
        let mut current = page_id;
        // guards against /Parent cycles
        for _ in 0..64 {
            let dict = self
                .doc
                .get_object(current)
                .and_then(Object::as_dict)
                .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;
            if let Ok(value) = dict.get(key) {
                return Ok(Some(value));
            }
            match dict.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent) => current = parent,
                Err(_) => return Ok(None),
            }
        }
        Ok(None)
    }

    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>, BackendError> {
        let dict = self
            .doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;
        let Ok(contents) = dict.get(b"Contents") else {
            return Ok(Vec::new());
        };
        let ids: Vec<ObjectId> = match self.resolve(contents) {
            Object::Array(items) => items
                .iter()
                .filter_map(|item| item.as_reference().ok())
                .collect(),
            Object::Stream(_) => match contents {
                Object::Reference(id) => vec![*id],
                _ => Vec::new(),
            },
            _ => {
                return Err(BackendError::Parse(
                    "/Contents is not a stream or array".to_string(),
                ));
            }
        };
        let mut content = Vec::new();
        for id in ids {
            let bytes = self.decoded_stream_of(to_ref(id))?;
            if !content.is_empty() {
                content.push(b'\n');
            }
            content.extend_from_slice(&bytes);
        }
        Ok(content)
    }

    fn stream(&self, obj: ObjRef) -> Result<&lopdf::Stream, StoreError> {
        self.object(obj)?
            .as_stream()
            .map_err(|_| StoreError::NotAStream(obj))
    }

    fn object(&self, obj: ObjRef) -> Result<&Object, StoreError> {
        self.doc
            .get_object((obj.num, obj.generation))
            .map_err(|_| StoreError::MissingObject(obj))
    }
}

impl ObjectStore for LopdfStore {
    fn dictionary_of(&self, obj: ObjRef) -> Result<Arc<str>, StoreError> {
        Ok(object_text(self.object(obj)?).into())
    }

    fn decoded_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
        let stream = self.stream(obj)?;
        if stream.dict.get(b"Filter").is_err() {
            return Ok(stream.content.as_slice().into());
        }
        stream
            .decompressed_content()
            .map(Into::into)
            .map_err(|e| StoreError::Decode {
                object: obj,
                message: e.to_string(),
            })
    }

    fn raw_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
        Ok(self.stream(obj)?.content.as_slice().into())
    }
}

fn to_ref((num, generation): ObjectId) -> ObjRef {
    ObjRef::new(num, generation)
}

/// Upper y of a `/MediaBox`, the line output y is measured down from.
fn page_top<'a>(
    media_box: &'a [Object],
    resolve: impl Fn(&'a Object) -> &'a Object,
) -> Result<f64, BackendError> {
    let [_, y0, _, y1] = media_box else {
        return Err(BackendError::Parse(format!(
            "expected 4-element MediaBox, got {}",
            media_box.len()
        )));
    };
    let number = |obj: &'a Object| match resolve(obj) {
        Object::Integer(i) => Ok(*i as f64),
        Object::Real(r) => Ok(f64::from(*r)),
        other => Err(BackendError::Parse(format!("expected number, got {other:?}"))),
    };
    Ok(number(y0)?.max(number(y1)?))
}

/// PDF syntax of an object. Streams are written as their dictionary.
pub fn object_text(obj: &Object) -> String {
    let mut out = String::new();
    write_object(&mut out, obj);
    out
}

fn write_object(out: &mut String, obj: &Object) {
    match obj {
        Object::Null => out.push_str("null"),
        Object::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Object::Integer(i) => {
            let _ = write!(out, "{i}");
        }
        Object::Real(r) => {
            let _ = write!(out, "{r}");
        }
        Object::Name(name) => write_name(out, name),
        Object::String(bytes, _) => {
            out.push('<');
            for b in bytes {
                let _ = write!(out, "{b:02X}");
            }
            out.push('>');
        }
        Object::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_object(out, item);
            }
            out.push(']');
        }
        Object::Dictionary(dict) => write_dictionary(out, dict),
        Object::Stream(stream) => write_dictionary(out, &stream.dict),
        Object::Reference((num, generation)) => {
            let _ = write!(out, "{num} {generation} R");
        }
    }
}

fn write_dictionary(out: &mut String, dict: &lopdf::Dictionary) {
    out.push_str("<<");
    for (key, value) in dict.iter() {
        out.push(' ');
        write_name(out, key);
        out.push(' ');
        write_object(out, value);
    }
    out.push_str(" >>");
}

/// `/Name`, escaping delimiters, whitespace, and non-ASCII bytes as `#xx`.
fn write_name(out: &mut String, name: &[u8]) {
    out.push('/');
    for &b in name {
        let regular = b.is_ascii_graphic()
            && !matches!(
                b,
                b'#' | b'/' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'%'
            );
        if regular {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "#{b:02X}");
        }
    }
}
