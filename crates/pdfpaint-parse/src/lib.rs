//! pdfpaint-parse: font resolution and content stream interpretation.
//!
//! This crate turns a page's content stream and resources into a
//! [`DisplayList`](pdfpaint_core::DisplayList). Objects come from an
//! [`ObjectStore`]; [`LopdfStore`] provides one over a lopdf document and
//! [`InMemoryStore`] one over hand-written objects. It depends on
//! pdfpaint-core for the shared data types.

pub mod cmap;
pub mod decode;
pub mod dictionary;
pub mod encoding;
pub mod error;
pub mod font;
pub mod image;
pub mod interpreter;
pub mod interpreter_state;
pub mod lopdf_store;
pub mod page;
pub mod store;
pub mod text_state;
pub mod tokenizer;
pub mod widths;

pub use error::{BackendError, ImageError, StoreError};
pub use font::{FontCache, FontEntry, FontResource};
pub use interpreter::{PageContext, render_content};
pub use lopdf_store::LopdfStore;
pub use page::{PageInput, PageResources, RenderedPage, render_page};
pub use pdfpaint_core;
pub use store::{InMemoryStore, MemoStore, ObjRef, ObjectStore};
