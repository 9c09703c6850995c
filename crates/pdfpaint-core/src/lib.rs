//! pdfpaint-core: backend-independent data types.
//!
//! This crate provides the display list produced by page rendering
//! ([`DisplayList`], [`PathItem`], [`TextItem`], [`ImageItem`]), the geometry
//! and painting primitives those items are built from, raster buffers,
//! embedded font programs with a caller-owned [`FontRegistry`], and the
//! error, warning, and option types shared by the parser crate.

pub mod display_list;
pub mod error;
pub mod font;
pub mod geometry;
pub mod painting;
pub mod path;
pub mod raster;
pub mod unicode_norm;

pub use display_list::{
    DisplayItem, DisplayList, ImageItem, PathItem, TextItem, TextSegment, WritingMode,
};
pub use error::{PdfError, RenderOptions, RenderResult, RenderWarning, WarningCode};
pub use font::{FontFormat, FontProgram, FontRegistry, RegistrationOutcome};
pub use geometry::{BBox, Ctm, Point};
pub use painting::{
    Color, DashPattern, FillRule, GraphicsState, LineCap, LineJoin, PaintMode, PaintedPath,
};
pub use path::{Path, PathBuilder, PathSegment};
pub use raster::{RasterBuffer, RasterData, expand_to_rgba};
pub use unicode_norm::{UnicodeNorm, normalize_display_list};
