//! The display list: an ordered, backend-agnostic sequence of paint items.
//!
//! Every coordinate stored here is in output space: origin at the top-left
//! of the page, y growing downward, units of PDF points.

use crate::geometry::{BBox, Ctm, Point};
use crate::painting::{Color, DashPattern, FillRule, LineCap, LineJoin, PaintMode, PaintedPath};
use crate::path::Path;
use crate::raster::RasterBuffer;

/// A painted vector path.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathItem {
    pub path: Path,
    pub paint: PaintMode,
    pub fill_rule: FillRule,
    pub fill_color: Color,
    pub stroke_color: Color,
    /// Line width scaled into output units.
    pub line_width: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
    /// Dash lengths scaled into output units.
    pub dash: DashPattern,
}

impl PathItem {
    /// Convert a path painted in PDF device space into an output item.
    ///
    /// `ctm` is the transform active at paint time; its mean scale converts
    /// line widths and dash lengths.
    pub fn from_painted(painted: PaintedPath, ctm: &Ctm, page_height: f64) -> Self {
        let scale = ctm.mean_scale();
        let style = painted.style;
        PathItem {
            path: painted.path.transformed(&Ctm::y_flip(page_height)),
            paint: painted.mode,
            fill_rule: painted.fill_rule,
            fill_color: style.fill_color,
            stroke_color: style.stroke_color,
            line_width: style.line_width * scale,
            line_cap: style.line_cap,
            line_join: style.line_join,
            miter_limit: style.miter_limit,
            dash: style.dash.scaled(scale),
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.path.bbox()
    }
}

/// Writing direction of a text run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WritingMode {
    #[default]
    Horizontal,
    Vertical,
}

/// One sub-string of a text run and its offset from the run origin, in
/// output units along the run's baseline direction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextSegment {
    pub offset: f64,
    pub text: String,
}

/// A positioned text run: one per `Tj`, `'`, `"`, or `TJ`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextItem {
    /// Baseline origin of the first glyph.
    pub position: Point,
    pub rotation_degrees: f64,
    pub font_family: String,
    /// Font size in output units.
    pub font_size: f64,
    pub color: Color,
    /// Concatenation of all segment texts.
    pub text: String,
    pub segments: Vec<TextSegment>,
    pub writing_mode: WritingMode,
    /// Render mode 3: laid out but not painted.
    pub invisible: bool,
}

/// A positioned raster image.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageItem {
    /// XObject name, or `inline-N` for the N-th inline image.
    pub name: String,
    /// Maps the unit square, with (0,0) at the image's top-left pixel and
    /// (1,1) at its bottom-right, into output space.
    pub transform: Ctm,
    pub bbox: BBox,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub raster: RasterBuffer,
}

impl ImageItem {
    /// Place an image drawn under `ctm` on a page of `page_height`.
    ///
    /// PDF images fill the unit square with row 0 at `y = 1`; the stored
    /// transform flips that so row 0 lands at `v = 0`.
    pub fn place(name: impl Into<String>, ctm: &Ctm, page_height: f64, raster: RasterBuffer) -> Self {
        let image_rows = Ctm::new(1.0, 0.0, 0.0, -1.0, 0.0, 1.0);
        let transform = image_rows
            .concat(ctm)
            .concat(&Ctm::y_flip(page_height));
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        ]
        .map(|p| transform.transform_point(p));
        let bbox = BBox::from_points(corners).unwrap_or(BBox::new(0.0, 0.0, 0.0, 0.0));
        ImageItem {
            name: name.into(),
            transform,
            bbox,
            pixel_width: raster.width,
            pixel_height: raster.height,
            raster,
        }
    }
}

/// One entry of a display list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum DisplayItem {
    Path(PathItem),
    Text(TextItem),
    Image(ImageItem),
}

/// Ordered display items; insertion order is paint order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayList {
    pub items: Vec<DisplayItem>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DisplayItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DisplayItem> {
        self.items.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathItem> {
        self.items.iter().filter_map(|item| match item {
            DisplayItem::Path(p) => Some(p),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextItem> {
        self.items.iter().filter_map(|item| match item {
            DisplayItem::Text(t) => Some(t),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageItem> {
        self.items.iter().filter_map(|item| match item {
            DisplayItem::Image(i) => Some(i),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a DisplayList {
    type Item = &'a DisplayItem;
    type IntoIter = std::slice::Iter<'a, DisplayItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
