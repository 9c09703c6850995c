//! Colors, line styles, and path painting operators.
//!
//! Implements the painting operators (S, s, f, F, f*, B, B*, b, b*, n)
//! that turn a constructed path into a [`PaintedPath`].

use crate::path::{Path, PathBuilder};

/// RGB color with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    /// Create a color, clamping each channel into `[0, 1]`.
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: clamp_unit(r),
            g: clamp_unit(g),
            b: clamp_unit(b),
        }
    }

    pub fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn gray(level: f64) -> Self {
        Self::new(level, level, level)
    }

    /// Naive DeviceCMYK conversion: `channel = 1 - min(1, primary + k)`.
    pub fn from_cmyk(c: f64, m: f64, y: f64, k: f64) -> Self {
        Self::new(
            1.0 - (c + k).min(1.0),
            1.0 - (m + k).min(1.0),
            1.0 - (y + k).min(1.0),
        )
    }

    /// `#rrggbb` form.
    pub fn to_hex(&self) -> String {
        let to_byte = |v: f64| (v * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            to_byte(self.r),
            to_byte(self.g),
            to_byte(self.b)
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Line cap style (`J` operator).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LineCap::Butt),
            1 => Some(LineCap::Round),
            2 => Some(LineCap::Square),
            _ => None,
        }
    }
}

/// Line join style (`j` operator).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LineJoin::Miter),
            1 => Some(LineJoin::Round),
            2 => Some(LineJoin::Bevel),
            _ => None,
        }
    }
}

/// Dash pattern (`d` operator). An empty array means a solid line.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DashPattern {
    pub array: Vec<f64>,
    pub phase: f64,
}

impl DashPattern {
    pub fn new(array: Vec<f64>, phase: f64) -> Self {
        Self { array, phase }
    }

    pub fn is_solid(&self) -> bool {
        self.array.is_empty()
    }

    /// Scale lengths into another coordinate space.
    pub fn scaled(&self, factor: f64) -> DashPattern {
        DashPattern {
            array: self.array.iter().map(|v| v * factor).collect(),
            phase: self.phase * factor,
        }
    }
}

/// Fill rule for path painting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FillRule {
    /// Nonzero winding number rule (default).
    #[default]
    NonZeroWinding,
    /// Even-odd rule.
    EvenOdd,
}

/// Which paint operations a path item requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaintMode {
    Fill,
    Stroke,
    FillAndStroke,
}

impl PaintMode {
    pub fn fills(&self) -> bool {
        matches!(self, PaintMode::Fill | PaintMode::FillAndStroke)
    }

    pub fn strokes(&self) -> bool {
        matches!(self, PaintMode::Stroke | PaintMode::FillAndStroke)
    }
}

/// Graphics state relevant to path painting.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    /// Line width in user space (default 1.0).
    pub line_width: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    /// Miter limit (default 10.0).
    pub miter_limit: f64,
    pub dash: DashPattern,
    pub stroke_color: Color,
    pub fill_color: Color,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            miter_limit: 10.0,
            dash: DashPattern::default(),
            stroke_color: Color::black(),
            fill_color: Color::black(),
        }
    }
}

/// A painted path: the result of a painting operator applied to a
/// constructed path, with the styling captured at paint time.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintedPath {
    pub path: Path,
    pub mode: PaintMode,
    /// Only meaningful when `mode` fills.
    pub fill_rule: FillRule,
    pub style: GraphicsState,
}

impl PathBuilder {
    fn paint(&mut self, mode: PaintMode, fill_rule: FillRule, gs: &GraphicsState) -> PaintedPath {
        PaintedPath {
            path: self.take_and_reset(),
            mode,
            fill_rule,
            style: gs.clone(),
        }
    }

    /// `S` operator: stroke the current path.
    pub fn stroke(&mut self, gs: &GraphicsState) -> PaintedPath {
        self.paint(PaintMode::Stroke, FillRule::NonZeroWinding, gs)
    }

    /// `s` operator: close the current subpath, then stroke.
    pub fn close_and_stroke(&mut self, gs: &GraphicsState) -> PaintedPath {
        self.close_path();
        self.stroke(gs)
    }

    /// `f` or `F` operator: fill using the nonzero winding rule.
    pub fn fill(&mut self, gs: &GraphicsState) -> PaintedPath {
        self.paint(PaintMode::Fill, FillRule::NonZeroWinding, gs)
    }

    /// `f*` operator: fill using the even-odd rule.
    pub fn fill_even_odd(&mut self, gs: &GraphicsState) -> PaintedPath {
        self.paint(PaintMode::Fill, FillRule::EvenOdd, gs)
    }

    /// `B` operator: fill (nonzero) then stroke.
    pub fn fill_and_stroke(&mut self, gs: &GraphicsState) -> PaintedPath {
        self.paint(PaintMode::FillAndStroke, FillRule::NonZeroWinding, gs)
    }

    /// `B*` operator: fill (even-odd) then stroke.
    pub fn fill_even_odd_and_stroke(&mut self, gs: &GraphicsState) -> PaintedPath {
        self.paint(PaintMode::FillAndStroke, FillRule::EvenOdd, gs)
    }

    /// `b` operator: equivalent to `h B`.
    pub fn close_fill_and_stroke(&mut self, gs: &GraphicsState) -> PaintedPath {
        self.close_path();
        self.fill_and_stroke(gs)
    }

    /// `b*` operator: equivalent to `h B*`.
    pub fn close_fill_even_odd_and_stroke(&mut self, gs: &GraphicsState) -> PaintedPath {
        self.close_path();
        self.fill_even_odd_and_stroke(gs)
    }

    /// `n` operator: discard the current path without painting.
    pub fn end_path(&mut self) {
        self.take_and_reset();
    }
}
