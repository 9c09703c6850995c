//! Text state for the content stream interpreter.
//!
//! Tracks the text object (BT/ET), the current font and its size, spacing
//! parameters, and the text and line matrices moved by Td, TD, T*, Tm and
//! by glyph advances.

use std::sync::Arc;

use pdfpaint_core::{Ctm, Point};

use crate::font::FontResource;

/// Text rendering mode set by `Tr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextRenderMode {
    #[default]
    Fill,
    Stroke,
    FillStroke,
    /// Mode 3: glyphs are laid out but not painted.
    Invisible,
    FillClip,
    StrokeClip,
    FillStrokeClip,
    Clip,
}

impl TextRenderMode {
    pub fn from_i64(value: i64) -> Option<Self> {
        Some(match value {
            0 => Self::Fill,
            1 => Self::Stroke,
            2 => Self::FillStroke,
            3 => Self::Invisible,
            4 => Self::FillClip,
            5 => Self::StrokeClip,
            6 => Self::FillStrokeClip,
            7 => Self::Clip,
            _ => return None,
        })
    }

    /// Whether glyphs take the stroke color rather than the fill color.
    pub fn uses_stroke_color(&self) -> bool {
        matches!(self, Self::Stroke | Self::StrokeClip)
    }
}

/// Text parameters and matrices.
///
/// The whole value is part of a graphics state snapshot, so `q`/`Q`
/// restore the matrices as well as the parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    /// `Tc`, in unscaled text space units.
    pub char_spacing: f64,
    /// `Tw`, applied to single-byte code 32.
    pub word_spacing: f64,
    /// `Tz` as a fraction: 1.0 is 100%.
    pub h_scaling: f64,
    /// `TL`.
    pub leading: f64,
    /// `Ts`.
    pub rise: f64,
    pub render_mode: TextRenderMode,
    pub font: Option<Arc<FontResource>>,
    pub font_size: f64,
    text_matrix: Ctm,
    line_matrix: Ctm,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: TextRenderMode::default(),
            font: None,
            font_size: 0.0,
            text_matrix: Ctm::identity(),
            line_matrix: Ctm::identity(),
        }
    }
}

impl TextState {
    pub fn text_matrix(&self) -> &Ctm {
        &self.text_matrix
    }

    pub fn line_matrix(&self) -> &Ctm {
        &self.line_matrix
    }

    /// `BT`: both matrices back to identity.
    pub fn begin_text(&mut self) {
        self.text_matrix = Ctm::identity();
        self.line_matrix = Ctm::identity();
    }

    /// `Tf`.
    pub fn set_font(&mut self, font: Arc<FontResource>, size: f64) {
        self.font = Some(font);
        self.font_size = size;
    }

    /// `Tm`: replaces both matrices.
    pub fn set_text_matrix(&mut self, m: Ctm) {
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// `Td`: translate the line matrix and start the new line there.
    pub fn move_text_position(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Ctm::translation(tx, ty).concat(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// `TD`: `-ty TL` followed by `tx ty Td`.
    pub fn move_text_position_and_set_leading(&mut self, tx: f64, ty: f64) {
        self.leading = -ty;
        self.move_text_position(tx, ty);
    }

    /// `T*`.
    pub fn move_to_next_line(&mut self) {
        self.move_text_position(0.0, -self.leading);
    }

    /// Move the pen by a displacement in text space.
    pub fn advance(&mut self, tx: f64, ty: f64) {
        self.text_matrix = Ctm::translation(tx, ty).concat(&self.text_matrix);
    }

    /// Glyph-space to device-space matrix at the current pen position:
    /// `[Th 0 0 1 0 Trise] × Tm × CTM`.
    pub fn rendering_matrix(&self, ctm: &Ctm) -> Ctm {
        Ctm::new(self.h_scaling, 0.0, 0.0, 1.0, 0.0, self.rise)
            .concat(&self.text_matrix)
            .concat(ctm)
    }

    /// Pen position in device space.
    pub fn origin(&self, ctm: &Ctm) -> Point {
        self.rendering_matrix(ctm).transform_point(Point::new(0.0, 0.0))
    }

    /// Pen displacement for one glyph of `code` with glyph-space `width`.
    ///
    /// Horizontal: `(w/1000 * Tfs + Tc + Tw) * Th` along x. Vertical: one
    /// font size down, plus spacing, along y.
    pub fn glyph_advance(&self, width: f64, is_space: bool, vertical: bool) -> (f64, f64) {
        let spacing = self.char_spacing + if is_space { self.word_spacing } else { 0.0 };
        if vertical {
            (0.0, -self.font_size + spacing)
        } else {
            ((width / 1000.0 * self.font_size + spacing) * self.h_scaling, 0.0)
        }
    }

    /// Pen displacement for a `TJ` number, in thousandths of text space.
    pub fn adjustment(&self, amount: f64, vertical: bool) -> (f64, f64) {
        let shift = -amount / 1000.0 * self.font_size;
        if vertical {
            (0.0, shift)
        } else {
            (shift * self.h_scaling, 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn defaults() {
        let ts = TextState::default();
        assert_eq!(ts.h_scaling, 1.0);
        assert_eq!(ts.render_mode, TextRenderMode::Fill);
        assert!(ts.font.is_none());
        assert_eq!(*ts.text_matrix(), Ctm::identity());
    }

    #[test]
    fn td_composes_from_line_start() {
        let mut ts = TextState::default();
        ts.set_text_matrix(Ctm::new(2.0, 0.0, 0.0, 2.0, 100.0, 700.0));
        ts.advance(50.0, 0.0);
        ts.move_text_position(0.0, -14.0);
        // line matrix, not the advanced text matrix, is the base
        assert_approx(ts.text_matrix().e, 100.0);
        assert_approx(ts.text_matrix().f, 672.0);
        assert_eq!(ts.text_matrix(), ts.line_matrix());
    }

    #[test]
    fn td_upper_sets_leading() {
        let mut ts = TextState::default();
        ts.move_text_position_and_set_leading(5.0, -12.0);
        assert_approx(ts.leading, 12.0);
        ts.move_to_next_line();
        assert_approx(ts.text_matrix().e, 5.0);
        assert_approx(ts.text_matrix().f, -24.0);
    }

    #[test]
    fn begin_text_resets_matrices() {
        let mut ts = TextState::default();
        ts.set_text_matrix(Ctm::translation(3.0, 4.0));
        ts.begin_text();
        assert_eq!(*ts.text_matrix(), Ctm::identity());
        assert_eq!(*ts.line_matrix(), Ctm::identity());
    }

    #[test]
    fn horizontal_glyph_advance() {
        let mut ts = TextState::default();
        ts.font_size = 10.0;
        ts.char_spacing = 1.0;
        ts.word_spacing = 2.0;
        ts.h_scaling = 0.5;
        let (tx, ty) = ts.glyph_advance(500.0, false, false);
        assert_approx(tx, (5.0 + 1.0) * 0.5);
        assert_approx(ty, 0.0);
        let (tx, _) = ts.glyph_advance(500.0, true, false);
        assert_approx(tx, (5.0 + 3.0) * 0.5);
    }

    #[test]
    fn vertical_glyph_advance() {
        let mut ts = TextState::default();
        ts.font_size = 12.0;
        assert_eq!(ts.glyph_advance(1000.0, false, true), (0.0, -12.0));
    }

    #[test]
    fn tj_adjustment_shifts_pen() {
        let mut ts = TextState::default();
        ts.font_size = 10.0;
        let (tx, _) = ts.adjustment(-250.0, false);
        assert_approx(tx, 2.5);
        let (_, ty) = ts.adjustment(500.0, true);
        assert_approx(ty, -5.0);
    }

    #[test]
    fn rendering_matrix_includes_scale_rise_and_ctm() {
        let mut ts = TextState::default();
        ts.h_scaling = 0.5;
        ts.rise = 3.0;
        ts.set_text_matrix(Ctm::new(10.0, 0.0, 0.0, 10.0, 100.0, 200.0));
        let m = ts.rendering_matrix(&Ctm::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0));
        assert_approx(m.a, 10.0);
        assert_approx(m.d, 20.0);
        assert_approx(m.e, 200.0);
        assert_approx(m.f, 460.0);
        let o = ts.origin(&Ctm::identity());
        assert_approx(o.x, 100.0);
        assert_approx(o.y, 230.0);
    }

    #[test]
    fn render_mode_codes() {
        assert_eq!(TextRenderMode::from_i64(3), Some(TextRenderMode::Invisible));
        assert_eq!(TextRenderMode::from_i64(8), None);
        assert!(TextRenderMode::Stroke.uses_stroke_color());
        assert!(!TextRenderMode::FillStroke.uses_stroke_color());
    }
}
