//! Graphics state stack for the content stream interpreter.
//!
//! A [`GraphicsFrame`] holds everything `q` saves: the CTM, path styling
//! and colors, the active color-space tags, and the text state. `Q` on an
//! empty stack leaves the state untouched.

use pdfpaint_core::{Color, Ctm, GraphicsState};

use crate::text_state::TextState;

/// Color space selected by `cs` / `CS`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColorSpaceTag {
    #[default]
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    Pattern,
    /// Resource name or any other family: three or more components read
    /// as RGB, fewer as gray.
    Other(String),
}

impl ColorSpaceTag {
    pub fn from_name(name: &str) -> Self {
        match name {
            "DeviceGray" | "G" | "CalGray" => ColorSpaceTag::DeviceGray,
            "DeviceRGB" | "RGB" | "CalRGB" => ColorSpaceTag::DeviceRgb,
            "DeviceCMYK" | "CMYK" => ColorSpaceTag::DeviceCmyk,
            "Pattern" => ColorSpaceTag::Pattern,
            other => ColorSpaceTag::Other(other.to_string()),
        }
    }

    /// Color a fresh selection of this space starts with.
    pub fn initial_color(&self) -> Color {
        Color::black()
    }

    /// Read `sc`/`scn` components in this space. `None` when there are too
    /// few for it.
    pub fn read_components(&self, components: &[f64]) -> Option<Color> {
        match (self, components) {
            (ColorSpaceTag::DeviceGray, [g, ..]) => Some(Color::gray(*g)),
            (ColorSpaceTag::DeviceRgb, [r, g, b, ..]) => Some(Color::new(*r, *g, *b)),
            (ColorSpaceTag::DeviceCmyk, [c, m, y, k, ..]) => Some(Color::from_cmyk(*c, *m, *y, *k)),
            (ColorSpaceTag::Pattern | ColorSpaceTag::Other(_), [r, g, b, ..]) => {
                Some(Color::new(*r, *g, *b))
            }
            (ColorSpaceTag::Pattern | ColorSpaceTag::Other(_), [g, ..]) => Some(Color::gray(*g)),
            _ => None,
        }
    }
}

/// Everything saved by `q` and restored by `Q`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphicsFrame {
    pub ctm: Ctm,
    pub style: GraphicsState,
    pub fill_space: ColorSpaceTag,
    pub stroke_space: ColorSpaceTag,
    pub text: TextState,
}

/// Current graphics state plus the `q` stack.
#[derive(Debug, Clone, Default)]
pub struct InterpreterState {
    current: GraphicsFrame,
    stack: Vec<GraphicsFrame>,
}

impl InterpreterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State starting from a given CTM.
    pub fn with_ctm(ctm: Ctm) -> Self {
        let mut state = Self::default();
        state.current.ctm = ctm;
        state
    }

    pub fn frame(&self) -> &GraphicsFrame {
        &self.current
    }

    pub fn ctm(&self) -> &Ctm {
        &self.current.ctm
    }

    pub fn style(&self) -> &GraphicsState {
        &self.current.style
    }

    pub fn style_mut(&mut self) -> &mut GraphicsState {
        &mut self.current.style
    }

    pub fn text(&self) -> &TextState {
        &self.current.text
    }

    pub fn text_mut(&mut self) -> &mut TextState {
        &mut self.current.text
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// `q`.
    pub fn save_state(&mut self) {
        self.stack.push(self.current.clone());
    }

    /// `Q`. Returns `false`, changing nothing, when the stack is empty.
    pub fn restore_state(&mut self) -> bool {
        match self.stack.pop() {
            Some(saved) => {
                self.current = saved;
                true
            }
            None => false,
        }
    }

    /// `cm`: the operand matrix applies in the current frame.
    pub fn concat_matrix(&mut self, m: &Ctm) {
        self.current.ctm = m.concat(&self.current.ctm);
    }

    /// `cs`: select a fill color space and reset the fill color.
    pub fn set_fill_space(&mut self, space: ColorSpaceTag) {
        self.current.style.fill_color = space.initial_color();
        self.current.fill_space = space;
    }

    /// `CS`.
    pub fn set_stroke_space(&mut self, space: ColorSpaceTag) {
        self.current.style.stroke_color = space.initial_color();
        self.current.stroke_space = space;
    }

    /// `rg`, `g`, `k`: set the fill color and the matching device space.
    pub fn set_fill_device_color(&mut self, color: Color, space: ColorSpaceTag) {
        self.current.style.fill_color = color;
        self.current.fill_space = space;
    }

    /// `RG`, `G`, `K`.
    pub fn set_stroke_device_color(&mut self, color: Color, space: ColorSpaceTag) {
        self.current.style.stroke_color = color;
        self.current.stroke_space = space;
    }

    /// `sc` / `scn`: components read in the active fill space. Returns
    /// `false` when the components give no color.
    pub fn set_fill_components(&mut self, components: &[f64]) -> bool {
        match self.current.fill_space.read_components(components) {
            Some(color) => {
                self.current.style.fill_color = color;
                true
            }
            None => false,
        }
    }

    /// `SC` / `SCN`.
    pub fn set_stroke_components(&mut self, components: &[f64]) -> bool {
        match self.current.stroke_space.read_components(components) {
            Some(color) => {
                self.current.style.stroke_color = color;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfpaint_core::{DashPattern, LineCap};

    #[test]
    fn initial_state() {
        let state = InterpreterState::new();
        assert_eq!(*state.ctm(), Ctm::identity());
        assert_eq!(state.stack_depth(), 0);
        assert_eq!(state.style().fill_color, Color::black());
        assert_eq!(state.frame().fill_space, ColorSpaceTag::DeviceGray);
    }

    #[test]
    fn restore_returns_exact_snapshot() {
        let mut state = InterpreterState::new();
        state.style_mut().line_width = 3.0;
        state.save_state();
        let saved = state.frame().clone();

        state.concat_matrix(&Ctm::new(2.0, 0.0, 0.0, 2.0, 5.0, 5.0));
        state.style_mut().line_cap = LineCap::Round;
        state.style_mut().dash = DashPattern::new(vec![3.0], 0.0);
        state.set_stroke_device_color(Color::new(1.0, 0.0, 0.0), ColorSpaceTag::DeviceRgb);
        state.text_mut().font_size = 24.0;

        assert!(state.restore_state());
        assert_eq!(*state.frame(), saved);
    }

    #[test]
    fn unbalanced_restore_is_inert() {
        let mut state = InterpreterState::new();
        state.concat_matrix(&Ctm::translation(10.0, 0.0));
        let before = state.frame().clone();
        assert!(!state.restore_state());
        assert!(!state.restore_state());
        assert_eq!(*state.frame(), before);
        assert_eq!(state.stack_depth(), 0);
    }

    #[test]
    fn nested_save_restore() {
        let mut state = InterpreterState::new();
        state.save_state();
        state.concat_matrix(&Ctm::translation(1.0, 0.0));
        state.save_state();
        state.concat_matrix(&Ctm::translation(1.0, 0.0));
        assert_eq!(state.ctm().e, 2.0);
        state.restore_state();
        assert_eq!(state.ctm().e, 1.0);
        state.restore_state();
        assert_eq!(state.ctm().e, 0.0);
    }

    #[test]
    fn cm_applies_operand_first() {
        let mut state = InterpreterState::new();
        state.concat_matrix(&Ctm::translation(100.0, 0.0));
        state.concat_matrix(&Ctm::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0));
        // scale in the translated frame: (1,0) -> (2,0) -> (102,0)
        let p = state.ctm().transform_point(pdfpaint_core::Point::new(1.0, 0.0));
        assert_eq!((p.x, p.y), (102.0, 0.0));
    }

    #[test]
    fn color_space_selection_resets_color() {
        let mut state = InterpreterState::new();
        state.set_fill_device_color(Color::new(0.0, 1.0, 0.0), ColorSpaceTag::DeviceRgb);
        state.set_fill_space(ColorSpaceTag::from_name("DeviceCMYK"));
        assert_eq!(state.style().fill_color, Color::black());
        assert_eq!(state.frame().fill_space, ColorSpaceTag::DeviceCmyk);
    }

    #[test]
    fn component_colors_follow_active_space() {
        let mut state = InterpreterState::new();
        state.set_fill_space(ColorSpaceTag::DeviceRgb);
        assert!(state.set_fill_components(&[0.0, 0.0, 1.0]));
        assert_eq!(state.style().fill_color, Color::new(0.0, 0.0, 1.0));
        state.set_stroke_space(ColorSpaceTag::DeviceCmyk);
        assert!(state.set_stroke_components(&[0.0, 0.0, 0.0, 1.0]));
        assert_eq!(state.style().stroke_color, Color::black());
        assert!(!state.set_fill_components(&[]));
    }

    #[test]
    fn too_few_components_for_space_change_nothing() {
        let mut state = InterpreterState::new();
        state.set_fill_space(ColorSpaceTag::DeviceCmyk);
        assert!(!state.set_fill_components(&[0.5, 0.5, 0.5]));
        assert_eq!(state.style().fill_color, Color::black());
    }

    #[test]
    fn named_space_reads_rgb_or_gray() {
        let cs0 = ColorSpaceTag::from_name("CS0");
        assert_eq!(
            cs0.read_components(&[0.2, 0.4, 0.6, 0.1]),
            Some(Color::new(0.2, 0.4, 0.6))
        );
        assert_eq!(cs0.read_components(&[0.5]), Some(Color::gray(0.5)));
        assert_eq!(
            ColorSpaceTag::DeviceGray.read_components(&[0.25]),
            Some(Color::gray(0.25))
        );
        assert_eq!(
            ColorSpaceTag::DeviceCmyk.read_components(&[0.0, 1.0, 1.0, 0.0]),
            Some(Color::new(1.0, 0.0, 0.0))
        );
        assert_eq!(ColorSpaceTag::Pattern.read_components(&[]), None);
    }

    #[test]
    fn tag_names() {
        assert_eq!(ColorSpaceTag::from_name("RGB"), ColorSpaceTag::DeviceRgb);
        assert_eq!(
            ColorSpaceTag::from_name("CS0"),
            ColorSpaceTag::Other("CS0".to_string())
        );
    }
}
