//! Content stream interpreter.
//!
//! Executes tokenized operators in document order against an
//! [`InterpreterState`] and emits [`DisplayItem`]s. Operands are read from
//! the end of each operator's operand list, so stray extra operands are
//! ignored and a shortfall skips the operator.

use pdfpaint_core::{
    Color, Ctm, DashPattern, DisplayItem, DisplayList, GraphicsState, ImageItem, LineCap,
    LineJoin, PaintedPath, PathBuilder, PathItem, Point, RenderOptions, RenderResult,
    RenderWarning, TextItem, TextSegment, WarningCode, normalize_display_list,
};
use tracing::{debug, trace, warn};

use crate::dictionary::{Dictionary, PdfObject, parse_dictionary};
use crate::font::{FontCache, FontResource};
use crate::image::decode_image;
use crate::interpreter_state::{ColorSpaceTag, InterpreterState};
use crate::page::PageResources;
use crate::store::{ObjRef, ObjectStore};
use crate::text_state::TextRenderMode;
use crate::tokenizer::{Operand, Operator, tokenize_partial};

/// What the interpreter needs from the page being rendered.
pub struct PageContext<'a> {
    pub store: &'a dyn ObjectStore,
    /// Height of the page box, used to flip y into output space.
    pub page_height: f64,
    pub resources: &'a PageResources,
}

/// Interpret a content stream into a display list.
///
/// Never fails: unresolved resources and undecodable images are skipped
/// with a warning. When the stream cannot be tokenized to the end, the
/// items built from the readable prefix are returned.
pub fn render_content(
    content: &[u8],
    ctx: &PageContext<'_>,
    fonts: &mut FontCache,
    options: &RenderOptions,
) -> RenderResult<DisplayList> {
    let run = interpret(content, ctx, fonts, options);
    let warnings = if options.collect_warnings {
        run.warnings
    } else {
        Vec::new()
    };
    RenderResult::with_warnings(run.list, warnings)
}

/// Outcome of one pass over a content stream.
pub(crate) struct ContentRun {
    pub list: DisplayList,
    pub warnings: Vec<RenderWarning>,
    /// Why execution stopped before the end of the stream, if it did.
    pub stopped_early: Option<String>,
}

pub(crate) fn interpret(
    content: &[u8],
    ctx: &PageContext<'_>,
    fonts: &mut FontCache,
    options: &RenderOptions,
) -> ContentRun {
    let (operators, error) = tokenize_partial(content);
    let mut interpreter = Interpreter::new(ctx, fonts, options);
    let mut stopped_early = None;

    for (index, op) in operators.iter().enumerate() {
        if index >= options.max_operators {
            let reason = format!("operator limit of {} reached", options.max_operators);
            interpreter.warn(
                RenderWarning::new(WarningCode::ResourceLimitReached, reason.clone())
                    .at_operator(index),
            );
            stopped_early = Some(reason);
            break;
        }
        interpreter.execute(index, op);
    }

    if stopped_early.is_none() {
        if let Some(err) = error {
            let reason = format!("content stream truncated: {err}");
            interpreter.warn(
                RenderWarning::new(WarningCode::TruncatedContent, reason.clone())
                    .at_operator(operators.len()),
            );
            stopped_early = Some(reason);
        }
    }

    let Interpreter {
        mut list, warnings, ..
    } = interpreter;
    normalize_display_list(&mut list, options.unicode_norm);
    ContentRun {
        list,
        warnings,
        stopped_early,
    }
}

/// One element of a shown string: bytes to decode or a `TJ` adjustment.
enum TextPiece<'o> {
    Bytes(&'o [u8]),
    Adjust(f64),
}

struct Interpreter<'c, 'p> {
    ctx: &'c PageContext<'p>,
    fonts: &'c mut FontCache,
    options: &'c RenderOptions,
    state: InterpreterState,
    builder: PathBuilder,
    list: DisplayList,
    warnings: Vec<RenderWarning>,
    in_text: bool,
    inline_images: usize,
}

impl<'c, 'p> Interpreter<'c, 'p> {
    fn new(ctx: &'c PageContext<'p>, fonts: &'c mut FontCache, options: &'c RenderOptions) -> Self {
        Self {
            ctx,
            fonts,
            options,
            state: InterpreterState::new(),
            builder: PathBuilder::new(Ctm::identity()),
            list: DisplayList::new(),
            warnings: Vec::new(),
            in_text: false,
            inline_images: 0,
        }
    }

    fn warn(&mut self, warning: RenderWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    fn execute(&mut self, index: usize, op: &Operator) {
        let operands = op.operands.as_slice();
        match op.name.as_str() {
            // --- Graphics state ---
            "q" => self.state.save_state(),
            "Q" => {
                if !self.state.restore_state() {
                    trace!(index, "Q without matching q ignored");
                }
                self.builder.set_ctm(*self.state.ctm());
            }
            "cm" => {
                if let Some(m) = numbers::<6>(operands).and_then(|v| Ctm::from_slice(&v)) {
                    self.state.concat_matrix(&m);
                    self.builder.set_ctm(*self.state.ctm());
                }
            }
            "w" => {
                if let Some([width]) = numbers::<1>(operands) {
                    self.state.style_mut().line_width = width;
                }
            }
            "J" => {
                if let Some(cap) = integer(operands).and_then(LineCap::from_code) {
                    self.state.style_mut().line_cap = cap;
                }
            }
            "j" => {
                if let Some(join) = integer(operands).and_then(LineJoin::from_code) {
                    self.state.style_mut().line_join = join;
                }
            }
            "M" => {
                if let Some([limit]) = numbers::<1>(operands) {
                    self.state.style_mut().miter_limit = limit;
                }
            }
            "d" => {
                if let Some([Operand::Array(array), phase]) = last_n(operands, 2) {
                    if let Some(phase) = phase.as_f64() {
                        let array = array.iter().filter_map(Operand::as_f64).collect();
                        self.state.style_mut().dash = DashPattern::new(array, phase);
                    }
                }
            }
            "gs" => {
                if let Some(name) = last_name(operands) {
                    self.apply_ext_gstate(index, name);
                }
            }

            // --- Color ---
            "g" => {
                if let Some([gray]) = numbers::<1>(operands) {
                    self.state
                        .set_fill_device_color(Color::gray(gray), ColorSpaceTag::DeviceGray);
                }
            }
            "G" => {
                if let Some([gray]) = numbers::<1>(operands) {
                    self.state
                        .set_stroke_device_color(Color::gray(gray), ColorSpaceTag::DeviceGray);
                }
            }
            "rg" => {
                if let Some([r, g, b]) = numbers::<3>(operands) {
                    self.state
                        .set_fill_device_color(Color::new(r, g, b), ColorSpaceTag::DeviceRgb);
                }
            }
            "RG" => {
                if let Some([r, g, b]) = numbers::<3>(operands) {
                    self.state
                        .set_stroke_device_color(Color::new(r, g, b), ColorSpaceTag::DeviceRgb);
                }
            }
            "k" => {
                if let Some([c, m, y, k]) = numbers::<4>(operands) {
                    self.state.set_fill_device_color(
                        Color::from_cmyk(c, m, y, k),
                        ColorSpaceTag::DeviceCmyk,
                    );
                }
            }
            "K" => {
                if let Some([c, m, y, k]) = numbers::<4>(operands) {
                    self.state.set_stroke_device_color(
                        Color::from_cmyk(c, m, y, k),
                        ColorSpaceTag::DeviceCmyk,
                    );
                }
            }
            "cs" => {
                if let Some(name) = last_name(operands) {
                    self.state.set_fill_space(ColorSpaceTag::from_name(name));
                }
            }
            "CS" => {
                if let Some(name) = last_name(operands) {
                    self.state.set_stroke_space(ColorSpaceTag::from_name(name));
                }
            }
            "sc" | "scn" => {
                self.state.set_fill_components(&color_components(operands));
            }
            "SC" | "SCN" => {
                self.state.set_stroke_components(&color_components(operands));
            }

            // --- Path construction ---
            "m" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    self.builder.move_to(x, y);
                }
            }
            "l" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    self.builder.line_to(x, y);
                }
            }
            "c" => {
                if let Some([x1, y1, x2, y2, x3, y3]) = numbers::<6>(operands) {
                    self.builder.curve_to(x1, y1, x2, y2, x3, y3);
                }
            }
            "v" => {
                if let Some([x2, y2, x3, y3]) = numbers::<4>(operands) {
                    self.builder.curve_to_v(x2, y2, x3, y3);
                }
            }
            "y" => {
                if let Some([x1, y1, x3, y3]) = numbers::<4>(operands) {
                    self.builder.curve_to_y(x1, y1, x3, y3);
                }
            }
            "h" => self.builder.close_path(),
            "re" => {
                if let Some([x, y, w, h]) = numbers::<4>(operands) {
                    self.builder.rectangle(x, y, w, h);
                }
            }

            // --- Path painting ---
            "S" => self.paint(PathBuilder::stroke),
            "s" => self.paint(PathBuilder::close_and_stroke),
            "f" | "F" => self.paint(PathBuilder::fill),
            "f*" => self.paint(PathBuilder::fill_even_odd),
            "B" => self.paint(PathBuilder::fill_and_stroke),
            "B*" => self.paint(PathBuilder::fill_even_odd_and_stroke),
            "b" => self.paint(PathBuilder::close_fill_and_stroke),
            "b*" => self.paint(PathBuilder::close_fill_even_odd_and_stroke),
            "n" => self.builder.end_path(),

            // --- Text state, valid anywhere ---
            "Tc" => {
                if let Some([spacing]) = numbers::<1>(operands) {
                    self.state.text_mut().char_spacing = spacing;
                }
            }
            "Tw" => {
                if let Some([spacing]) = numbers::<1>(operands) {
                    self.state.text_mut().word_spacing = spacing;
                }
            }
            "TL" => {
                if let Some([leading]) = numbers::<1>(operands) {
                    self.state.text_mut().leading = leading;
                }
            }
            "Ts" => {
                if let Some([rise]) = numbers::<1>(operands) {
                    self.state.text_mut().rise = rise;
                }
            }
            "Tr" => {
                if let Some(mode) = integer(operands).and_then(TextRenderMode::from_i64) {
                    self.state.text_mut().render_mode = mode;
                }
            }

            // --- Text objects ---
            "BT" => {
                self.in_text = true;
                self.state.text_mut().begin_text();
            }
            "ET" => self.in_text = false,
            name if !self.in_text && is_text_only(name) => {
                trace!(index, operator = name, "text operator outside BT ignored");
            }
            "Tf" => {
                if let Some([Operand::Name(tag), size]) = last_n(operands, 2) {
                    if let Some(size) = size.as_f64() {
                        self.select_font(index, tag, size);
                    }
                }
            }
            "Tm" => {
                if let Some(m) = numbers::<6>(operands).and_then(|v| Ctm::from_slice(&v)) {
                    self.state.text_mut().set_text_matrix(m);
                }
            }
            "Td" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.state.text_mut().move_text_position(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.state
                        .text_mut()
                        .move_text_position_and_set_leading(tx, ty);
                }
            }
            "T*" => self.state.text_mut().move_to_next_line(),
            "Tz" => {
                if let Some([scale]) = numbers::<1>(operands) {
                    self.state.text_mut().h_scaling = scale / 100.0;
                }
            }
            "Tj" => {
                if let Some(bytes) = operands.last().and_then(Operand::as_bytes) {
                    self.show_text(index, &[TextPiece::Bytes(bytes)]);
                }
            }
            "'" => {
                if let Some(bytes) = operands.last().and_then(Operand::as_bytes) {
                    self.next_line_for_quote();
                    self.show_text(index, &[TextPiece::Bytes(bytes)]);
                }
            }
            "\"" => {
                if let Some([aw, ac, text]) = last_n(operands, 3) {
                    if let (Some(aw), Some(ac), Some(bytes)) =
                        (aw.as_f64(), ac.as_f64(), text.as_bytes())
                    {
                        let text_state = self.state.text_mut();
                        text_state.word_spacing = aw;
                        text_state.char_spacing = ac;
                        self.next_line_for_quote();
                        self.show_text(index, &[TextPiece::Bytes(bytes)]);
                    }
                }
            }
            "TJ" => {
                if let Some(Operand::Array(elements)) = operands.last() {
                    let pieces: Vec<TextPiece<'_>> = elements
                        .iter()
                        .filter_map(|element| match element {
                            Operand::LiteralString(b) | Operand::HexString(b) => {
                                Some(TextPiece::Bytes(b))
                            }
                            other => other.as_f64().map(TextPiece::Adjust),
                        })
                        .collect();
                    self.show_text(index, &pieces);
                }
            }

            // --- XObjects and inline images ---
            "Do" => {
                if let Some(name) = last_name(operands) {
                    self.invoke_xobject(index, name);
                }
            }
            "BI" => {
                if let [Operand::Dictionary(entries), Operand::LiteralString(data)] = operands {
                    self.inline_image(index, entries, data);
                }
            }

            // Clipping, marked content, compatibility sections, shading
            _ => {}
        }
    }

    fn paint(&mut self, op: fn(&mut PathBuilder, &GraphicsState) -> PaintedPath) {
        if self.builder.is_empty() {
            return;
        }
        let painted = op(&mut self.builder, self.state.style());
        let item = PathItem::from_painted(painted, self.state.ctm(), self.ctx.page_height);
        self.list.push(DisplayItem::Path(item));
    }

    fn apply_ext_gstate(&mut self, index: usize, name: &str) {
        let Some(params) = self.ctx.resources.extgstates.get(name) else {
            self.warn(
                RenderWarning::new(
                    WarningCode::MissingReference,
                    format!("ExtGState /{name} not in page resources"),
                )
                .at_operator(index),
            );
            return;
        };
        let style = self.state.style_mut();
        if let Some(width) = params.get_f64("LW") {
            style.line_width = width;
        }
        if let Some(cap) = params.get_i64("LC").and_then(LineCap::from_code) {
            style.line_cap = cap;
        }
        if let Some(join) = params.get_i64("LJ").and_then(LineJoin::from_code) {
            style.line_join = join;
        }
        if let Some(limit) = params.get_f64("ML") {
            style.miter_limit = limit;
        }
        if let Some([PdfObject::Array(array), phase]) = params.get_array("D") {
            let array = array.iter().filter_map(PdfObject::as_f64).collect();
            style.dash = DashPattern::new(array, phase.as_f64().unwrap_or(0.0));
        }
    }

    fn select_font(&mut self, index: usize, tag: &str, size: f64) {
        let entry = self.ctx.resources.fonts.get(tag);
        let resolved = self.fonts.get_or_resolve(tag, entry, self.ctx.store);
        // already logged by the resolver
        self.warnings
            .extend(resolved.warnings.into_iter().map(|w| w.at_operator(index)));
        self.state.text_mut().set_font(resolved.value, size);
    }

    /// `'` and `"` move down by the font size; `TL` is not consulted.
    fn next_line_for_quote(&mut self) {
        let text = self.state.text_mut();
        let size = text.font_size;
        text.move_text_position(0.0, -size);
    }

    /// Lay out a shown string (or `TJ` array) and emit one text item.
    ///
    /// The pen advances even when the decoded text is empty.
    fn show_text(&mut self, index: usize, pieces: &[TextPiece<'_>]) {
        let Some(font) = self.state.text().font.clone() else {
            self.warn(
                RenderWarning::new(WarningCode::MissingReference, "text shown before Tf")
                    .at_operator(index),
            );
            return;
        };
        let ctm = *self.state.ctm();
        let start = self.state.text().rendering_matrix(&ctm);
        let text_to_device = self.state.text().text_matrix().concat(&ctm);
        let vertical = font.is_vertical();
        let axis_scale = if vertical {
            text_to_device.c.hypot(text_to_device.d)
        } else {
            text_to_device.a.hypot(text_to_device.b)
        };

        let (segments, pen) = self.lay_out(&font, pieces);
        trace!(index, pen, segments = segments.len(), "shown text");
        if segments.is_empty() {
            return;
        }

        let text_state = self.state.text();
        let color = if text_state.render_mode.uses_stroke_color() {
            self.state.style().stroke_color
        } else {
            self.state.style().fill_color
        };
        let output = start.concat(&Ctm::y_flip(self.ctx.page_height));
        let item = TextItem {
            position: Point::new(output.e, output.f),
            // subtracting from 0.0 keeps an unrotated run at +0.0
            rotation_degrees: 0.0 - start.b.atan2(start.a).to_degrees(),
            font_family: font.family.clone(),
            font_size: text_state.font_size * start.a.hypot(start.b),
            color,
            text: segments.iter().map(|(_, s)| s.as_str()).collect(),
            segments: segments
                .into_iter()
                .map(|(offset, text)| TextSegment {
                    offset: offset * axis_scale,
                    text,
                })
                .collect(),
            writing_mode: font.writing_mode,
            invisible: text_state.render_mode == TextRenderMode::Invisible,
        };
        self.list.push(DisplayItem::Text(item));
    }

    /// Decode and advance through the pieces. Returns each non-empty
    /// sub-string with its text-space offset from the start, and the total
    /// advance.
    fn lay_out(&mut self, font: &FontResource, pieces: &[TextPiece<'_>]) -> (Vec<(f64, String)>, f64) {
        let vertical = font.is_vertical();
        let text = self.state.text_mut();
        let along = |(tx, ty): (f64, f64)| if vertical { -ty } else { tx };
        let mut pen = 0.0;
        let mut segments = Vec::new();
        for piece in pieces {
            match piece {
                TextPiece::Adjust(amount) => {
                    let (tx, ty) = text.adjustment(*amount, vertical);
                    text.advance(tx, ty);
                    pen += along((tx, ty));
                }
                TextPiece::Bytes(bytes) => {
                    let offset = pen;
                    let mut decoded = String::new();
                    for code in font.codes(bytes) {
                        decoded.push_str(&font.decode_code(code));
                        let is_space = code == 32 && font.code_length == 1;
                        let (tx, ty) =
                            text.glyph_advance(font.glyph_width(code), is_space, vertical);
                        text.advance(tx, ty);
                        pen += along((tx, ty));
                    }
                    if !decoded.is_empty() {
                        segments.push((offset, decoded));
                    }
                }
            }
        }
        (segments, pen)
    }

    fn invoke_xobject(&mut self, index: usize, name: &str) {
        let Some(&obj) = self.ctx.resources.xobjects.get(name) else {
            self.warn(
                RenderWarning::new(
                    WarningCode::MissingReference,
                    format!("XObject /{name} not in page resources"),
                )
                .at_operator(index),
            );
            return;
        };
        let dict = match self.ctx.store.dictionary_of(obj) {
            Ok(text) => parse_dictionary(&*text),
            Err(err) => {
                self.store_warning(index, obj, &err.to_string(), err.warning_code());
                return;
            }
        };
        let Some(dict) = dict else {
            self.store_warning(
                index,
                obj,
                &format!("XObject /{name} has no dictionary"),
                WarningCode::MalformedDictionary,
            );
            return;
        };
        match dict.get_name("Subtype") {
            Some("Image") => {}
            Some("Form") => {
                debug!(index, name, "form XObject not drawn");
                return;
            }
            other => {
                debug!(index, name, subtype = ?other, "XObject of unknown subtype skipped");
                return;
            }
        }
        let data = match self.ctx.store.raw_stream_of(obj) {
            Ok(data) => data,
            Err(err) => {
                self.store_warning(index, obj, &err.to_string(), err.warning_code());
                return;
            }
        };
        self.place_image(index, name.to_string(), &dict, &data, Some(obj));
    }

    fn inline_image(&mut self, index: usize, entries: &[(String, Operand)], data: &[u8]) {
        self.inline_images += 1;
        let dict = entries_dictionary(entries);
        let name = format!("inline-{}", self.inline_images);
        self.place_image(index, name, &dict, data, None);
    }

    fn place_image(
        &mut self,
        index: usize,
        name: String,
        dict: &Dictionary,
        data: &[u8],
        obj: Option<ObjRef>,
    ) {
        match decode_image(dict, data, self.options) {
            Ok(raster) => {
                trace!(
                    index,
                    name = name.as_str(),
                    width = raster.width,
                    height = raster.height,
                    "image placed"
                );
                let item = ImageItem::place(name, self.state.ctm(), self.ctx.page_height, raster);
                self.list.push(DisplayItem::Image(item));
            }
            Err(err) => {
                let mut warning = RenderWarning::new(err.warning_code(), format!("image {name}: {err}"))
                    .at_operator(index);
                if let Some(obj) = obj {
                    warning = warning.with_object(obj.to_string());
                }
                self.warn(warning);
            }
        }
    }

    fn store_warning(&mut self, index: usize, obj: ObjRef, description: &str, code: WarningCode) {
        self.warn(
            RenderWarning::new(code, description)
                .at_operator(index)
                .with_object(obj.to_string()),
        );
    }
}

/// Operators that only take effect inside `BT` ... `ET`.
fn is_text_only(name: &str) -> bool {
    matches!(
        name,
        "Tf" | "Tm" | "Td" | "TD" | "T*" | "Tz" | "Tj" | "TJ" | "'" | "\""
    )
}

/// The last `n` operands, or `None` when fewer were given.
fn last_n(operands: &[Operand], n: usize) -> Option<&[Operand]> {
    operands.len().checked_sub(n).map(|start| &operands[start..])
}

/// The last `N` operands as numbers.
fn numbers<const N: usize>(operands: &[Operand]) -> Option<[f64; N]> {
    let tail = last_n(operands, N)?;
    let mut values = [0.0; N];
    for (slot, operand) in values.iter_mut().zip(tail) {
        *slot = operand.as_f64()?;
    }
    Some(values)
}

fn integer(operands: &[Operand]) -> Option<i64> {
    match operands.last()? {
        Operand::Integer(i) => Some(*i),
        Operand::Real(r) if r.fract() == 0.0 => Some(*r as i64),
        _ => None,
    }
}

fn last_name(operands: &[Operand]) -> Option<&str> {
    operands.last().and_then(Operand::as_name)
}

/// Trailing numeric operands of `sc`/`scn`, ignoring a final pattern name.
fn color_components(operands: &[Operand]) -> Vec<f64> {
    let numeric = match operands.split_last() {
        Some((Operand::Name(_), rest)) => rest,
        _ => operands,
    };
    let mut components: Vec<f64> = numeric
        .iter()
        .rev()
        .map_while(Operand::as_f64)
        .collect();
    components.reverse();
    components
}

fn entries_dictionary(entries: &[(String, Operand)]) -> Dictionary {
    let mut dict = Dictionary::new();
    for (key, value) in entries {
        dict.insert(key.clone(), operand_object(value));
    }
    dict
}

fn operand_object(operand: &Operand) -> PdfObject {
    match operand {
        Operand::Integer(i) => PdfObject::Integer(*i),
        Operand::Real(r) => PdfObject::Real(*r),
        Operand::Name(n) => PdfObject::Name(n.clone()),
        Operand::LiteralString(b) | Operand::HexString(b) => PdfObject::String(b.clone()),
        Operand::Array(items) => PdfObject::Array(items.iter().map(operand_object).collect()),
        Operand::Boolean(b) => PdfObject::Boolean(*b),
        Operand::Null => PdfObject::Null,
        Operand::Dictionary(entries) => PdfObject::Dictionary(entries_dictionary(entries)),
    }
}
