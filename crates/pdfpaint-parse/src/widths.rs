//! Glyph width tables for composite (`/W`, `/DW`) and simple (`/Widths`)
//! fonts.
//!
//! Widths are in glyph space, 1/1000 of the font size.

use std::collections::HashMap;

use crate::dictionary::PdfObject;
use crate::error::BackendError;

/// Default width when a font declares none.
pub const DEFAULT_WIDTH: f64 = 1000.0;

/// Sparse code → width table.
///
/// List-form entries take precedence over range-form entries; among ranges
/// the last declared one wins.
#[derive(Debug, Clone, PartialEq)]
pub struct WidthTable {
    singles: HashMap<u32, f64>,
    ranges: Vec<(u32, u32, f64)>,
    default_width: f64,
}

impl WidthTable {
    /// Table with no explicit entries.
    pub fn uniform(default_width: f64) -> Self {
        Self {
            singles: HashMap::new(),
            ranges: Vec::new(),
            default_width,
        }
    }

    /// Build from a CID font's `/W` array and `/DW` value.
    ///
    /// `/W` alternates `c [w1 w2 ...]` (widths for `c`, `c+1`, ...) and
    /// `c_first c_last w` (one width for the whole span).
    ///
    /// # Errors
    ///
    /// Any element out of place rejects the whole array.
    pub fn from_cid_widths(
        w: &[PdfObject],
        default_width: Option<f64>,
    ) -> Result<Self, BackendError> {
        let mut table = Self::uniform(default_width.unwrap_or(DEFAULT_WIDTH));
        let mut i = 0;
        while i < w.len() {
            let first = code_of(&w[i])?;
            match w.get(i + 1) {
                Some(PdfObject::Array(list)) => {
                    for (offset, width) in list.iter().enumerate() {
                        let width = width.as_f64().ok_or_else(|| {
                            BackendError::Parse(format!("non-numeric width in /W list at {first}"))
                        })?;
                        let code = u32::try_from(offset)
                            .ok()
                            .and_then(|o| first.checked_add(o))
                            .ok_or_else(|| BackendError::Parse("/W list overflows".to_string()))?;
                        table.singles.insert(code, width);
                    }
                    i += 2;
                }
                Some(last) => {
                    let last = code_of(last)?;
                    let width = w.get(i + 2).and_then(PdfObject::as_f64).ok_or_else(|| {
                        BackendError::Parse(format!("/W range {first}..{last} has no width"))
                    })?;
                    if last < first {
                        return Err(BackendError::Parse(format!(
                            "/W range {first}..{last} is inverted"
                        )));
                    }
                    table.ranges.push((first, last, width));
                    i += 3;
                }
                None => {
                    return Err(BackendError::Parse(format!(
                        "/W entry {first} has no widths"
                    )));
                }
            }
        }
        Ok(table)
    }

    /// Build from a simple font's `/FirstChar` and `/Widths`.
    ///
    /// # Errors
    ///
    /// Non-numeric entries reject the array.
    pub fn from_simple_widths(
        first_char: u32,
        widths: &[PdfObject],
        missing_width: Option<f64>,
    ) -> Result<Self, BackendError> {
        let mut table = Self::uniform(missing_width.unwrap_or(DEFAULT_WIDTH));
        for (offset, width) in widths.iter().enumerate() {
            let width = width
                .as_f64()
                .ok_or_else(|| BackendError::Parse("non-numeric entry in /Widths".to_string()))?;
            let code = u32::try_from(offset)
                .ok()
                .and_then(|o| first_char.checked_add(o))
                .ok_or_else(|| BackendError::Parse("/Widths overflows".to_string()))?;
            table.singles.insert(code, width);
        }
        Ok(table)
    }

    /// Table with every width multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            singles: self.singles.iter().map(|(&c, &w)| (c, w * factor)).collect(),
            ranges: self
                .ranges
                .iter()
                .map(|&(lo, hi, w)| (lo, hi, w * factor))
                .collect(),
            default_width: self.default_width * factor,
        }
    }

    /// Explicitly declared width for `code`.
    pub fn explicit(&self, code: u32) -> Option<f64> {
        self.singles.get(&code).copied().or_else(|| {
            self.ranges
                .iter()
                .rev()
                .find(|(lo, hi, _)| (*lo..=*hi).contains(&code))
                .map(|(_, _, w)| *w)
        })
    }

    /// Width for `code`, falling back to the default width.
    pub fn width(&self, code: u32) -> f64 {
        self.explicit(code).unwrap_or(self.default_width)
    }

    pub fn default_width(&self) -> f64 {
        self.default_width
    }

    /// Number of list entries plus range spans.
    pub fn len(&self) -> usize {
        self.singles.len() + self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.ranges.is_empty()
    }
}

impl Default for WidthTable {
    fn default() -> Self {
        Self::uniform(DEFAULT_WIDTH)
    }
}

fn code_of(obj: &PdfObject) -> Result<u32, BackendError> {
    obj.as_i64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| BackendError::Parse(format!("expected character code, found {obj:?}")))
}
