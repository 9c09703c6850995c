//! Unicode normalization for emitted text runs.

use unicode_normalization::UnicodeNormalization;

use crate::display_list::{DisplayItem, DisplayList};

/// Unicode normalization form to apply to decoded text.
///
/// Different PDF producers map the same visual text to different code point
/// sequences (precomposed vs. decomposed accents, ligature code points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnicodeNorm {
    /// No normalization (default).
    #[default]
    None,
    /// Canonical Decomposition, followed by Canonical Composition (NFC).
    Nfc,
    /// Canonical Decomposition (NFD).
    Nfd,
    /// Compatibility Decomposition, followed by Canonical Composition (NFKC).
    Nfkc,
    /// Compatibility Decomposition (NFKD).
    Nfkd,
}

impl UnicodeNorm {
    /// Apply this normalization form to the given string.
    pub fn normalize(&self, text: &str) -> String {
        match self {
            UnicodeNorm::None => text.to_string(),
            UnicodeNorm::Nfc => text.nfc().collect(),
            UnicodeNorm::Nfd => text.nfd().collect(),
            UnicodeNorm::Nfkc => text.nfkc().collect(),
            UnicodeNorm::Nfkd => text.nfkd().collect(),
        }
    }
}

/// Normalize the text of every text item (and its segments) in place.
pub fn normalize_display_list(list: &mut DisplayList, norm: UnicodeNorm) {
    if norm == UnicodeNorm::None {
        return;
    }
    for item in &mut list.items {
        if let DisplayItem::Text(text) = item {
            text.text = norm.normalize(&text.text);
            for segment in &mut text.segments {
                segment.text = norm.normalize(&segment.text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_list::{TextItem, TextSegment, WritingMode};
    use crate::geometry::Point;
    use crate::painting::Color;

    fn text_item(text: &str) -> TextItem {
        TextItem {
            position: Point::new(0.0, 0.0),
            rotation_degrees: 0.0,
            font_family: "F".to_string(),
            font_size: 10.0,
            color: Color::black(),
            text: text.to_string(),
            segments: vec![TextSegment {
                offset: 0.0,
                text: text.to_string(),
            }],
            writing_mode: WritingMode::Horizontal,
            invisible: false,
        }
    }

    #[test]
    fn none_is_identity() {
        assert_eq!(UnicodeNorm::None.normalize("e\u{0301}"), "e\u{0301}");
    }

    #[test]
    fn nfc_composes() {
        assert_eq!(UnicodeNorm::Nfc.normalize("e\u{0301}"), "\u{00E9}");
    }

    #[test]
    fn nfd_decomposes() {
        assert_eq!(UnicodeNorm::Nfd.normalize("\u{00E9}"), "e\u{0301}");
    }

    #[test]
    fn nfkc_expands_ligatures() {
        assert_eq!(UnicodeNorm::Nfkc.normalize("\u{FB01}"), "fi");
        assert_eq!(UnicodeNorm::Nfkd.normalize("\u{FB01}"), "fi");
    }

    #[test]
    fn display_list_text_is_normalized() {
        let mut list = DisplayList::new();
        list.push(DisplayItem::Text(text_item("\u{FB01}ne")));
        normalize_display_list(&mut list, UnicodeNorm::Nfkc);
        let item = list.texts().next().unwrap();
        assert_eq!(item.text, "fine");
        assert_eq!(item.segments[0].text, "fine");
    }
}
