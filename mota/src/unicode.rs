//! Minimal Unicode properties: strong direction, script tags and the
//! combining-mark fallback used when a font carries no GDEF.

use read_otl::types::Tag;

use crate::buffer::Direction;

/// Ranges of the right-to-left scripts.
const RTL_RANGES: &[(u32, u32)] = &[
    (0x0590, 0x05FF),   // Hebrew
    (0x0600, 0x06FF),   // Arabic
    (0x0700, 0x074F),   // Syriac
    (0x0750, 0x077F),   // Arabic Supplement
    (0x0780, 0x07BF),   // Thaana
    (0x07C0, 0x07FF),   // NKo
    (0x0800, 0x083F),   // Samaritan
    (0x0840, 0x085F),   // Mandaic
    (0x08A0, 0x08FF),   // Arabic Extended-A
    (0xFB1D, 0xFB4F),   // Hebrew presentation forms
    (0xFB50, 0xFDFF),   // Arabic presentation forms A
    (0xFE70, 0xFEFF),   // Arabic presentation forms B
    (0x10800, 0x1091F), // Cypriot, Phoenician
    (0x1E800, 0x1EFFF), // Mende Kikakui, Adlam, Arabic Mathematical
];

/// Combining mark ranges consulted when no GDEF class is available.
const FALLBACK_MARK_RANGES: &[(u32, u32)] = &[
    (0x0300, 0x036F), // Combining Diacritical Marks
    (0x1AB0, 0x1AFF), // Combining Diacritical Marks Extended
    (0x1DC0, 0x1DFF), // Combining Diacritical Marks Supplement
    (0x20D0, 0x20FF), // Combining Diacritical Marks for Symbols
    (0xFE20, 0xFE2F), // Combining Half Marks
];

fn in_ranges(codepoint: u32, ranges: &[(u32, u32)]) -> bool {
    ranges
        .iter()
        .any(|&(start, end)| (start..=end).contains(&codepoint))
}

/// `true` if the code point is a combining mark per the fallback ranges.
pub(crate) fn is_fallback_mark(codepoint: u32) -> bool {
    in_ranges(codepoint, FALLBACK_MARK_RANGES)
}

/// The strong direction of a code point, if it has one.
pub(crate) fn strong_direction(codepoint: u32) -> Option<Direction> {
    if in_ranges(codepoint, RTL_RANGES) {
        return Some(Direction::RightToLeft);
    }
    if is_fallback_mark(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
        .filter(|ch| ch.is_alphabetic())
        .map(|_| Direction::LeftToRight)
}

/// A coarse code point to OpenType script tag mapping, enough to pick a
/// script record in common fonts.
pub(crate) fn script_tag(codepoint: u32) -> Option<Tag> {
    let tag: &[u8; 4] = match codepoint {
        0x0041..=0x024F => b"latn",
        0x0370..=0x03FF | 0x1F00..=0x1FFF => b"grek",
        0x0400..=0x052F => b"cyrl",
        0x0590..=0x05FF | 0xFB1D..=0xFB4F => b"hebr",
        0x0600..=0x06FF | 0x0750..=0x077F | 0xFB50..=0xFEFF => b"arab",
        0x0900..=0x097F => b"dev2",
        0x0E00..=0x0E7F => b"thai",
        _ => return None,
    };
    Some(Tag::new(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_classes() {
        assert_eq!(strong_direction('a' as u32), Some(Direction::LeftToRight));
        assert_eq!(strong_direction(0x05D0), Some(Direction::RightToLeft));
        assert_eq!(strong_direction(0x0627), Some(Direction::RightToLeft));
        assert_eq!(strong_direction('1' as u32), None);
        assert_eq!(strong_direction(0x0301), None);
    }

    #[test]
    fn mark_fallback_ranges() {
        assert!(is_fallback_mark(0x0301));
        assert!(is_fallback_mark(0x20E1));
        assert!(!is_fallback_mark('a' as u32));
    }
}
