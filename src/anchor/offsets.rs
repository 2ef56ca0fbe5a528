//! Offsets into serialized element content
//!
//! Offsets count UTF-16 code units of an element's `inner_html`, so they
//! agree with anchors produced by browser clients.

use std::ops::Range;

use super::AnchorError;

/// Length of a string in UTF-16 code units
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Byte index of a UTF-16 offset, `None` when out of range or inside a
/// surrogate pair
pub fn utf16_to_byte(s: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for (byte, ch) in s.char_indices() {
        if units == offset {
            return Some(byte);
        }
        if units > offset {
            return None;
        }
        units += ch.len_utf16();
    }
    (units == offset).then_some(s.len())
}

/// Slice a string by UTF-16 offsets
pub fn utf16_slice(s: &str, range: Range<usize>) -> Option<&str> {
    if range.start > range.end {
        return None;
    }
    let start = utf16_to_byte(s, range.start)?;
    let end = utf16_to_byte(s, range.end)?;
    Some(&s[start..end])
}

/// Half-open `[start_offset, end_offset)` span of an element's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextAnchor {
    pub start_offset: usize,
    pub end_offset: usize,
}

impl TextAnchor {
    pub fn new(start_offset: usize, end_offset: usize) -> Result<Self, AnchorError> {
        if start_offset >= end_offset {
            return Err(AnchorError::InvalidRange {
                start: start_offset,
                end: end_offset,
            });
        }
        Ok(Self {
            start_offset,
            end_offset,
        })
    }

    /// Anchor for `selected` starting at a known offset
    pub fn at(start_offset: usize, selected: &str) -> Self {
        Self {
            start_offset,
            end_offset: start_offset + utf16_len(selected),
        }
    }

    /// Anchor of the first occurrence of `selected` in `container`
    pub fn locate(container: &str, selected: &str) -> Option<Self> {
        if selected.is_empty() {
            return None;
        }
        let byte = container.find(selected)?;
        Some(Self::at(utf16_len(&container[..byte]), selected))
    }

    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start_offset..self.end_offset
    }

    /// The part of `content` this anchor covers
    pub fn slice<'a>(&self, content: &'a str) -> Option<&'a str> {
        utf16_slice(content, self.range())
    }

    /// Check that `content` still holds `expected` at this anchor
    pub fn validate(&self, content: &str, expected: &str) -> Result<(), AnchorError> {
        match self.slice(content) {
            Some(found) if found == expected => Ok(()),
            _ => Err(AnchorError::Drift {
                start: self.start_offset,
                end: self.end_offset,
            }),
        }
    }

    /// Split `content` into the text before, inside and after the anchor
    pub fn split<'a>(&self, content: &'a str) -> Option<(&'a str, &'a str, &'a str)> {
        let start = utf16_to_byte(content, self.start_offset)?;
        let end = utf16_to_byte(content, self.end_offset)?;
        Some((&content[..start], &content[start..end], &content[end..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_positions() {
        let s = "a😀b";
        assert_eq!(utf16_len(s), 4);
        assert_eq!(utf16_to_byte(s, 0), Some(0));
        assert_eq!(utf16_to_byte(s, 1), Some(1));
        assert_eq!(utf16_to_byte(s, 2), None);
        assert_eq!(utf16_to_byte(s, 3), Some(5));
        assert_eq!(utf16_to_byte(s, 4), Some(6));
        assert_eq!(utf16_to_byte(s, 5), None);
        assert_eq!(utf16_slice(s, 1..3), Some("😀"));
    }

    #[test]
    fn test_locate_first_occurrence() {
        let anchor = TextAnchor::locate("the cat sat on the mat", "the").unwrap();
        assert_eq!(anchor, TextAnchor { start_offset: 0, end_offset: 3 });

        let anchor = TextAnchor::locate("é then cat", "cat").unwrap();
        assert_eq!(anchor.range(), 7..10);

        assert!(TextAnchor::locate("abc", "xyz").is_none());
        assert!(TextAnchor::locate("abc", "").is_none());
    }

    #[test]
    fn test_selection_at_start_is_valid() {
        let content = "cat on a mat";
        let anchor = TextAnchor::locate(content, "cat").unwrap();
        assert_eq!(anchor.start_offset, 0);
        assert!(anchor.validate(content, "cat").is_ok());
    }

    #[test]
    fn test_validate_detects_drift() {
        let anchor = TextAnchor::new(4, 7).unwrap();
        assert!(anchor.validate("the cat sat", "cat").is_ok());
        assert!(matches!(
            anchor.validate("the dog sat", "cat"),
            Err(AnchorError::Drift { start: 4, end: 7 })
        ));
        assert!(anchor.validate("the", "cat").is_err());
    }

    #[test]
    fn test_validate_compares_markup() {
        let content = "one <b>two</b> three";
        let anchor = TextAnchor::locate(content, "<b>two</b>").unwrap();
        assert_eq!(anchor.range(), 4..14);
        assert!(anchor.validate(content, "two").is_err());
    }

    #[test]
    fn test_invalid_range() {
        assert!(matches!(
            TextAnchor::new(5, 5),
            Err(AnchorError::InvalidRange { start: 5, end: 5 })
        ));
        assert!(TextAnchor::new(6, 2).is_err());
    }

    #[test]
    fn test_split() {
        let anchor = TextAnchor::new(4, 7).unwrap();
        assert_eq!(anchor.split("the cat sat"), Some(("the ", "cat", " sat")));
        assert_eq!(anchor.split("the"), None);
    }
}
