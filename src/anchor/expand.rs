//! Word-boundary expansion of selections

use std::ops::Range;

/// Characters that belong to a word
pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Grow a character range so it does not cut through a word
///
/// A boundary moves outward one character at a time while both the
/// character just inside it and the one just outside are word characters.
/// Boundaries already sitting next to whitespace or punctuation stay put.
/// Collapsed or out-of-range selections yield `None`.
pub fn expand_to_word(text: &str, range: Range<usize>) -> Option<Range<usize>> {
    let chars: Vec<char> = text.chars().collect();
    if range.start >= range.end || range.end > chars.len() {
        return None;
    }

    let mut start = range.start;
    while start > 0 && is_word_char(chars[start]) && is_word_char(chars[start - 1]) {
        start -= 1;
    }

    let mut end = range.end;
    while end < chars.len() && is_word_char(chars[end - 1]) && is_word_char(chars[end]) {
        end += 1;
    }

    Some(start..end)
}
