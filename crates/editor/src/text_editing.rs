//! Character-offset text helpers.
//!
//! Every offset the editor hands out counts chars, not bytes, so overlays
//! and carets stay aligned on non-ASCII text.

use serde::Serialize;

/// Result of an edit computed from (text, caret): the new text and caret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextEdit {
    pub text: String,
    pub caret_offset: usize,
}

/// Length in chars
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Convert char index to byte offset (past-the-end maps to `s.len()`)
pub fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Convert byte offset to char index
pub fn byte_to_char(s: &str, byte_idx: usize) -> usize {
    let mut idx = byte_idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    s[..idx].chars().count()
}

/// Substring by char range, clamped to the text
pub fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let start_byte = char_to_byte(s, start);
    let end_byte = char_to_byte(s, end.max(start));
    &s[start_byte..end_byte]
}

/// Replace chars `[start, end)` with `insert`
pub fn splice(s: &str, start: usize, end: usize, insert: &str) -> String {
    let start_byte = char_to_byte(s, start);
    let end_byte = char_to_byte(s, end.max(start));
    let mut out = String::with_capacity(s.len() + insert.len());
    out.push_str(&s[..start_byte]);
    out.push_str(insert);
    out.push_str(&s[end_byte..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_char_based() {
        let s = "=é+A1";
        assert_eq!(char_len(s), 5);
        assert_eq!(char_to_byte(s, 2), 3);
        assert_eq!(char_to_byte(s, 99), s.len());
        assert_eq!(byte_to_char(s, 3), 2);
        // Inside the multi-byte char rounds down
        assert_eq!(byte_to_char(s, 2), 1);
    }

    #[test]
    fn slice_and_splice() {
        let s = "=ü(A1)";
        assert_eq!(char_slice(s, 3, 5), "A1");
        assert_eq!(char_slice(s, 5, 2), "");
        assert_eq!(splice(s, 3, 5, "B2:C3"), "=ü(B2:C3)");
        assert_eq!(splice("=", 1, 1, "A1"), "=A1");
        assert_eq!(splice("abc", 10, 12, "!"), "abc!");
    }
}
