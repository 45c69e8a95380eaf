//! Formula Reference Helpers
//!
//! Resolves reference-kind tokens into cell ranges and assigns each resolved
//! reference a highlight color in the order it appears in the text.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use gridedit_config::REF_COLORS;
use gridedit_core::{CellAddress, CellRange};

pub use gridedit_core::column_index;

use crate::tokenizer::{Token, TokenKind};

// ============================================================================
// Types
// ============================================================================

/// A resolved reference: the cells it covers and the sheet it names, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedReference {
    pub range: CellRange,
    pub sheet_name: Option<String>,
}

/// A resolved reference located in the editing text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceToken {
    /// Endpoints as written; a single cell has `start == end`
    pub range: CellRange,
    pub sheet_name: Option<String>,
    pub start: usize,
    pub end: usize,
    /// Index into the reference palette, cycling in encounter order
    pub color_index: usize,
}

impl ReferenceToken {
    pub fn is_single_cell(&self) -> bool {
        self.range.is_single_cell()
    }
}

/// Number of distinct reference colors
pub const REF_COLOR_COUNT: usize = REF_COLORS.len();

// ============================================================================
// Parsing
// ============================================================================

fn cell_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)(?::\$?([A-Za-z]{1,3})\$?([0-9]+))?$")
            .expect("reference pattern must compile")
    })
}

/// Split an optional `Sheet!` / `'Quoted Sheet'!` prefix off a reference.
/// Returns None when a quoted prefix is malformed.
pub fn split_sheet_prefix(text: &str) -> Option<(Option<String>, &str)> {
    if let Some(quoted) = text.strip_prefix('\'') {
        // '' inside quotes is an escaped quote
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '\'' {
                name.push(c);
                continue;
            }
            if let Some((_, '\'')) = chars.peek() {
                name.push('\'');
                chars.next();
                continue;
            }
            let rest = quoted[i + 1..].strip_prefix('!')?;
            if name.is_empty() {
                return None;
            }
            return Some((Some(name), rest));
        }
        return None;
    }

    match text.split_once('!') {
        Some((name, rest)) if !name.is_empty() => Some((Some(name.to_string()), rest)),
        Some(_) => None,
        None => Some((None, text)),
    }
}

fn resolve_cell(letters: &str, digits: &str) -> Option<CellAddress> {
    let col = column_index(letters)?;
    let row: usize = digits.parse().ok()?;
    CellAddress::from_one_based(row, col)
}

/// Resolve reference text such as `A1`, `$A$1:$B$5`, `Sheet1!A1` or
/// `'My Sheet'!A1:B5`.
///
/// Partial or unsupported forms (a lone sheet qualifier, whole-column or
/// whole-row ranges) and out-of-bounds cells yield None.
pub fn parse_reference(text: &str) -> Option<ParsedReference> {
    let (sheet_name, body) = split_sheet_prefix(text)?;
    let caps = cell_range_re().captures(body)?;

    let start = resolve_cell(caps.get(1)?.as_str(), caps.get(2)?.as_str())?;
    let end = match (caps.get(3), caps.get(4)) {
        (Some(letters), Some(digits)) => resolve_cell(letters.as_str(), digits.as_str())?,
        _ => start,
    };

    Some(ParsedReference { range: CellRange::new(start, end), sheet_name })
}

/// Resolve every reference token, coloring the n-th resolved one `n % 8`.
/// Tokens that do not resolve are skipped and do not use up a color.
pub fn extract_references(tokens: &[Token]) -> Vec<ReferenceToken> {
    let mut references = Vec::new();

    for token in tokens.iter().filter(|t| t.kind == TokenKind::Reference) {
        let Some(parsed) = parse_reference(&token.text) else {
            continue;
        };
        let color_index = references.len() % REF_COLOR_COUNT;
        references.push(ReferenceToken {
            range: parsed.range,
            sheet_name: parsed.sheet_name,
            start: token.start,
            end: token.end,
            color_index,
        });
    }

    references
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn cell(a1: &str) -> CellAddress {
        CellAddress::parse_a1(a1).unwrap()
    }

    #[test]
    fn single_cells_and_ranges() {
        let r = parse_reference("B3").unwrap();
        assert_eq!(r.range, CellRange::single(cell("B3")));
        assert_eq!(r.sheet_name, None);

        let r = parse_reference("$a$1:B$5").unwrap();
        assert_eq!(r.range, CellRange::new(cell("A1"), cell("B5")));
    }

    #[test]
    fn sheet_prefixes() {
        let r = parse_reference("Sheet2!C4").unwrap();
        assert_eq!(r.sheet_name.as_deref(), Some("Sheet2"));

        let r = parse_reference("'My Sheet'!A1:B5").unwrap();
        assert_eq!(r.sheet_name.as_deref(), Some("My Sheet"));
        assert_eq!(r.range, CellRange::new(cell("A1"), cell("B5")));

        let r = parse_reference("'Bob''s'!A1").unwrap();
        assert_eq!(r.sheet_name.as_deref(), Some("Bob's"));
    }

    #[test]
    fn partial_and_out_of_bounds_fail() {
        assert_eq!(parse_reference("Sheet1!"), None);
        assert_eq!(parse_reference("'My Sheet'!"), None);
        assert_eq!(parse_reference("A:C"), None);
        assert_eq!(parse_reference("1:5"), None);
        assert_eq!(parse_reference("SU"), None);
        assert_eq!(parse_reference("XFE1"), None);
        assert_eq!(parse_reference("A1048577"), None);
        assert_eq!(parse_reference("A0"), None);
        assert_eq!(parse_reference("'unterminated!A1"), None);
        assert_eq!(parse_reference("!A1"), None);
        assert!(parse_reference("XFD1048576").is_some());
    }

    #[test]
    fn colors_follow_encounter_order() {
        let refs = extract_references(&tokenize("A1+B1+C1+D1+E1+F1+G1+H1+I1"));
        let colors: Vec<usize> = refs.iter().map(|r| r.color_index).collect();
        assert_eq!(colors, vec![0, 1, 2, 3, 4, 5, 6, 7, 0]);
    }

    #[test]
    fn unresolved_references_keep_colors_dense() {
        // SU and XFE1 are reference-kind tokens that do not resolve
        let refs = extract_references(&tokenize("A1+SU+XFE1+B2"));
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].range, CellRange::single(cell("B2")));
        assert_eq!(refs[1].color_index, 1, "skipped tokens must not use a color");
    }

    #[test]
    fn offsets_match_tokens() {
        let refs = extract_references(&tokenize("SUM(A1:B2, Sheet2!C3)"));
        assert_eq!(refs.len(), 2);
        assert_eq!((refs[0].start, refs[0].end), (4, 9));
        assert_eq!((refs[1].start, refs[1].end), (11, 20));
        assert!(!refs[0].is_single_cell());
        assert!(refs[1].is_single_cell());
    }
}
