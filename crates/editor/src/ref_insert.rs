//! Reference insertion while editing a formula: whether a grid click should
//! insert a reference, how that reference is written, and F4 cycling of
//! absolute markers.

use std::sync::OnceLock;

use regex::Regex;

use gridedit_core::CellRange;

use crate::text_editing::{byte_to_char, char_len, char_to_byte, TextEdit};
use crate::tokenizer::{tokenize, TokenKind};

/// True when the caret follows an operator, `(`, `,` or `;` (trailing
/// whitespace skipped), meaning a clicked cell should be inserted as a
/// reference rather than committing the formula.
pub fn is_insertion_point(text: &str, caret: usize) -> bool {
    let before = &text[..char_to_byte(text, caret)];
    match before.chars().rev().find(|c| !c.is_whitespace()) {
        Some(c) => matches!(c, '=' | '+' | '-' | '*' | '/' | '^' | '&' | '>' | '<' | '(' | ',' | ';'),
        None => false,
    }
}

/// Sheet names need quotes unless they are plain `[A-Za-z0-9_]` and do not
/// start with a digit.
pub fn needs_quoting(sheet_name: &str) -> bool {
    sheet_name.is_empty()
        || sheet_name.starts_with(|c: char| c.is_ascii_digit())
        || sheet_name.chars().any(|c| !(c.is_ascii_alphanumeric() || c == '_'))
}

/// Write a sheet name as a reference prefix: `Sheet2!` or `'My Sheet'!`
pub fn sheet_prefix(sheet_name: &str) -> String {
    if needs_quoting(sheet_name) {
        format!("'{}'!", sheet_name.replace('\'', "''"))
    } else {
        format!("{}!", sheet_name)
    }
}

/// Reference text for a range picked while editing on `current_sheet`.
/// The sheet qualifier is only written when the target is a different sheet.
pub fn build_reference_text(range: &CellRange, current_sheet: &str, target_sheet: Option<&str>) -> String {
    match target_sheet {
        Some(target) if target != current_sheet => format!("{}{}", sheet_prefix(target), range.to_a1()),
        _ => range.to_a1(),
    }
}

// ============================================================================
// F4 cycling
// ============================================================================

fn cell_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\$?)([A-Za-z]{1,3})(\$?)([0-9]+)").expect("cell reference pattern must compile")
    })
}

/// A cell reference found in the editing text (char offsets)
struct CellRefMatch {
    start: usize,
    end: usize,
    col_abs: bool,
    row_abs: bool,
    letters: String,
    digits: String,
}

/// Cells inside the formula's reference tokens. Text in strings, function
/// names and sheet qualifiers is never matched.
fn cell_refs(text: &str) -> Vec<CellRefMatch> {
    let Some(body) = text.strip_prefix('=') else {
        return Vec::new();
    };

    tokenize(body)
        .iter()
        .filter(|t| t.kind == TokenKind::Reference)
        .flat_map(|token| {
            let cells_from = token.text.rfind('!').map_or(0, |i| i + 1);
            let cells = &token.text[cells_from..];
            // +1 for the '='
            let base = token.start + 1 + char_len(&token.text[..cells_from]);

            cell_ref_re()
                .captures_iter(cells)
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    Some(CellRefMatch {
                        start: base + byte_to_char(cells, whole.start()),
                        end: base + byte_to_char(cells, whole.end()),
                        col_abs: caps.get(1).is_some_and(|m| !m.is_empty()),
                        letters: caps.get(2)?.as_str().to_string(),
                        row_abs: caps.get(3).is_some_and(|m| !m.is_empty()),
                        digits: caps.get(4)?.as_str().to_string(),
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// F4: cycle the cell reference at the caret through
/// `A1` -> `$A$1` -> `A$1` -> `$A1` -> `A1`.
///
/// Targets the reference containing the caret (either edge counts), else the
/// nearest one before it. None when there is nothing to cycle.
pub fn cycle_reference(text: &str, caret: usize) -> Option<TextEdit> {
    let caret = caret.min(char_len(text));
    let refs = cell_refs(text);

    let target = refs
        .iter()
        .find(|r| r.start <= caret && caret <= r.end)
        .or_else(|| refs.iter().filter(|r| r.end <= caret).last())?;

    let (col_abs, row_abs) = match (target.col_abs, target.row_abs) {
        (false, false) => (true, true),
        (true, true) => (false, true),
        (false, true) => (true, false),
        (true, false) => (false, false),
    };
    let replacement = format!(
        "{}{}{}{}",
        if col_abs { "$" } else { "" },
        target.letters,
        if row_abs { "$" } else { "" },
        target.digits,
    );

    let start_byte = char_to_byte(text, target.start);
    let end_byte = char_to_byte(text, target.end);
    let mut new_text = String::with_capacity(text.len() + 2);
    new_text.push_str(&text[..start_byte]);
    new_text.push_str(&replacement);
    new_text.push_str(&text[end_byte..]);

    let old_len = target.end - target.start;
    let new_len = char_len(&replacement);
    let caret_offset = if caret <= target.start {
        caret
    } else if caret <= target.end {
        target.start + new_len
    } else {
        caret + new_len - old_len
    };

    Some(TextEdit { text: new_text, caret_offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula_refs::parse_reference;
    use gridedit_core::CellAddress;

    #[test]
    fn insertion_after_operators_and_separators() {
        assert!(is_insertion_point("=", 1));
        assert!(is_insertion_point("=A1 + ", 6));
        assert!(is_insertion_point("=SUM(", 5));
        assert!(is_insertion_point("=SUM(A1,", 8));
        assert!(is_insertion_point("=SUM(A1;", 8));
        assert!(is_insertion_point("=A1<>", 5));
        assert!(is_insertion_point("=\"x\"&", 5));
    }

    #[test]
    fn no_insertion_after_values() {
        assert!(!is_insertion_point("=A1", 3));
        assert!(!is_insertion_point("=SUM(A1)", 8));
        assert!(!is_insertion_point("=12", 3));
        assert!(!is_insertion_point("", 0));
        assert!(!is_insertion_point("   ", 3));
        // Caret position matters, not the end of the text
        assert!(is_insertion_point("=A1+B1", 4));
    }

    #[test]
    fn same_sheet_is_unqualified() {
        let a1 = CellRange::single(CellAddress::new(0, 0));
        assert_eq!(build_reference_text(&a1, "Sheet1", None), "A1");
        assert_eq!(build_reference_text(&a1, "Sheet1", Some("Sheet1")), "A1");
    }

    #[test]
    fn other_sheet_is_qualified() {
        let range = CellRange::new(CellAddress::new(0, 0), CellAddress::new(4, 1));
        assert_eq!(build_reference_text(&range, "Sheet1", Some("Data_2")), "Data_2!A1:B5");
        assert_eq!(build_reference_text(&range, "Sheet1", Some("2024")), "'2024'!A1:B5");
        assert_eq!(build_reference_text(&range, "Sheet1", Some("Bob's")), "'Bob''s'!A1:B5");
    }

    #[test]
    fn reference_text_round_trips() {
        let a1 = CellRange::single(CellAddress::new(0, 0));
        let text = build_reference_text(&a1, "Sheet1", Some("My Sheet"));
        assert_eq!(text, "'My Sheet'!A1");

        let parsed = parse_reference(&text).unwrap();
        assert_eq!(parsed.sheet_name.as_deref(), Some("My Sheet"));
        assert_eq!(parsed.range, a1);
        assert!(parsed.range.is_single_cell());
    }

    #[test]
    fn f4_cycles_through_all_forms() {
        let mut text = "=A1".to_string();
        let mut seen = Vec::new();
        for _ in 0..4 {
            let edit = cycle_reference(&text, 3).unwrap();
            text = edit.text;
            seen.push(text.clone());
        }
        assert_eq!(seen, vec!["=$A$1", "=A$1", "=$A1", "=A1"]);
    }

    #[test]
    fn f4_targets_reference_under_caret() {
        let edit = cycle_reference("=A1+B2", 5).unwrap();
        assert_eq!(edit.text, "=A1+$B$2");
        assert_eq!(edit.caret_offset, 8);

        // Caret in a range's first half cycles that cell only
        let edit = cycle_reference("=SUM(A1:B2)", 6).unwrap();
        assert_eq!(edit.text, "=SUM($A$1:B2)");
    }

    #[test]
    fn f4_falls_back_to_previous_reference() {
        let edit = cycle_reference("=A1 + 5", 7).unwrap();
        assert_eq!(edit.text, "=$A$1 + 5");
        assert_eq!(edit.caret_offset, 9);
    }

    #[test]
    fn f4_skips_function_names_and_plain_text() {
        assert_eq!(cycle_reference("=LOG10(", 7), None);
        assert_eq!(cycle_reference("=SUM(", 5), None);
        assert_eq!(cycle_reference("", 0), None);
        assert_eq!(cycle_reference("A1", 2), None, "plain text is not a formula");
    }

    #[test]
    fn f4_ignores_string_contents_and_sheet_names() {
        assert_eq!(cycle_reference("=\"A1\"", 3), None);

        let edit = cycle_reference("=B2&\"A1\"", 7).unwrap();
        assert_eq!(edit.text, "=$B$2&\"A1\"");

        let edit = cycle_reference("='Q1 2024'!C3", 13).unwrap();
        assert_eq!(edit.text, "='Q1 2024'!$C$3");
        assert_eq!(edit.caret_offset, 15);
    }
}
