//! Function-name autocomplete: when to open, what to offer, what accepting does.

use serde::Serialize;

use crate::functions::{FunctionDefinition, FunctionRegistry};
use crate::text_editing::{char_len, char_slice, splice, TextEdit};
use crate::tokenizer::{Token, TokenKind};

/// Suggestions shown when nothing else is configured
pub const DEFAULT_AUTOCOMPLETE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutocompleteContext {
    pub should_open: bool,
    /// Uppercased text from the token start up to the caret
    pub query: String,
    pub token_start_offset: usize,
}

/// Find the partially typed function name around the caret.
///
/// Returns None when the caret is not on a function candidate, or when the
/// name is already followed by `(`.
pub fn detect_context(tokens: &[Token], caret: usize) -> Option<AutocompleteContext> {
    let index = tokens
        .iter()
        .position(|t| t.is_function_candidate() && t.start <= caret && caret <= t.end)?;
    let token = &tokens[index];

    let next = tokens[index + 1..].iter().find(|t| !t.is_whitespace());
    if matches!(next, Some(t) if t.kind == TokenKind::Paren && t.text == "(") {
        return None;
    }

    let query = char_slice(&token.text, 0, caret - token.start).to_ascii_uppercase();
    Some(AutocompleteContext {
        should_open: !query.is_empty(),
        query,
        token_start_offset: token.start,
    })
}

/// Registry functions matching a name prefix (case-insensitive).
///
/// An empty query lists the first `limit` names alphabetically. Otherwise an
/// exact match comes first, then the rest alphabetically.
pub fn filter_functions<R: FunctionRegistry + ?Sized>(
    registry: &R,
    query: &str,
    limit: usize,
) -> Vec<FunctionDefinition> {
    let upper = query.to_ascii_uppercase();
    let mut matches: Vec<FunctionDefinition> = registry
        .list_functions()
        .into_iter()
        .filter(|f| f.name.to_ascii_uppercase().starts_with(&upper))
        .collect();

    matches.sort_by(|a, b| {
        let a_name = a.name.to_ascii_uppercase();
        let b_name = b.name.to_ascii_uppercase();
        (a_name != upper)
            .cmp(&(b_name != upper))
            .then_with(|| a_name.cmp(&b_name))
    });
    matches.truncate(limit);
    matches
}

/// Inputs for accepting a suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptRequest<'a> {
    pub editing_text: &'a str,
    pub token_start_offset: usize,
    pub caret_offset: usize,
    pub function_name: &'a str,
}

/// Replace `[token_start, caret)` with `NAME(` and put the caret after the paren.
/// Text after the caret is kept.
pub fn accept_autocomplete(request: &AcceptRequest<'_>) -> TextEdit {
    let len = char_len(request.editing_text);
    let caret = request.caret_offset.min(len);
    let start = request.token_start_offset.min(caret);

    let insert = format!("{}(", request.function_name);
    TextEdit {
        caret_offset: start + char_len(&insert),
        text: splice(request.editing_text, start, caret, &insert),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula_context::analyze;
    use crate::functions::BuiltinFunctions;

    fn context(text: &str, caret: usize) -> Option<AutocompleteContext> {
        detect_context(&analyze(text, caret).tokens, caret)
    }

    #[test]
    fn opens_on_partial_name() {
        assert_eq!(
            context("=SU", 3),
            Some(AutocompleteContext { should_open: true, query: "SU".into(), token_start_offset: 1 })
        );
        let ctx = context("=A1+vlo", 7).unwrap();
        assert_eq!(ctx.query, "VLO");
        assert_eq!(ctx.token_start_offset, 4);
    }

    #[test]
    fn query_stops_at_caret() {
        let ctx = context("=SUMIF", 3).unwrap();
        assert_eq!(ctx.query, "SU");
        assert_eq!(ctx.token_start_offset, 1);
    }

    #[test]
    fn closed_when_paren_follows() {
        assert_eq!(context("=SUM(", 4), None);
        assert_eq!(context("=SUM (A1)", 3), None);
    }

    #[test]
    fn cell_and_sheet_references_are_not_candidates() {
        assert_eq!(context("=A1", 3), None);
        assert_eq!(context("=Sheet1!", 8), None);
        assert_eq!(context("=1+", 3), None);
    }

    #[test]
    fn caret_at_token_start_gives_empty_query() {
        let ctx = context("=SU", 1).unwrap();
        assert!(!ctx.should_open);
        assert_eq!(ctx.query, "");
    }

    #[test]
    fn filter_ranks_exact_match_first() {
        let names: Vec<String> = filter_functions(&BuiltinFunctions, "sum", 10)
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["SUM", "SUMIF", "SUMIFS", "SUMPRODUCT"]);
    }

    #[test]
    fn filter_empty_query_is_alphabetical_and_capped() {
        let names: Vec<String> = filter_functions(&BuiltinFunctions, "", DEFAULT_AUTOCOMPLETE_LIMIT)
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "ABS");
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn filter_respects_limit_and_misses() {
        assert_eq!(filter_functions(&BuiltinFunctions, "C", 2).len(), 2);
        assert!(filter_functions(&BuiltinFunctions, "ZZZ", 10).is_empty());
    }

    #[test]
    fn exact_match_beats_alphabetical_order() {
        struct Fixed;
        impl FunctionRegistry for Fixed {
            fn list_functions(&self) -> Vec<FunctionDefinition> {
                ["DAYS", "DAY360", "DAY"]
                    .iter()
                    .map(|n| FunctionDefinition { name: n.to_string(), description: None })
                    .collect()
            }
        }
        let names: Vec<String> = filter_functions(&Fixed, "day", 10).into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["DAY", "DAY360", "DAYS"]);
    }

    #[test]
    fn accept_replaces_prefix_and_keeps_tail() {
        let edit = accept_autocomplete(&AcceptRequest {
            editing_text: "=SU+A1",
            token_start_offset: 1,
            caret_offset: 3,
            function_name: "SUM",
        });
        assert_eq!(edit, TextEdit { text: "=SUM(+A1".into(), caret_offset: 5 });
    }

    #[test]
    fn accept_mid_token_drops_only_the_prefix() {
        let edit = accept_autocomplete(&AcceptRequest {
            editing_text: "=AVxyz",
            token_start_offset: 1,
            caret_offset: 3,
            function_name: "AVERAGE",
        });
        assert_eq!(edit.text, "=AVERAGE(xyz");
        assert_eq!(edit.caret_offset, 9);
    }
}
