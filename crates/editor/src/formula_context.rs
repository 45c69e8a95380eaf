//! Formula Context Analyzer
//!
//! The single source of truth for formula UI features. Reference
//! highlighting, autocomplete, signature help and the syntax overlay all
//! read the `FormulaAnalysis` that `analyze()` produces for a
//! (text, caret) pair.
//!
//! Analysis never fails. When the AST parser rejects the body (the normal
//! case while the user is mid-typing) only `ast` and `is_valid` reflect it;
//! tokens, references and the active function still come from the token
//! stream.

use serde::Serialize;

use gridedit_engine::formula::parser::{self, Expr, ParseError};

use crate::formula_refs::{extract_references, ReferenceToken};
use crate::functions::{get_function, FunctionInfo};
use crate::tokenizer::{tokenize, Token, TokenKind};

// ============================================================================
// Core Types
// ============================================================================

/// Snapshot of everything known about the editing text at one caret position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormulaAnalysis {
    /// Parsed expression, absent when the body does not parse
    pub ast: Option<Expr>,
    /// Tokens of the full text (offsets include the leading '=')
    pub tokens: Vec<Token>,
    pub references: Vec<ReferenceToken>,
    pub is_valid: bool,
    /// Innermost named function whose argument list contains the caret (uppercased)
    pub active_function_name: Option<String>,
    /// 0-based argument the caret is in
    pub active_function_arg_index: Option<usize>,
}

/// AST parser used by the analyzer
pub trait FormulaParser {
    fn parse(&self, body: &str) -> Result<Expr, ParseError>;
}

/// The engine's formula parser
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineParser;

impl FormulaParser for EngineParser {
    fn parse(&self, body: &str) -> Result<Expr, ParseError> {
        parser::parse(body)
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Analyze editing text with the engine parser.
pub fn analyze(text: &str, caret: usize) -> FormulaAnalysis {
    analyze_with(&EngineParser, text, caret)
}

/// Analyze editing text with a specific parser.
///
/// Text without a leading `=` is not a formula and gets the empty analysis.
pub fn analyze_with<P: FormulaParser + ?Sized>(parser: &P, text: &str, caret: usize) -> FormulaAnalysis {
    let Some(body) = text.strip_prefix('=') else {
        return FormulaAnalysis::default();
    };

    // Offsets realign to the full text
    let tokens: Vec<Token> = tokenize(body).iter().map(|t| t.shifted(1)).collect();

    let ast = match parser.parse(body) {
        Ok(expr) => Some(expr),
        Err(e) => {
            log::trace!("formula body did not parse: {}", e);
            None
        }
    };

    let references = extract_references(&tokens);
    let (active_function_name, active_function_arg_index) = match find_active_function(&tokens, caret) {
        Some((name, arg)) => (Some(name), Some(arg)),
        None => (None, None),
    };

    FormulaAnalysis {
        is_valid: ast.is_some(),
        ast,
        tokens,
        references,
        active_function_name,
        active_function_arg_index,
    }
}

/// One open paren on the nesting stack
#[derive(Debug)]
struct Frame {
    /// None for grouping parens
    function: Option<String>,
    arg_index: usize,
}

/// Walk the significant tokens that end at or before the caret, tracking
/// open parens on an explicit stack. The innermost frame decides the answer:
/// a named frame yields (name, arg index), a grouping paren yields nothing.
fn find_active_function(tokens: &[Token], caret: usize) -> Option<(String, usize)> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut prev: Option<&Token> = None;

    for token in tokens.iter().filter(|t| !t.is_whitespace()) {
        if token.end > caret {
            break;
        }

        match (token.kind, token.text.as_str()) {
            (TokenKind::Paren, "(") => {
                let function = prev
                    .filter(|p| p.kind == TokenKind::Function)
                    .map(|p| p.text.to_ascii_uppercase());
                stack.push(Frame { function, arg_index: 0 });
            }
            (TokenKind::Paren, ")") => {
                stack.pop();
            }
            (TokenKind::Comma, _) => {
                if let Some(top) = stack.last_mut() {
                    top.arg_index += 1;
                }
            }
            _ => {}
        }

        prev = Some(token);
    }

    let top = stack.last()?;
    top.function.clone().map(|name| (name, top.arg_index))
}

// ============================================================================
// Memoization
// ============================================================================

struct CacheEntry {
    text: String,
    caret: usize,
    analysis: FormulaAnalysis,
}

/// Remembers the last analysis. Analysis is a pure function of
/// (text, caret), so a hit can be returned as-is.
#[derive(Default)]
pub struct AnalysisCache {
    entry: Option<CacheEntry>,
    hits: u64,
    misses: u64,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&mut self, text: &str, caret: usize) -> &FormulaAnalysis {
        let fresh = self
            .entry
            .as_ref()
            .is_some_and(|e| e.caret == caret && e.text == text);

        if fresh {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.entry = None;
        }

        &self
            .entry
            .get_or_insert_with(|| CacheEntry {
                text: text.to_string(),
                caret,
                analysis: analyze(text, caret),
            })
            .analysis
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

// ============================================================================
// Signature Help
// ============================================================================

/// Signature popup content for the active function
#[derive(Debug, Clone, Serialize)]
pub struct SignatureHelp {
    pub function: &'static FunctionInfo,
    pub arg_index: usize,
    /// Parameter to highlight; None when there are more arguments than parameters
    pub active_parameter: Option<usize>,
}

/// Signature help for the function the caret is inside, if it is a known one.
pub fn signature_help(analysis: &FormulaAnalysis) -> Option<SignatureHelp> {
    let name = analysis.active_function_name.as_deref()?;
    let arg_index = analysis.active_function_arg_index?;
    let function = get_function(name)?;

    Some(SignatureHelp {
        function,
        arg_index,
        active_parameter: function.parameter_for_arg(arg_index),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gridedit_core::{CellAddress, CellRange};

    #[test]
    fn plain_text_gets_empty_analysis() {
        for text in ["", "hello", " =A1", "42"] {
            assert_eq!(analyze(text, 0), FormulaAnalysis::default(), "for {:?}", text);
        }
    }

    #[test]
    fn lone_equals() {
        let a = analyze("=", 1);
        assert!(a.tokens.is_empty());
        assert!(!a.is_valid);
        assert_eq!(a.ast, None);
    }

    #[test]
    fn tokens_shift_past_equals() {
        let a = analyze("=SUM(A1)", 0);
        let body = tokenize("SUM(A1)");
        assert_eq!(a.tokens.len(), body.len());
        for (full, raw) in a.tokens.iter().zip(&body) {
            assert_eq!(full.start, raw.start + 1);
            assert_eq!(full.end, raw.end + 1);
            assert_eq!(full.text, raw.text);
        }
    }

    #[test]
    fn valid_formula_has_ast() {
        let a = analyze("=A1*2", 5);
        assert!(a.is_valid);
        assert!(a.ast.is_some());
        assert_eq!(a.references.len(), 1);
        assert_eq!(a.references[0].range, CellRange::single(CellAddress::new(0, 0)));
    }

    #[test]
    fn incomplete_formula_still_analyzed() {
        let a = analyze("=SUM(A1:B2,", 11);
        assert!(!a.is_valid);
        assert_eq!(a.ast, None);
        assert_eq!(a.references.len(), 1);
        assert_eq!(a.active_function_name.as_deref(), Some("SUM"));
        assert_eq!(a.active_function_arg_index, Some(1));
    }

    #[test]
    fn nested_functions() {
        let text = "=IF(SUM(A1:A5)>10,TRUE,FALSE)";
        let a = analyze(text, 8);
        assert_eq!(a.active_function_name.as_deref(), Some("SUM"));
        assert_eq!(a.active_function_arg_index, Some(0));

        // Just past SUM's ')': back in IF
        let a = analyze(text, 14);
        assert_eq!(a.active_function_name.as_deref(), Some("IF"));
        assert_eq!(a.active_function_arg_index, Some(0));

        let a = analyze(text, 19);
        assert_eq!(a.active_function_name.as_deref(), Some("IF"));
        assert_eq!(a.active_function_arg_index, Some(1));
    }

    #[test]
    fn grouping_parens_hide_outer_function() {
        let a = analyze("=SUM((A1", 8);
        assert_eq!(a.active_function_name, None);
        assert_eq!(a.active_function_arg_index, None);

        let a = analyze("=SUM((A1+1),", 12);
        assert_eq!(a.active_function_name.as_deref(), Some("SUM"));
        assert_eq!(a.active_function_arg_index, Some(1));
    }

    #[test]
    fn caret_before_open_paren() {
        let a = analyze("=SUM(", 4);
        assert_eq!(a.active_function_name, None);
        let a = analyze("=sum (", 6);
        assert_eq!(a.active_function_name.as_deref(), Some("SUM"));
    }

    #[test]
    fn unbalanced_input_is_tolerated() {
        for text in ["=)))", "=((((((((((", "=,,,", "=\"", "='", "=#", "=SUM(A1:"] {
            let a = analyze(text, text.chars().count());
            assert!(!a.is_valid, "{:?} should not parse", text);
        }
        assert_eq!(analyze("=SUM(", 999).active_function_name.as_deref(), Some("SUM"));
    }

    #[test]
    fn custom_parser_is_used() {
        struct RejectAll;
        impl FormulaParser for RejectAll {
            fn parse(&self, _body: &str) -> Result<Expr, ParseError> {
                Err(ParseError::Empty)
            }
        }
        let a = analyze_with(&RejectAll, "=1+1", 4);
        assert!(!a.is_valid);
        assert_eq!(a.tokens.len(), 3);
    }

    #[test]
    fn cache_reuses_same_input() {
        let mut cache = AnalysisCache::new();
        let first = cache.analyze("=SUM(A1", 7).clone();
        let second = cache.analyze("=SUM(A1", 7).clone();
        assert_eq!(first, second);
        assert_eq!(cache.stats(), (1, 1));

        cache.analyze("=SUM(A1", 6);
        assert_eq!(cache.stats(), (1, 2));
        cache.clear();
        cache.analyze("=SUM(A1", 6);
        assert_eq!(cache.stats(), (1, 3));
    }

    #[test]
    fn signature_help_tracks_argument() {
        let help = signature_help(&analyze("=VLOOKUP(A1, B1:C9, ", 20)).unwrap();
        assert_eq!(help.function.name, "VLOOKUP");
        assert_eq!(help.arg_index, 2);
        assert_eq!(help.active_parameter, Some(2));
        assert_eq!(help.function.parameters[2].name, "col_index_num");

        let help = signature_help(&analyze("=SUM(1,2,3,", 11)).unwrap();
        assert_eq!(help.active_parameter, Some(1));

        assert!(signature_help(&analyze("=MYFUNC(", 8)).is_none());
        assert!(signature_help(&analyze("=A1", 3)).is_none());
    }

    #[test]
    fn analysis_serializes_for_debug_overlay() {
        let json = serde_json::to_value(analyze("=SUM(B2", 7)).unwrap();
        assert_eq!(json["is_valid"], false);
        assert!(json["ast"].is_null());
        assert_eq!(json["tokens"][0]["text"], "SUM");
        assert_eq!(json["tokens"][0]["start"], 1);
        assert_eq!(json["references"][0]["color_index"], 0);
        assert_eq!(json["active_function_name"], "SUM");
    }

    #[test]
    fn deep_nesting_is_analyzed_without_overflow() {
        let open_only = format!("={}", "(".repeat(50_000));
        let a = analyze(&open_only, 50_001);
        assert!(!a.is_valid);
        assert_eq!(a.tokens.len(), 50_000);

        let signs = format!("={}1", "-".repeat(50_000));
        assert!(!analyze(&signs, 3).is_valid);

        let balanced = format!("={}1{}", "(".repeat(1_000), ")".repeat(1_000));
        let a = analyze(&balanced, 1_001);
        assert!(!a.is_valid);
        assert_eq!(a.active_function_name, None);

        let nested_calls = format!("={}A1", "SUM(".repeat(1_000));
        let a = analyze(&nested_calls, nested_calls.chars().count());
        assert!(!a.is_valid);
        assert_eq!(a.active_function_name.as_deref(), Some("SUM"));
        assert_eq!(a.references.len(), 1);
    }
}
