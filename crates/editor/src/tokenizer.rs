//! Formula Tokenizer
//!
//! Splits a formula body (text after the leading `=`) into typed tokens with
//! char offsets. Total over all input: anything unrecognized becomes a
//! one-char `Error` token, and the tokens always tile the input with no gaps.
//!
//! At each position the rules are tried in a fixed order:
//! whitespace, error literals, strings, references, a bare sheet qualifier,
//! function names (identifier before `(`), other identifiers, numbers,
//! operators (two-char first), then single-char punctuation.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Reference,
    Function,
    Operator,
    Literal,
    String,
    Paren,
    Comma,
    Semicolon,
    Colon,
    Bracket,
    Error,
    Whitespace,
}

/// A token with its half-open char span `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Whitespace
    }

    /// Could this token be a partially typed function name?
    ///
    /// Short names like `SU` tokenize as references (they have the shape of a
    /// column), so references count too unless they hold a digit (a real cell)
    /// or a `!` (sheet-qualified).
    pub fn is_function_candidate(&self) -> bool {
        match self.kind {
            TokenKind::Function => true,
            TokenKind::Reference => {
                !self.text.chars().any(|c| c.is_ascii_digit()) && !self.text.contains('!')
            }
            _ => false,
        }
    }

    /// Same token with both offsets moved right by `by` chars
    pub fn shifted(&self, by: usize) -> Token {
        Token {
            kind: self.kind,
            text: self.text.clone(),
            start: self.start + by,
            end: self.end + by,
        }
    }
}

// ============================================================================
// Patterns
// ============================================================================

const ERROR_LITERAL: &str = r"^(?i)(?:#GETTING_DATA|#DIV/0!|#VALUE!|#NAME\?|#NULL!|#NUM!|#REF!|#N/A)";

// Unterminated strings run to end of input
const STRING: &str = r#"^"(?:[^"]|"")*"?"#;

const REFERENCE: &str = concat!(
    r"^(?:'(?:[^']|'')+'!|[A-Za-z_][A-Za-z0-9_.]*!)?",
    r"(?:\$?[A-Za-z]{1,3}\$?[0-9]+(?::\$?[A-Za-z]{1,3}\$?[0-9]+)?",
    r"|\$?[A-Za-z]{1,3}:\$?[A-Za-z]{1,3}",
    r"|\$?[0-9]+:\$?[0-9]+)",
);

const SHEET_QUALIFIER: &str = r"^(?:'(?:[^']|'')+'|[A-Za-z_][A-Za-z0-9_.]*)!";

const FUNCTION_CALL: &str = r"^([A-Za-z_][A-Za-z0-9_.]*)\s*\(";

const IDENTIFIER: &str = r"^[A-Za-z_][A-Za-z0-9_.]*";

const BARE_COLUMN: &str = r"^[A-Za-z]{1,3}$";

const NUMBER: &str = r"^(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?";

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("tokenizer pattern must compile"))
}

fn error_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, ERROR_LITERAL)
}

fn string_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, STRING)
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, REFERENCE)
}

fn sheet_qualifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, SHEET_QUALIFIER)
}

fn function_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, FUNCTION_CALL)
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, IDENTIFIER)
}

fn bare_column_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, BARE_COLUMN)
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, NUMBER)
}

// ============================================================================
// Scanner
// ============================================================================

/// Tokenize a formula body. Offsets are relative to `body`.
pub fn tokenize(body: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut byte_pos = 0;
    let mut char_pos = 0;

    while byte_pos < body.len() {
        let rest = &body[byte_pos..];
        let (kind, byte_len) = next_token(rest);
        let text = &rest[..byte_len];
        let char_count = text.chars().count();

        tokens.push(Token {
            kind,
            text: text.to_string(),
            start: char_pos,
            end: char_pos + char_count,
        });

        byte_pos += byte_len;
        char_pos += char_count;
    }

    tokens
}

/// Classify the token at the start of `rest`. Always consumes at least one char.
fn next_token(rest: &str) -> (TokenKind, usize) {
    let Some(first) = rest.chars().next() else {
        return (TokenKind::Error, 0);
    };

    if first.is_whitespace() {
        let len = rest
            .char_indices()
            .find(|(_, c)| !c.is_whitespace())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        return (TokenKind::Whitespace, len);
    }

    if let Some(m) = error_literal_re().find(rest) {
        return (TokenKind::Literal, m.end());
    }

    if let Some(m) = string_re().find(rest) {
        return (TokenKind::String, m.end());
    }

    if let Some(m) = reference_re().find(rest) {
        if ends_at_boundary(&rest[m.end()..]) {
            return (TokenKind::Reference, m.end());
        }
    }

    if let Some(m) = sheet_qualifier_re().find(rest) {
        return (TokenKind::Reference, m.end());
    }

    // Name only; the '(' is left for the next token
    if let Some(name) = function_call_re().captures(rest).and_then(|caps| caps.get(1)) {
        return (TokenKind::Function, name.end());
    }

    if let Some(m) = identifier_re().find(rest) {
        let kind = if bare_column_re().is_match(m.as_str()) {
            TokenKind::Reference
        } else {
            TokenKind::Function
        };
        return (kind, m.end());
    }

    if let Some(m) = number_re().find(rest) {
        return (TokenKind::Literal, m.end());
    }

    for op in ["<>", ">=", "<="] {
        if rest.starts_with(op) {
            return (TokenKind::Operator, op.len());
        }
    }

    let kind = match first {
        '+' | '-' | '*' | '/' | '^' | '&' | '=' | '>' | '<' => TokenKind::Operator,
        '(' | ')' => TokenKind::Paren,
        ',' => TokenKind::Comma,
        ';' => TokenKind::Semicolon,
        ':' => TokenKind::Colon,
        '{' | '}' => TokenKind::Bracket,
        _ => TokenKind::Error,
    };
    (kind, first.len_utf8())
}

/// A reference must not run straight into more name characters (`A1B`) or a
/// call (`LOG10(`); those fall through to the identifier rules.
fn ends_at_boundary(after: &str) -> bool {
    match after.chars().next() {
        None => true,
        Some(c) => !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '(' | '!')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(body: &str) -> Vec<(TokenKind, String)> {
        tokenize(body).into_iter().map(|t| (t.kind, t.text)).collect()
    }

    fn k(kind: TokenKind, text: &str) -> (TokenKind, String) {
        (kind, text.to_string())
    }

    #[test]
    fn empty_input() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn function_with_range_argument() {
        use TokenKind::*;
        assert_eq!(
            kinds("SUM(A1:B5, $C$2)"),
            vec![
                k(Function, "SUM"),
                k(Paren, "("),
                k(Reference, "A1:B5"),
                k(Comma, ","),
                k(Whitespace, " "),
                k(Reference, "$C$2"),
                k(Paren, ")"),
            ]
        );
    }

    #[test]
    fn function_lookahead_allows_whitespace() {
        use TokenKind::*;
        assert_eq!(
            kinds("sum (1)"),
            vec![k(Function, "sum"), k(Whitespace, " "), k(Paren, "("), k(Literal, "1"), k(Paren, ")")]
        );
    }

    #[test]
    fn sheet_qualified_references() {
        use TokenKind::*;
        assert_eq!(kinds("Sheet2!A1"), vec![k(Reference, "Sheet2!A1")]);
        assert_eq!(kinds("'My Sheet'!A1:B2"), vec![k(Reference, "'My Sheet'!A1:B2")]);
        assert_eq!(kinds("'Bob''s'!c3"), vec![k(Reference, "'Bob''s'!c3")]);
        // Mid-typing: qualifier alone
        assert_eq!(kinds("Sheet2!"), vec![k(Reference, "Sheet2!")]);
        assert_eq!(kinds("'My Sheet'!+"), vec![k(Reference, "'My Sheet'!"), k(Operator, "+")]);
    }

    #[test]
    fn whole_column_and_row_ranges() {
        use TokenKind::*;
        assert_eq!(kinds("A:C"), vec![k(Reference, "A:C")]);
        assert_eq!(kinds("$2:$4"), vec![k(Reference, "$2:$4")]);
    }

    #[test]
    fn bare_identifiers_split_on_column_shape() {
        use TokenKind::*;
        assert_eq!(kinds("SU"), vec![k(Reference, "SU")]);
        assert_eq!(kinds("SUMI"), vec![k(Function, "SUMI")]);
        assert_eq!(kinds("STDEV.S"), vec![k(Function, "STDEV.S")]);
    }

    #[test]
    fn reference_shaped_function_names() {
        use TokenKind::*;
        assert_eq!(kinds("LOG10(100)")[0], k(Function, "LOG10"));
        assert_eq!(kinds("A1B"), vec![k(Function, "A1B")]);
    }

    #[test]
    fn literals_and_strings() {
        use TokenKind::*;
        assert_eq!(
            kinds("1.5E-3&\"a\"\"b\""),
            vec![k(Literal, "1.5E-3"), k(Operator, "&"), k(String, "\"a\"\"b\"")]
        );
        assert_eq!(kinds("#n/a"), vec![k(Literal, "#n/a")]);
        assert_eq!(kinds("#DIV/0!+1")[0], k(Literal, "#DIV/0!"));
        assert_eq!(kinds(".5"), vec![k(Literal, ".5")]);
    }

    #[test]
    fn unterminated_string_runs_to_end() {
        let tokens = tokenize("\"abc + A1");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].end, 9);
    }

    #[test]
    fn two_char_operators_first_and_percent_is_not_an_operator() {
        use TokenKind::*;
        assert_eq!(
            kinds("1<>2>=3<=4<5%"),
            vec![
                k(Literal, "1"), k(Operator, "<>"), k(Literal, "2"), k(Operator, ">="),
                k(Literal, "3"), k(Operator, "<="), k(Literal, "4"), k(Operator, "<"),
                k(Literal, "5"), k(Error, "%"),
            ]
        );
    }

    #[test]
    fn punctuation_and_errors() {
        use TokenKind::*;
        assert_eq!(
            kinds("{1;2}@"),
            vec![
                k(Bracket, "{"), k(Literal, "1"), k(Semicolon, ";"), k(Literal, "2"),
                k(Bracket, "}"), k(Error, "@"),
            ]
        );
        assert_eq!(kinds("#"), vec![k(Error, "#")]);
        assert_eq!(kinds("'open"), vec![k(Error, "'"), k(Function, "open")]);
    }

    #[test]
    fn offsets_count_chars() {
        let tokens = tokenize("\"ü\"&A1");
        assert_eq!((tokens[0].start, tokens[0].end), (0, 3));
        assert_eq!((tokens[2].start, tokens[2].end), (4, 6));
    }

    #[test]
    fn tokens_are_contiguous() {
        for body in ["SUM(A1:A5)>10", "IF(,,", "  ))((", "'x", "Ω≈ç√", "1+*#REF!?"] {
            let tokens = tokenize(body);
            let mut pos = 0;
            for t in &tokens {
                assert_eq!(t.start, pos, "gap before {:?} in {:?}", t, body);
                assert!(t.end > t.start, "empty token in {:?}", body);
                pos = t.end;
            }
            assert_eq!(pos, body.chars().count(), "tokens must cover {:?}", body);
        }
    }

    #[test]
    fn function_candidates() {
        let tokens = tokenize("SU+A1+Sheet1!B2+VLOOK");
        let candidates: Vec<&str> = tokens
            .iter()
            .filter(|t| t.is_function_candidate())
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(candidates, vec!["SU", "VLOOK"]);
    }
}
