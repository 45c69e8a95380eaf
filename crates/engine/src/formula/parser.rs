// Formula parser - converts a formula body (text after the leading '=') into an AST
// Supports: numbers, strings, booleans, error literals, cell refs (A1, $A$1), ranges (A1:B5),
// whole-column/row ranges (A:C, 1:5), sheet-qualified refs (Sheet1!A1, 'My Sheet'!A1),
// function calls with ',' or ';' separators, array constants ({1,2;3,4}),
// unary +/-, percent, ^, * /, + -, & and comparisons (< > = <= >= <>)

use std::fmt;

use serde::Serialize;

use gridedit_core::{column_index, CellAddress};

/// Expression AST. Sheet qualifiers are kept as written (unresolved names).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Error literal such as `#N/A`, stored uppercased
    Error(String),
    /// Cell reference; col_abs/row_abs are true for `$A` / `$1`
    CellRef {
        sheet: Option<String>,
        cell: CellAddress,
        col_abs: bool,
        row_abs: bool,
    },
    Range {
        sheet: Option<String>,
        start: CellAddress,
        end: CellAddress,
    },
    /// Whole columns, zero-based (`A:C` is 0..=2)
    ColumnRange {
        sheet: Option<String>,
        start_col: usize,
        end_col: usize,
    },
    /// Whole rows, zero-based (`1:5` is 0..=4)
    RowRange {
        sheet: Option<String>,
        start_row: usize,
        end_row: usize,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
    Percent(Box<Expr>),
    Array(Vec<Vec<Expr>>),
    /// Bare identifier that is not a function call (named range)
    Name(String),
    /// Empty/omitted argument (e.g. the trailing slot in `IF(a,b,)`)
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Lt,
    Gt,
    Eq,
    LtEq,
    GtEq,
    NotEq,
}

/// Why a formula body failed to parse. Positions are character offsets into the body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Body was empty or whitespace only.
    Empty,
    UnexpectedChar { ch: char, pos: usize },
    UnterminatedString { pos: usize },
    UnterminatedSheetName { pos: usize },
    InvalidNumber(String),
    InvalidReference(String),
    /// Sheet qualifier not followed by a reference.
    DanglingSheetPrefix(String),
    UnexpectedEnd,
    UnexpectedToken { index: usize },
    MissingCloseParen,
    /// More than `MAX_NESTING` nested brackets or stacked signs.
    TooDeep,
    /// Longer than `MAX_FORMULA_LEN` characters.
    TooLong,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty formula"),
            Self::UnexpectedChar { ch, pos } => write!(f, "unexpected character '{ch}' at {pos}"),
            Self::UnterminatedString { pos } => write!(f, "unterminated string starting at {pos}"),
            Self::UnterminatedSheetName { pos } => write!(f, "unterminated sheet name starting at {pos}"),
            Self::InvalidNumber(s) => write!(f, "invalid number: {s}"),
            Self::InvalidReference(s) => write!(f, "invalid reference: {s}"),
            Self::DanglingSheetPrefix(s) => write!(f, "sheet '{s}' must be followed by a reference"),
            Self::UnexpectedEnd => write!(f, "unexpected end of formula"),
            Self::UnexpectedToken { index } => write!(f, "unexpected token #{index}"),
            Self::MissingCloseParen => write!(f, "missing closing parenthesis"),
            Self::TooDeep => write!(f, "formula nested more than {MAX_NESTING} levels"),
            Self::TooLong => write!(f, "formula longer than {MAX_FORMULA_LEN} characters"),
        }
    }
}

impl std::error::Error for ParseError {}

const ERROR_LITERALS: &[&str] = &[
    "#GETTING_DATA", "#DIV/0!", "#VALUE!", "#NAME?", "#NULL!", "#NUM!", "#REF!", "#N/A",
];

/// Excel's limit on nested levels
pub const MAX_NESTING: usize = 64;

/// Excel's limit on formula length, in characters
pub const MAX_FORMULA_LEN: usize = 8192;

/// Parse a formula body (without the leading `=`).
pub fn parse(body: &str) -> Result<Expr, ParseError> {
    if body.chars().count() > MAX_FORMULA_LEN {
        return Err(ParseError::TooLong);
    }
    let tokens = tokenize(body)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    check_nesting(&tokens)?;
    let (expr, pos) = parse_comparison(&tokens, 0)?;
    if pos < tokens.len() {
        return Err(ParseError::UnexpectedToken { index: pos });
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    StringLit(String),
    ErrorLit(String),
    CellRef { cell: CellAddress, col_abs: bool, row_abs: bool },
    SheetPrefix(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Colon,
    Comma,
    Semicolon,
    Lt,
    Gt,
    Eq,
    LtEq,
    GtEq,
    NotEq,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => { i += 1; }
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' => { tokens.push(Token::Star); i += 1; }
            '/' => { tokens.push(Token::Slash); i += 1; }
            '^' => { tokens.push(Token::Caret); i += 1; }
            '%' => { tokens.push(Token::Percent); i += 1; }
            '&' => { tokens.push(Token::Ampersand); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            '{' => { tokens.push(Token::LBrace); i += 1; }
            '}' => { tokens.push(Token::RBrace); i += 1; }
            ':' => { tokens.push(Token::Colon); i += 1; }
            ',' => { tokens.push(Token::Comma); i += 1; }
            ';' => { tokens.push(Token::Semicolon); i += 1; }
            '=' => { tokens.push(Token::Eq); i += 1; }
            '<' => {
                match chars.get(i + 1) {
                    Some('=') => { tokens.push(Token::LtEq); i += 2; }
                    Some('>') => { tokens.push(Token::NotEq); i += 2; }
                    _ => { tokens.push(Token::Lt); i += 1; }
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::GtEq);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '#' => {
                let rest: String = chars[i..].iter().collect::<String>().to_ascii_uppercase();
                let Some(lit) = ERROR_LITERALS.iter().find(|lit| rest.starts_with(*lit)) else {
                    return Err(ParseError::UnexpectedChar { ch: c, pos: i });
                };
                tokens.push(Token::ErrorLit(lit.to_string()));
                i += lit.chars().count();
            }
            '"' => {
                // "" inside a string is an escaped quote
                let start = i;
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        Some('"') if chars.get(i + 1) == Some(&'"') => { s.push('"'); i += 2; }
                        Some('"') => { i += 1; break; }
                        Some(ch) => { s.push(*ch); i += 1; }
                        None => return Err(ParseError::UnterminatedString { pos: start }),
                    }
                }
                tokens.push(Token::StringLit(s));
            }
            '\'' => {
                // 'Bob''s Sheet'!A1 - doubled quotes escape a single quote
                let start = i;
                i += 1;
                let mut name = String::new();
                loop {
                    match chars.get(i) {
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => { name.push('\''); i += 2; }
                        Some('\'') => { i += 1; break; }
                        Some(ch) => { name.push(*ch); i += 1; }
                        None => return Err(ParseError::UnterminatedSheetName { pos: start }),
                    }
                }
                if chars.get(i) != Some(&'!') {
                    return Err(ParseError::UnexpectedChar { ch: chars.get(i).copied().unwrap_or('\''), pos: i });
                }
                i += 1;
                tokens.push(Token::SheetPrefix(name));
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent: 1E5, 2.5e-3
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let num: f64 = text.parse().map_err(|_| ParseError::InvalidNumber(text.clone()))?;
                tokens.push(Token::Number(num));
            }
            '$' | 'A'..='Z' | 'a'..='z' | '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                    i += 1;
                }
                // Dotted function names (STDEV.P, NORM.S.DIST)
                while i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_alphabetic() {
                    i += 1;
                    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                        i += 1;
                    }
                }
                let ident: String = chars[start..i].iter().collect();

                if chars.get(i) == Some(&'!') {
                    i += 1;
                    tokens.push(Token::SheetPrefix(ident));
                    continue;
                }

                if let Some(token) = try_parse_cell_ref(&ident) {
                    tokens.push(token);
                } else if ident.contains('$') {
                    // $A (column half of $A:$C) stays an identifier; anything else is malformed
                    let stripped = ident.trim_start_matches('$');
                    if column_index(stripped).is_some() && !stripped.contains('$') {
                        tokens.push(Token::Ident(ident.to_ascii_uppercase()));
                    } else {
                        return Err(ParseError::InvalidReference(ident));
                    }
                } else {
                    tokens.push(Token::Ident(ident.to_ascii_uppercase()));
                }
            }
            _ => return Err(ParseError::UnexpectedChar { ch: c, pos: i }),
        }
    }

    Ok(tokens)
}

fn try_parse_cell_ref(s: &str) -> Option<Token> {
    let upper = s.to_ascii_uppercase();
    let mut rest = upper.as_str();

    let col_abs = rest.starts_with('$');
    if col_abs {
        rest = &rest[1..];
    }
    let letters_len = rest.chars().take_while(|c| c.is_ascii_uppercase()).count();
    let letters = &rest[..letters_len];
    rest = &rest[letters_len..];

    let row_abs = rest.starts_with('$');
    if row_abs {
        rest = &rest[1..];
    }
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let col = column_index(letters)?;
    let row: usize = rest.parse().ok()?;
    let cell = CellAddress::from_one_based(row, col)?;
    Some(Token::CellRef { cell, col_abs, row_abs })
}

fn parse_comparison(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_concat(tokens, pos)?;

    while let Some(token) = tokens.get(pos) {
        let op = match token {
            Token::Lt => Op::Lt,
            Token::Gt => Op::Gt,
            Token::Eq => Op::Eq,
            Token::LtEq => Op::LtEq,
            Token::GtEq => Op::GtEq,
            Token::NotEq => Op::NotEq,
            _ => break,
        };
        let (right, new_pos) = parse_concat(tokens, pos + 1)?;
        left = binary(op, left, right);
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_concat(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_add_sub(tokens, pos)?;

    while let Some(Token::Ampersand) = tokens.get(pos) {
        let (right, new_pos) = parse_add_sub(tokens, pos + 1)?;
        left = binary(Op::Concat, left, right);
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while let Some(token) = tokens.get(pos) {
        let op = match token {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = binary(op, left, right);
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_power(tokens, pos)?;

    while let Some(token) = tokens.get(pos) {
        let op = match token {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_power(tokens, pos + 1)?;
        left = binary(op, left, right);
        pos = new_pos;
    }

    Ok((left, pos))
}

// Exponentiation (^) - left-associative like Excel, binds tighter than * /
fn parse_power(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_unary(tokens, pos)?;

    while let Some(Token::Caret) = tokens.get(pos) {
        let (right, new_pos) = parse_unary(tokens, pos + 1)?;
        left = binary(Op::Pow, left, right);
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_unary(tokens: &[Token], mut pos: usize) -> Result<(Expr, usize), ParseError> {
    let mut negations = 0;
    loop {
        match tokens.get(pos) {
            Some(Token::Plus) => pos += 1,
            Some(Token::Minus) => {
                negations += 1;
                pos += 1;
            }
            _ => break,
        }
    }

    let (mut expr, pos) = parse_percent(tokens, pos)?;
    for _ in 0..negations {
        expr = Expr::Negate(Box::new(expr));
    }
    Ok((expr, pos))
}

fn parse_percent(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let (mut expr, mut pos) = parse_primary(tokens, pos)?;

    while let Some(Token::Percent) = tokens.get(pos) {
        expr = Expr::Percent(Box::new(expr));
        pos += 1;
    }

    Ok((expr, pos))
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let Some(token) = tokens.get(pos) else {
        return Err(ParseError::UnexpectedEnd);
    };

    match token {
        Token::Number(n) => {
            // 1:5 whole-row range
            if let (Some(Token::Colon), Some(Token::Number(m))) = (tokens.get(pos + 1), tokens.get(pos + 2)) {
                if let Some(expr) = row_range(None, *n, *m) {
                    return Ok((expr, pos + 3));
                }
            }
            Ok((Expr::Number(*n), pos + 1))
        }
        Token::StringLit(s) => Ok((Expr::Text(s.clone()), pos + 1)),
        Token::ErrorLit(e) => Ok((Expr::Error(e.clone()), pos + 1)),
        Token::SheetPrefix(name) => {
            let sheet = Some(name.clone());
            match tokens.get(pos + 1) {
                Some(Token::CellRef { .. }) | Some(Token::Ident(_)) => {
                    match parse_reference(tokens, pos + 1, sheet)? {
                        Some(found) => Ok(found),
                        None => Err(ParseError::DanglingSheetPrefix(name.clone())),
                    }
                }
                Some(Token::Number(n)) => {
                    if let (Some(Token::Colon), Some(Token::Number(m))) = (tokens.get(pos + 2), tokens.get(pos + 3)) {
                        if let Some(expr) = row_range(sheet, *n, *m) {
                            return Ok((expr, pos + 4));
                        }
                    }
                    Err(ParseError::DanglingSheetPrefix(name.clone()))
                }
                _ => Err(ParseError::DanglingSheetPrefix(name.clone())),
            }
        }
        Token::CellRef { .. } => match parse_reference(tokens, pos, None)? {
            Some(found) => Ok(found),
            None => Err(ParseError::UnexpectedToken { index: pos }),
        },
        Token::Ident(name) => {
            if let Some(Token::LParen) = tokens.get(pos + 1) {
                let (args, new_pos) = parse_function_args(tokens, pos + 2)?;
                return Ok((Expr::Function { name: name.clone(), args }, new_pos));
            }
            if name == "TRUE" {
                return Ok((Expr::Boolean(true), pos + 1));
            }
            if name == "FALSE" {
                return Ok((Expr::Boolean(false), pos + 1));
            }
            if let Some(found) = parse_reference(tokens, pos, None)? {
                return Ok(found);
            }
            if name.contains('$') {
                return Err(ParseError::InvalidReference(name.clone()));
            }
            Ok((Expr::Name(name.clone()), pos + 1))
        }
        Token::LParen => {
            let (expr, pos) = parse_comparison(tokens, pos + 1)?;
            match tokens.get(pos) {
                Some(Token::RParen) => Ok((expr, pos + 1)),
                Some(_) => Err(ParseError::UnexpectedToken { index: pos }),
                None => Err(ParseError::MissingCloseParen),
            }
        }
        Token::LBrace => parse_array(tokens, pos + 1),
        _ => Err(ParseError::UnexpectedToken { index: pos }),
    }
}

/// Parse a reference starting at `pos` (a CellRef or a column-letter Ident).
/// Returns None when the tokens there do not form a reference.
fn parse_reference(
    tokens: &[Token],
    pos: usize,
    sheet: Option<String>,
) -> Result<Option<(Expr, usize)>, ParseError> {
    match tokens.get(pos) {
        Some(Token::CellRef { cell, col_abs, row_abs }) => {
            if let (Some(Token::Colon), Some(Token::CellRef { cell: end, .. })) = (tokens.get(pos + 1), tokens.get(pos + 2)) {
                return Ok(Some((Expr::Range { sheet, start: *cell, end: *end }, pos + 3)));
            }
            Ok(Some((
                Expr::CellRef { sheet, cell: *cell, col_abs: *col_abs, row_abs: *row_abs },
                pos + 1,
            )))
        }
        Some(Token::Ident(start)) => {
            // A:C whole-column range
            if let (Some(Token::Colon), Some(Token::Ident(end))) = (tokens.get(pos + 1), tokens.get(pos + 2)) {
                let start_col = column_index(start.trim_start_matches('$'));
                let end_col = column_index(end.trim_start_matches('$'));
                if let (Some(s), Some(e)) = (start_col, end_col) {
                    if s <= gridedit_core::MAX_COLS && e <= gridedit_core::MAX_COLS {
                        return Ok(Some((
                            Expr::ColumnRange { sheet, start_col: s - 1, end_col: e - 1 },
                            pos + 3,
                        )));
                    }
                }
                return Err(ParseError::InvalidReference(format!("{}:{}", start, end)));
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

fn row_range(sheet: Option<String>, start: f64, end: f64) -> Option<Expr> {
    let valid = |n: f64| n.fract() == 0.0 && n >= 1.0 && n <= gridedit_core::MAX_ROWS as f64;
    if !valid(start) || !valid(end) {
        return None;
    }
    Some(Expr::RowRange { sheet, start_row: start as usize - 1, end_row: end as usize - 1 })
}

fn parse_function_args(tokens: &[Token], pos: usize) -> Result<(Vec<Expr>, usize), ParseError> {
    let mut args = Vec::new();
    let mut pos = pos;

    // SUM()
    if let Some(Token::RParen) = tokens.get(pos) {
        return Ok((args, pos + 1));
    }

    loop {
        match tokens.get(pos) {
            // Empty argument: separator or ) right away
            Some(Token::Comma) | Some(Token::Semicolon) => {
                args.push(Expr::Empty);
                pos += 1;
                continue;
            }
            Some(Token::RParen) => {
                args.push(Expr::Empty);
                return Ok((args, pos + 1));
            }
            None => return Err(ParseError::MissingCloseParen),
            _ => {}
        }

        let (arg, new_pos) = parse_comparison(tokens, pos)?;
        args.push(arg);
        pos = new_pos;

        match tokens.get(pos) {
            Some(Token::RParen) => return Ok((args, pos + 1)),
            Some(Token::Comma) | Some(Token::Semicolon) => pos += 1,
            Some(_) => return Err(ParseError::UnexpectedToken { index: pos }),
            None => return Err(ParseError::MissingCloseParen),
        }
    }
}

// {1,2;3,4}: ',' separates columns, ';' separates rows
fn parse_array(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let mut rows = vec![Vec::new()];
    let mut pos = pos;

    loop {
        let (item, new_pos) = parse_unary(tokens, pos)?;
        if let Some(row) = rows.last_mut() {
            row.push(item);
        }
        pos = new_pos;

        match tokens.get(pos) {
            Some(Token::Comma) => pos += 1,
            Some(Token::Semicolon) => {
                rows.push(Vec::new());
                pos += 1;
            }
            Some(Token::RBrace) => return Ok((Expr::Array(rows), pos + 1)),
            Some(_) => return Err(ParseError::UnexpectedToken { index: pos }),
            None => return Err(ParseError::UnexpectedEnd),
        }
    }
}

/// Reject bracket nesting or sign runs deeper than `MAX_NESTING`.
/// The descent recurses once per bracket level.
fn check_nesting(tokens: &[Token]) -> Result<(), ParseError> {
    let mut depth: usize = 0;
    let mut signs: usize = 0;
    let mut prev: Option<&Token> = None;

    for token in tokens {
        match token {
            Token::LParen | Token::LBrace => depth += 1,
            Token::RParen | Token::RBrace => depth = depth.saturating_sub(1),
            _ => {}
        }

        let is_sign = matches!(token, Token::Plus | Token::Minus) && !ends_operand(prev);
        signs = if is_sign { signs + 1 } else { 0 };

        if depth > MAX_NESTING || signs > MAX_NESTING {
            return Err(ParseError::TooDeep);
        }
        prev = Some(token);
    }
    Ok(())
}

fn ends_operand(token: Option<&Token>) -> bool {
    matches!(
        token,
        Some(
            Token::Number(_)
                | Token::StringLit(_)
                | Token::ErrorLit(_)
                | Token::CellRef { .. }
                | Token::Ident(_)
                | Token::RParen
                | Token::RBrace
                | Token::Percent
        )
    )
}

fn binary(op: Op, left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(a1: &str) -> CellAddress {
        CellAddress::parse_a1(a1).unwrap()
    }

    #[test]
    fn parses_precedence() {
        let expr = parse("1+2*3").unwrap();
        match expr {
            Expr::BinaryOp { op: Op::Add, right, .. } => {
                assert!(matches!(*right, Expr::BinaryOp { op: Op::Mul, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_nested_functions_and_ranges() {
        let expr = parse("IF(SUM(A1:A5)>10,TRUE,FALSE)").unwrap();
        let Expr::Function { name, args } = expr else { panic!("expected function") };
        assert_eq!(name, "IF");
        assert_eq!(args.len(), 3);
        assert_eq!(args[1], Expr::Boolean(true));
        let Expr::BinaryOp { op: Op::Gt, left, .. } = &args[0] else { panic!("expected comparison") };
        let Expr::Function { args: sum_args, .. } = left.as_ref() else { panic!("expected SUM") };
        assert_eq!(sum_args[0], Expr::Range { sheet: None, start: cell("A1"), end: cell("A5") });
    }

    #[test]
    fn parses_sheet_qualified_refs() {
        assert_eq!(
            parse("'Bob''s Data'!B2").unwrap(),
            Expr::CellRef { sheet: Some("Bob's Data".into()), cell: cell("B2"), col_abs: false, row_abs: false }
        );
        assert_eq!(
            parse("Sheet2!$A$1:B5").unwrap(),
            Expr::Range { sheet: Some("Sheet2".into()), start: cell("A1"), end: cell("B5") }
        );
    }

    #[test]
    fn parses_whole_column_and_row_ranges() {
        assert_eq!(parse("A:C").unwrap(), Expr::ColumnRange { sheet: None, start_col: 0, end_col: 2 });
        assert_eq!(parse("2:4").unwrap(), Expr::RowRange { sheet: None, start_row: 1, end_row: 3 });
    }

    #[test]
    fn parses_literals() {
        assert_eq!(parse("\"say \"\"hi\"\"\"").unwrap(), Expr::Text("say \"hi\"".into()));
        assert_eq!(parse("#n/a").unwrap(), Expr::Error("#N/A".into()));
        assert_eq!(parse("1.5E3").unwrap(), Expr::Number(1500.0));
        assert_eq!(parse("{1,2;3,4}").unwrap(), Expr::Array(vec![
            vec![Expr::Number(1.0), Expr::Number(2.0)],
            vec![Expr::Number(3.0), Expr::Number(4.0)],
        ]));
    }

    #[test]
    fn empty_arguments_and_semicolons() {
        let Expr::Function { args, .. } = parse("IF(A1;1;)").unwrap() else { panic!() };
        assert_eq!(args.len(), 3);
        assert_eq!(args[2], Expr::Empty);
    }

    #[test]
    fn incomplete_input_fails() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("SUM("), Err(ParseError::MissingCloseParen));
        assert_eq!(parse("1+"), Err(ParseError::UnexpectedEnd));
        assert!(parse("\"abc").is_err());
        assert!(parse("Sheet1!").is_err());
        assert!(parse("A1)").is_err());
        assert!(parse("1 @ 2").is_err());
    }

    #[test]
    fn out_of_range_reference_is_a_name() {
        // XFE is past the last column, so XFE1 is not a cell
        assert_eq!(parse("XFE1").unwrap(), Expr::Name("XFE1".into()));
    }

    #[test]
    fn error_display() {
        assert_eq!(ParseError::MissingCloseParen.to_string(), "missing closing parenthesis");
        assert_eq!(
            ParseError::UnexpectedChar { ch: '@', pos: 2 }.to_string(),
            "unexpected character '@' at 2"
        );
    }

    #[test]
    fn ast_serializes_for_inspection() {
        let json = serde_json::to_value(parse("SUM(Data!A1, 2)").unwrap()).unwrap();
        assert_eq!(json["Function"]["name"], "SUM");
        assert_eq!(json["Function"]["args"][0]["CellRef"]["sheet"], "Data");
        assert_eq!(json["Function"]["args"][1]["Number"], 2.0);
    }

    #[test]
    fn stacked_signs_fold_into_negations() {
        assert_eq!(parse("-+-1").unwrap(), Expr::Negate(Box::new(Expr::Negate(Box::new(Expr::Number(1.0))))));
        assert_eq!(parse("-5%").unwrap(), Expr::Negate(Box::new(Expr::Percent(Box::new(Expr::Number(5.0))))));
        assert!(parse("1--1").is_ok());
    }

    #[test]
    fn nesting_is_capped() {
        let at_limit = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(parse(&at_limit).is_ok());

        let over = format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert_eq!(parse(&over), Err(ParseError::TooDeep));
        assert_eq!(parse(&"SUM(".repeat(1_000)), Err(ParseError::TooDeep));
        assert_eq!(parse(&format!("{}1", "-".repeat(1_000))), Err(ParseError::TooDeep));
        assert_eq!(parse(&format!("{{{}", "{".repeat(100))), Err(ParseError::TooDeep));

        // Binary minus chains are not stacked signs
        let chain = vec!["1"; 500].join("-");
        assert!(parse(&chain).is_ok());
    }

    #[test]
    fn length_is_capped() {
        assert_eq!(parse(&"(".repeat(50_000)), Err(ParseError::TooLong));
        assert_eq!(parse(&format!("{}1", "-".repeat(50_000))), Err(ParseError::TooLong));
    }
}
