use serde::{Deserialize, Serialize};

/// Stored content of a single cell.
///
/// Formulas are stored without their leading `=`; `raw_display()` puts it back
/// so an editor can seed its buffer from the cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    Formula { formula: String },
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// Text a user would see in the editor when they start editing this cell.
    pub fn raw_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Boolean(b) => if *b { "TRUE".to_string() } else { "FALSE".to_string() },
            CellValue::Formula { formula } => format!("={}", formula),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Result of interpreting what the user typed into a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellInput {
    /// Formula body with the leading `=` stripped.
    Formula(String),
    Value(CellValue),
}

/// Interpret committed editor text as either a formula or a plain value.
///
/// - `=...` is a formula (a lone `=` is kept as text)
/// - a leading apostrophe forces text (`'123` stores "123")
/// - numbers, then TRUE/FALSE, then text
/// - blank input clears the cell
pub fn parse_user_input(input: &str) -> CellInput {
    if let Some(body) = input.strip_prefix('=') {
        if body.trim().is_empty() {
            return CellInput::Value(CellValue::Text(input.to_string()));
        }
        return CellInput::Formula(body.to_string());
    }

    if let Some(forced) = input.strip_prefix('\'') {
        return CellInput::Value(CellValue::Text(forced.to_string()));
    }

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return CellInput::Value(CellValue::Empty);
    }

    if let Ok(num) = trimmed.parse::<f64>() {
        if num.is_finite() {
            return CellInput::Value(CellValue::Number(num));
        }
    }

    match trimmed.to_ascii_uppercase().as_str() {
        "TRUE" => CellInput::Value(CellValue::Boolean(true)),
        "FALSE" => CellInput::Value(CellValue::Boolean(false)),
        _ => CellInput::Value(CellValue::Text(input.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_input_strips_equals() {
        assert_eq!(parse_user_input("=SUM(A1:A3)"), CellInput::Formula("SUM(A1:A3)".to_string()));
        assert_eq!(parse_user_input("=42"), CellInput::Formula("42".to_string()));
    }

    #[test]
    fn lone_equals_is_text() {
        assert_eq!(parse_user_input("="), CellInput::Value(CellValue::Text("=".to_string())));
    }

    #[test]
    fn numbers_booleans_and_text() {
        assert_eq!(parse_user_input(" 3.5 "), CellInput::Value(CellValue::Number(3.5)));
        assert_eq!(parse_user_input("true"), CellInput::Value(CellValue::Boolean(true)));
        assert_eq!(parse_user_input("hello"), CellInput::Value(CellValue::Text("hello".to_string())));
        assert_eq!(parse_user_input(""), CellInput::Value(CellValue::Empty));
        assert_eq!(parse_user_input("inf"), CellInput::Value(CellValue::Text("inf".to_string())));
    }

    #[test]
    fn apostrophe_forces_text() {
        assert_eq!(parse_user_input("'123"), CellInput::Value(CellValue::Text("123".to_string())));
    }

    #[test]
    fn raw_display_round_trips_formulas() {
        let v = CellValue::Formula { formula: "A1+1".to_string() };
        assert_eq!(v.raw_display(), "=A1+1");
        assert_eq!(CellValue::Number(42.0).raw_display(), "42");
        assert_eq!(CellValue::Number(0.5).raw_display(), "0.5");
        assert_eq!(CellValue::Boolean(false).raw_display(), "FALSE");
    }
}
