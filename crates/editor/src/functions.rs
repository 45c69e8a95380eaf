//! Function metadata and the registry autocomplete draws from.
//!
//! `FUNCTIONS` carries signatures and per-parameter help for signature
//! popups; `FunctionRegistry` is the narrower name/description view that
//! autocomplete filters.

use serde::Serialize;

// ============================================================================
// Function Metadata
// ============================================================================

/// Information about a formula function
#[derive(Debug, Clone, Serialize)]
pub struct FunctionInfo {
    pub name: &'static str,
    pub signature: &'static str,
    pub description: &'static str,
    pub category: FunctionCategory,
    pub parameters: &'static [ParameterInfo],
}

/// Parameter information for signature help
#[derive(Debug, Clone, Serialize)]
pub struct ParameterInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub optional: bool,
    pub repeatable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FunctionCategory {
    Math,
    Logical,
    Text,
    Lookup,
    DateTime,
    Statistical,
    Conditional,
}

const fn required(name: &'static str, description: &'static str) -> ParameterInfo {
    ParameterInfo { name, description, optional: false, repeatable: false }
}

const fn optional(name: &'static str, description: &'static str) -> ParameterInfo {
    ParameterInfo { name, description, optional: true, repeatable: false }
}

const fn repeated(name: &'static str, description: &'static str) -> ParameterInfo {
    ParameterInfo { name, description, optional: true, repeatable: true }
}

const fn function(
    name: &'static str,
    signature: &'static str,
    description: &'static str,
    category: FunctionCategory,
    parameters: &'static [ParameterInfo],
) -> FunctionInfo {
    FunctionInfo { name, signature, description, category, parameters }
}

use FunctionCategory::*;

/// Built-in functions, grouped by category
pub static FUNCTIONS: &[FunctionInfo] = &[
    // Math
    function("SUM", "SUM(number1, [number2], ...)", "Adds all the numbers in a range of cells.", Math,
        &[required("number1", "The first number or range to add."), repeated("number2", "Additional numbers or ranges to add.")]),
    function("PRODUCT", "PRODUCT(number1, [number2], ...)", "Multiplies all the numbers given as arguments.", Math,
        &[required("number1", "The first number or range to multiply."), repeated("number2", "Additional numbers or ranges.")]),
    function("ABS", "ABS(number)", "Returns the absolute value of a number.", Math,
        &[required("number", "The number to get the absolute value of.")]),
    function("ROUND", "ROUND(number, num_digits)", "Rounds a number to a specified number of digits.", Math,
        &[required("number", "The number to round."), required("num_digits", "The number of digits to round to.")]),
    function("ROUNDUP", "ROUNDUP(number, num_digits)", "Rounds a number up, away from zero.", Math,
        &[required("number", "The number to round up."), required("num_digits", "The number of digits to round to.")]),
    function("ROUNDDOWN", "ROUNDDOWN(number, num_digits)", "Rounds a number down, toward zero.", Math,
        &[required("number", "The number to round down."), required("num_digits", "The number of digits to round to.")]),
    function("INT", "INT(number)", "Rounds a number down to the nearest integer.", Math,
        &[required("number", "The number to round down.")]),
    function("MOD", "MOD(number, divisor)", "Returns the remainder after division.", Math,
        &[required("number", "The number to divide."), required("divisor", "The number to divide by.")]),
    function("POWER", "POWER(number, power)", "Returns the result of a number raised to a power.", Math,
        &[required("number", "The base number."), required("power", "The exponent.")]),
    function("SQRT", "SQRT(number)", "Returns the square root of a number.", Math,
        &[required("number", "The number to get the square root of.")]),
    function("LOG10", "LOG10(number)", "Returns the base-10 logarithm of a number.", Math,
        &[required("number", "The positive number to take the logarithm of.")]),
    function("SUMPRODUCT", "SUMPRODUCT(array1, [array2], ...)", "Multiplies corresponding entries and returns the sum.", Math,
        &[required("array1", "The first array or range."), repeated("array2", "Additional arrays of the same size.")]),
    // Statistical
    function("AVERAGE", "AVERAGE(number1, [number2], ...)", "Returns the average of the arguments.", Statistical,
        &[required("number1", "The first number or range."), repeated("number2", "Additional numbers or ranges.")]),
    function("MIN", "MIN(number1, [number2], ...)", "Returns the smallest value in a set of values.", Statistical,
        &[required("number1", "The first number or range."), repeated("number2", "Additional numbers or ranges.")]),
    function("MAX", "MAX(number1, [number2], ...)", "Returns the largest value in a set of values.", Statistical,
        &[required("number1", "The first number or range."), repeated("number2", "Additional numbers or ranges.")]),
    function("MEDIAN", "MEDIAN(number1, [number2], ...)", "Returns the median of the given numbers.", Statistical,
        &[required("number1", "The first number or range."), repeated("number2", "Additional numbers or ranges.")]),
    function("COUNT", "COUNT(value1, [value2], ...)", "Counts the number of cells that contain numbers.", Statistical,
        &[required("value1", "The first value or range."), repeated("value2", "Additional values or ranges.")]),
    function("COUNTA", "COUNTA(value1, [value2], ...)", "Counts the number of non-empty cells.", Statistical,
        &[required("value1", "The first value or range."), repeated("value2", "Additional values or ranges.")]),
    function("COUNTBLANK", "COUNTBLANK(range)", "Counts empty cells in a range.", Statistical,
        &[required("range", "The range to count blanks in.")]),
    function("STDEV", "STDEV(number1, [number2], ...)", "Estimates standard deviation based on a sample.", Statistical,
        &[required("number1", "The first number or range."), repeated("number2", "Additional numbers or ranges.")]),
    function("STDEV.P", "STDEV.P(number1, [number2], ...)", "Calculates standard deviation of an entire population.", Statistical,
        &[required("number1", "The first number or range."), repeated("number2", "Additional numbers or ranges.")]),
    // Conditional aggregation
    function("SUMIF", "SUMIF(range, criteria, [sum_range])", "Adds the cells specified by a given condition.", Conditional,
        &[required("range", "The range to evaluate."), required("criteria", "The condition to match."), optional("sum_range", "The cells to add, if different from range.")]),
    function("SUMIFS", "SUMIFS(sum_range, criteria_range1, criteria1, ...)", "Adds the cells that meet multiple criteria.", Conditional,
        &[required("sum_range", "The cells to add."), required("criteria_range1", "The first range to evaluate."), required("criteria1", "The condition for the first range."), repeated("criteria_range2", "Additional range/criteria pairs.")]),
    function("COUNTIF", "COUNTIF(range, criteria)", "Counts cells that meet a condition.", Conditional,
        &[required("range", "The range to count."), required("criteria", "The condition to match.")]),
    function("COUNTIFS", "COUNTIFS(criteria_range1, criteria1, ...)", "Counts cells that meet multiple criteria.", Conditional,
        &[required("criteria_range1", "The first range to evaluate."), required("criteria1", "The condition for the first range."), repeated("criteria_range2", "Additional range/criteria pairs.")]),
    function("AVERAGEIF", "AVERAGEIF(range, criteria, [average_range])", "Averages the cells that meet a condition.", Conditional,
        &[required("range", "The range to evaluate."), required("criteria", "The condition to match."), optional("average_range", "The cells to average.")]),
    // Logical
    function("IF", "IF(condition, value_if_true, [value_if_false])", "Returns one value if a condition is true and another if false.", Logical,
        &[required("condition", "The condition to test."), required("value_if_true", "Value returned when the condition is true."), optional("value_if_false", "Value returned when the condition is false.")]),
    function("IFERROR", "IFERROR(value, value_if_error)", "Returns a fallback value if an expression is an error.", Logical,
        &[required("value", "The value to check for an error."), required("value_if_error", "Value returned when value is an error.")]),
    function("IFS", "IFS(condition1, value1, ...)", "Returns the value for the first true condition.", Logical,
        &[required("condition1", "The first condition."), required("value1", "Value when the first condition is true."), repeated("condition2", "Additional condition/value pairs.")]),
    function("AND", "AND(logical1, [logical2], ...)", "Returns TRUE if all arguments are TRUE.", Logical,
        &[required("logical1", "The first condition."), repeated("logical2", "Additional conditions.")]),
    function("OR", "OR(logical1, [logical2], ...)", "Returns TRUE if any argument is TRUE.", Logical,
        &[required("logical1", "The first condition."), repeated("logical2", "Additional conditions.")]),
    function("NOT", "NOT(logical)", "Reverses the logic of its argument.", Logical,
        &[required("logical", "The value to reverse.")]),
    function("TRUE", "TRUE()", "Returns the logical value TRUE.", Logical, &[]),
    function("FALSE", "FALSE()", "Returns the logical value FALSE.", Logical, &[]),
    function("ISBLANK", "ISBLANK(value)", "Returns TRUE if the value is empty.", Logical,
        &[required("value", "The value to test.")]),
    function("ISNUMBER", "ISNUMBER(value)", "Returns TRUE if the value is a number.", Logical,
        &[required("value", "The value to test.")]),
    // Text
    function("CONCATENATE", "CONCATENATE(text1, [text2], ...)", "Joins several text strings into one.", Text,
        &[required("text1", "The first text item."), repeated("text2", "Additional text items.")]),
    function("LEFT", "LEFT(text, [num_chars])", "Returns the leftmost characters of a text value.", Text,
        &[required("text", "The text to extract from."), optional("num_chars", "Number of characters, default 1.")]),
    function("RIGHT", "RIGHT(text, [num_chars])", "Returns the rightmost characters of a text value.", Text,
        &[required("text", "The text to extract from."), optional("num_chars", "Number of characters, default 1.")]),
    function("MID", "MID(text, start_num, num_chars)", "Returns characters from the middle of a text string.", Text,
        &[required("text", "The text to extract from."), required("start_num", "Position of the first character."), required("num_chars", "Number of characters.")]),
    function("LEN", "LEN(text)", "Returns the number of characters in a text string.", Text,
        &[required("text", "The text to measure.")]),
    function("TRIM", "TRIM(text)", "Removes extra spaces from text.", Text,
        &[required("text", "The text to trim.")]),
    function("UPPER", "UPPER(text)", "Converts text to uppercase.", Text,
        &[required("text", "The text to convert.")]),
    function("LOWER", "LOWER(text)", "Converts text to lowercase.", Text,
        &[required("text", "The text to convert.")]),
    function("TEXT", "TEXT(value, format_text)", "Formats a number as text.", Text,
        &[required("value", "The number to format."), required("format_text", "The number format to apply.")]),
    function("SUBSTITUTE", "SUBSTITUTE(text, old_text, new_text, [instance_num])", "Replaces occurrences of text.", Text,
        &[required("text", "The original text."), required("old_text", "The text to replace."), required("new_text", "The replacement."), optional("instance_num", "Which occurrence to replace.")]),
    // Lookup
    function("VLOOKUP", "VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])", "Looks up a value in the first column of a table.", Lookup,
        &[required("lookup_value", "The value to search for."), required("table_array", "The table to search."), required("col_index_num", "Column number to return."), optional("range_lookup", "FALSE for an exact match.")]),
    function("HLOOKUP", "HLOOKUP(lookup_value, table_array, row_index_num, [range_lookup])", "Looks up a value in the first row of a table.", Lookup,
        &[required("lookup_value", "The value to search for."), required("table_array", "The table to search."), required("row_index_num", "Row number to return."), optional("range_lookup", "FALSE for an exact match.")]),
    function("XLOOKUP", "XLOOKUP(lookup_value, lookup_array, return_array, [if_not_found])", "Searches a range and returns the matching item.", Lookup,
        &[required("lookup_value", "The value to search for."), required("lookup_array", "The range to search."), required("return_array", "The range to return from."), optional("if_not_found", "Value when nothing matches.")]),
    function("INDEX", "INDEX(array, row_num, [col_num])", "Returns a value at a given position in a range.", Lookup,
        &[required("array", "The range to index."), required("row_num", "The row position."), optional("col_num", "The column position.")]),
    function("MATCH", "MATCH(lookup_value, lookup_array, [match_type])", "Returns the position of a value in a range.", Lookup,
        &[required("lookup_value", "The value to find."), required("lookup_array", "The range to search."), optional("match_type", "1, 0, or -1.")]),
    // Date & time
    function("TODAY", "TODAY()", "Returns the current date.", DateTime, &[]),
    function("NOW", "NOW()", "Returns the current date and time.", DateTime, &[]),
    function("DATE", "DATE(year, month, day)", "Creates a date from year, month and day.", DateTime,
        &[required("year", "The year."), required("month", "The month (1-12)."), required("day", "The day of the month.")]),
    function("YEAR", "YEAR(date)", "Returns the year of a date.", DateTime,
        &[required("date", "The date to extract the year from.")]),
    function("MONTH", "MONTH(date)", "Returns the month of a date.", DateTime,
        &[required("date", "The date to extract the month from.")]),
    function("DAY", "DAY(date)", "Returns the day of the month of a date.", DateTime,
        &[required("date", "The date to extract the day from.")]),
];

// ============================================================================
// Lookup
// ============================================================================

/// Look up a function by name (case-insensitive)
pub fn get_function(name: &str) -> Option<&'static FunctionInfo> {
    let upper = name.to_ascii_uppercase();
    FUNCTIONS.iter().find(|f| f.name == upper)
}

impl FunctionInfo {
    /// Parameter to highlight for a 0-based argument index. Arguments past the
    /// end land on a trailing repeatable parameter; otherwise there is none.
    pub fn parameter_for_arg(&self, arg_index: usize) -> Option<usize> {
        if arg_index < self.parameters.len() {
            return Some(arg_index);
        }
        match self.parameters.last() {
            Some(last) if last.repeatable => Some(self.parameters.len() - 1),
            _ => None,
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// What autocomplete needs to know about a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: Option<String>,
}

/// Source of function names for autocomplete
pub trait FunctionRegistry {
    fn list_functions(&self) -> Vec<FunctionDefinition>;
}

/// The built-in function table
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFunctions;

impl FunctionRegistry for BuiltinFunctions {
    fn list_functions(&self) -> Vec<FunctionDefinition> {
        FUNCTIONS
            .iter()
            .map(|f| FunctionDefinition {
                name: f.name.to_string(),
                description: Some(f.description.to_string()),
            })
            .collect()
    }
}
