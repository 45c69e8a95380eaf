//! Cell addresses and rectangular ranges.
//!
//! Rows and columns are stored zero-based, the way the grid indexes them.
//! A1 text uses one-based rows and base-26 column letters (`A` = 1,
//! `Z` = 26, `AA` = 27).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of rows in a worksheet (1,048,576).
pub const MAX_ROWS: usize = 1_048_576;
/// Number of columns in a worksheet (16,384, column `XFD`).
pub const MAX_COLS: usize = 16_384;

/// A single cell position (zero-based row and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Build an address from one-based row/column numbers.
    /// Returns None when either is zero or beyond the sheet limits.
    pub fn from_one_based(row: usize, col: usize) -> Option<Self> {
        if row == 0 || col == 0 || row > MAX_ROWS || col > MAX_COLS {
            return None;
        }
        Some(Self { row: row - 1, col: col - 1 })
    }

    /// Parse plain A1 text ("B5", "aa10"). `$` markers are accepted and ignored.
    pub fn parse_a1(input: &str) -> Option<Self> {
        let cleaned: String = input.trim().chars().filter(|c| *c != '$').collect();
        let letter_end = cleaned.chars().take_while(|c| c.is_ascii_alphabetic()).count();
        if letter_end == 0 || letter_end == cleaned.len() {
            return None;
        }
        let col = column_index(&cleaned[..letter_end])?;
        let digits = &cleaned[letter_end..];
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let row: usize = digits.parse().ok()?;
        Self::from_one_based(row, col)
    }

    /// Render as A1 text: (0, 0) -> "A1"
    pub fn to_a1(&self) -> String {
        format!("{}{}", col_to_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// A rectangular block of cells. A single cell has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub const fn new(start: CellAddress, end: CellAddress) -> Self {
        Self { start, end }
    }

    pub const fn single(cell: CellAddress) -> Self {
        Self { start: cell, end: cell }
    }

    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }

    /// Same range with start at the top-left and end at the bottom-right.
    pub fn normalized(&self) -> Self {
        Self {
            start: CellAddress::new(self.start.row.min(self.end.row), self.start.col.min(self.end.col)),
            end: CellAddress::new(self.start.row.max(self.end.row), self.start.col.max(self.end.col)),
        }
    }

    pub fn contains(&self, cell: CellAddress) -> bool {
        let n = self.normalized();
        cell.row >= n.start.row && cell.row <= n.end.row && cell.col >= n.start.col && cell.col <= n.end.col
    }

    /// Render as "A1" for a single cell, "A1:B5" otherwise. Endpoints are kept as written.
    pub fn to_a1(&self) -> String {
        if self.is_single_cell() {
            self.start.to_a1()
        } else {
            format!("{}:{}", self.start.to_a1(), self.end.to_a1())
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Convert column letters to a one-based index: A -> 1, Z -> 26, AA -> 27.
/// Accepts 1-3 ASCII letters in either case; no sheet-limit check.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(letters.chars().fold(0usize, |acc, c| {
        acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1)
    }))
}

/// Convert a zero-based column index to letters: 0 -> A, 25 -> Z, 26 -> AA
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}
