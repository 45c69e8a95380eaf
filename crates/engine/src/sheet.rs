use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use gridedit_core::CellAddress;

use crate::cell::CellValue;

/// Stable sheet identity. Survives renames and reordering; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SheetId(pub u64);

/// Normalize a sheet name for case-insensitive comparison
pub fn normalize_sheet_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A sheet name is valid when it is non-empty after trimming and avoids the
/// characters Excel reserves: `: \ / ? * [ ]`
pub fn is_valid_sheet_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty()
        && trimmed.chars().count() <= 31
        && !trimmed.chars().any(|c| matches!(c, ':' | '\\' | '/' | '?' | '*' | '[' | ']'))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub id: SheetId,
    pub name: String,
    name_key: String,
    cells: FxHashMap<CellAddress, CellValue>,
}

impl Sheet {
    pub fn new(id: SheetId, name: &str) -> Self {
        Self {
            id,
            name: name.trim().to_string(),
            name_key: normalize_sheet_name(name),
            cells: FxHashMap::default(),
        }
    }

    pub fn name_key(&self) -> &str {
        &self.name_key
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.trim().to_string();
        self.name_key = normalize_sheet_name(name);
    }

    pub fn get(&self, address: CellAddress) -> Option<&CellValue> {
        self.cells.get(&address)
    }

    /// Editor text for a cell ("" for empty, "=..." for formulas).
    pub fn get_raw(&self, address: CellAddress) -> String {
        self.cells.get(&address).map(CellValue::raw_display).unwrap_or_default()
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Store a value in place. Storing `Empty` removes the cell.
    pub fn set_value(&mut self, address: CellAddress, value: CellValue) {
        if value.is_empty() {
            self.cells.remove(&address);
        } else {
            self.cells.insert(address, value);
        }
    }

    /// Store a formula body (no leading `=`) in place.
    pub fn set_formula(&mut self, address: CellAddress, formula: &str) {
        self.cells.insert(address, CellValue::Formula { formula: formula.to_string() });
    }

    /// Copy of this sheet with `value` written at `address`.
    pub fn with_value(&self, address: CellAddress, value: CellValue) -> Sheet {
        let mut next = self.clone();
        next.set_value(address, value);
        next
    }

    /// Copy of this sheet with a formula written at `address`.
    pub fn with_formula(&self, address: CellAddress, formula: &str) -> Sheet {
        let mut next = self.clone();
        next.set_formula(address, formula);
        next
    }
}
