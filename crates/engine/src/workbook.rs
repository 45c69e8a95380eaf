use crate::sheet::{is_valid_sheet_name, normalize_sheet_name, Sheet, SheetId};

/// A workbook containing one or more sheets.
///
/// Which sheet is on screen is view state and lives with the editor, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    /// Next ID to assign to a new sheet. Monotonically increasing, never reused.
    next_sheet_id: u64,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// Create a new workbook with one default sheet
    pub fn new() -> Self {
        Self {
            sheets: vec![Sheet::new(SheetId(1), "Sheet1")],
            next_sheet_id: 2,
        }
    }

    fn generate_sheet_id(&mut self) -> SheetId {
        let id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        id
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Find a sheet index by name (case-insensitive)
    pub fn sheet_index_by_name(&self, name: &str) -> Option<usize> {
        let key = normalize_sheet_name(name);
        self.sheets.iter().position(|s| s.name_key() == key)
    }

    pub fn sheet_name_exists(&self, name: &str) -> bool {
        self.sheet_index_by_name(name).is_some()
    }

    /// Add a new sheet with the next free "SheetN" name and return its index
    pub fn add_sheet(&mut self) -> usize {
        let mut num = self.sheets.len() + 1;
        let mut name = format!("Sheet{}", num);
        while self.sheet_name_exists(&name) {
            num += 1;
            name = format!("Sheet{}", num);
        }
        let id = self.generate_sheet_id();
        self.sheets.push(Sheet::new(id, &name));
        self.sheets.len() - 1
    }

    /// Add a new sheet with a specific name.
    /// Returns None if the name is invalid or already taken.
    pub fn add_sheet_named(&mut self, name: &str) -> Option<usize> {
        if !is_valid_sheet_name(name) || self.sheet_name_exists(name) {
            return None;
        }
        let id = self.generate_sheet_id();
        self.sheets.push(Sheet::new(id, name));
        Some(self.sheets.len() - 1)
    }

    /// Delete a sheet by index.
    /// Returns false for an invalid index or when it is the last sheet.
    pub fn delete_sheet(&mut self, index: usize) -> bool {
        if self.sheets.len() <= 1 || index >= self.sheets.len() {
            return false;
        }
        self.sheets.remove(index);
        true
    }

    /// Rename a sheet. Fails on an invalid index, an invalid name, or a name
    /// used by another sheet (case-insensitive).
    pub fn rename_sheet(&mut self, index: usize, new_name: &str) -> bool {
        if !is_valid_sheet_name(new_name) {
            return false;
        }
        let key = normalize_sheet_name(new_name);
        let Some(id) = self.sheets.get(index).map(|s| s.id) else {
            return false;
        };
        if self.sheets.iter().any(|s| s.id != id && s.name_key() == key) {
            return false;
        }
        self.sheets[index].set_name(new_name);
        true
    }

    /// Copy of this workbook with the sheet at `index` replaced.
    /// An out-of-range index returns an unchanged copy.
    pub fn with_sheet(&self, index: usize, sheet: Sheet) -> Workbook {
        let mut next = self.clone();
        if let Some(slot) = next.sheets.get_mut(index) {
            *slot = sheet;
        } else {
            log::warn!("with_sheet: sheet index {} out of range", index);
        }
        next
    }
}
