//! Cell editing state machine
//!
//! `EditorState` owns the document history, the active sheet, the selected
//! cell and at most one `CellEditingState`. The inline cell editor and the
//! formula bar both read that one state and change it only through
//! `EditorState::dispatch`.
//!
//! Handles:
//! - Entering, updating, committing and cancelling an edit
//! - Sheet switches while editing (commit still targets the sheet editing began on)
//! - Autocomplete acceptance and F4 reference cycling on the live text
//! - Sheet add/rename/delete and undo/redo at the document level

use serde::Serialize;

use gridedit_config::{ref_color, Color, Settings};
use gridedit_core::{CellAddress, CellRange, MAX_COLS, MAX_ROWS};
use gridedit_engine::cell::{parse_user_input, CellInput};
use gridedit_engine::sheet::Sheet;
use gridedit_engine::workbook::Workbook;

use crate::autocomplete::{accept_autocomplete, detect_context, filter_functions, AcceptRequest, AutocompleteContext};
use crate::formula_context::{analyze, FormulaAnalysis};
use crate::functions::{BuiltinFunctions, FunctionDefinition, FunctionRegistry};
use crate::history::History;
use crate::keybindings::{action_for_key, KeyAction, KeyInput};
use crate::ref_insert::{build_reference_text, cycle_reference, is_insertion_point};
use crate::text_editing::{char_len, splice, TextEdit};
use crate::tokenizer::{tokenize, TokenKind};

// ============================================================================
// Editing State
// ============================================================================

/// How the edit was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryMode {
    /// F2 / double-click: keep the cell content
    Enter,
    /// Typing over the cell: the typed char replaces the content
    Replace,
    /// Click into the formula bar
    FormulaBar,
}

/// Which surface currently has input focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EditOrigin {
    Cell,
    FormulaBar,
}

/// In-progress IME composition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CellEditComposition {
    pub is_composing: bool,
    pub text: String,
    pub start_offset: usize,
}

/// The edit in progress. Offsets are char offsets into `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellEditingState {
    pub address: CellAddress,
    pub entry_mode: EntryMode,
    pub origin: EditOrigin,
    pub text: String,
    pub caret_offset: usize,
    pub selection_end: usize,
    pub composition: CellEditComposition,
    /// Sheet the edit began on; a commit always writes here
    pub editing_sheet_index: usize,
}

impl CellEditingState {
    /// Formula mode follows the text, it is never stored
    pub fn is_formula_mode(&self) -> bool {
        self.text.starts_with('=')
    }

    pub fn has_selection(&self) -> bool {
        self.selection_end != self.caret_offset
    }

    pub fn analysis(&self) -> FormulaAnalysis {
        analyze(&self.text, self.caret_offset)
    }

    fn apply(&mut self, edit: TextEdit) {
        self.text = edit.text;
        self.caret_offset = edit.caret_offset;
        self.selection_end = edit.caret_offset;
    }
}

// ============================================================================
// Actions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EditAction {
    EnterEdit {
        address: CellAddress,
        entry_mode: EntryMode,
        initial_char: Option<char>,
    },
    UpdateText {
        text: String,
        caret_offset: usize,
        selection_end: usize,
    },
    SetOrigin(EditOrigin),
    SetComposition(CellEditComposition),
    /// Splice reference text at the caret
    InsertReference(String),
    Commit,
    Cancel,
    /// Commit (when editing) then move the selection
    CommitAndMove { d_row: isize, d_col: isize },
    /// Move the selection; ignored while editing
    MoveSelection { d_row: isize, d_col: isize },
    AcceptAutocomplete { function_name: String },
    /// Hide suggestions until the text changes
    DismissAutocomplete,
    CycleReference,
    SetActiveSheet(usize),
    AddSheet { name: Option<String> },
    RenameSheet { index: usize, name: String },
    DeleteSheet(usize),
    Undo,
    Redo,
}

// ============================================================================
// Editor State
// ============================================================================

pub struct EditorState {
    history: History<Workbook>,
    active_sheet_index: usize,
    selected: CellAddress,
    editing: Option<CellEditingState>,
    autocomplete_dismissed: bool,
    settings: Settings,
    registry: Box<dyn FunctionRegistry>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(Workbook::new(), Settings::default())
    }
}

impl EditorState {
    pub fn new(workbook: Workbook, settings: Settings) -> Self {
        Self {
            history: History::with_max_entries(workbook, settings.history_max_entries),
            active_sheet_index: 0,
            selected: CellAddress::new(0, 0),
            editing: None,
            autocomplete_dismissed: false,
            settings,
            registry: Box::new(BuiltinFunctions),
        }
    }

    /// Use a different function registry for autocomplete
    pub fn with_registry(mut self, registry: impl FunctionRegistry + 'static) -> Self {
        self.registry = Box::new(registry);
        self
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn workbook(&self) -> &Workbook {
        self.history.present()
    }

    pub fn history(&self) -> &History<Workbook> {
        &self.history
    }

    pub fn active_sheet_index(&self) -> usize {
        self.active_sheet_index
    }

    pub fn active_sheet(&self) -> Option<&Sheet> {
        self.workbook().sheet(self.active_sheet_index)
    }

    pub fn selected(&self) -> CellAddress {
        self.selected
    }

    pub fn editing(&self) -> Option<&CellEditingState> {
        self.editing.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Analysis of the text being edited
    pub fn analysis(&self) -> Option<FormulaAnalysis> {
        self.editing.as_ref().map(CellEditingState::analysis)
    }

    /// Autocomplete context for the live text. None outside formula mode,
    /// while composing, or after the popup was dismissed.
    pub fn autocomplete_context(&self) -> Option<AutocompleteContext> {
        let editing = self.editing.as_ref()?;
        if !editing.is_formula_mode() || editing.composition.is_composing || self.autocomplete_dismissed {
            return None;
        }
        let analysis = editing.analysis();
        detect_context(&analysis.tokens, editing.caret_offset)
    }

    /// Suggestions to show; empty means the popup is closed
    pub fn autocomplete_suggestions(&self) -> Vec<FunctionDefinition> {
        match self.autocomplete_context() {
            Some(ctx) if ctx.should_open => {
                filter_functions(self.registry.as_ref(), &ctx.query, self.settings.autocomplete_limit)
            }
            _ => Vec::new(),
        }
    }

    /// Would a grid click right now insert a reference (rather than commit)?
    pub fn can_insert_reference(&self) -> bool {
        self.editing
            .as_ref()
            .is_some_and(|e| e.is_formula_mode() && is_insertion_point(&e.text, e.caret_offset))
    }

    /// Reference text for a range picked on the active sheet, qualified with
    /// the sheet name when it differs from the sheet being edited.
    pub fn reference_text_for(&self, range: &CellRange) -> Option<String> {
        let editing = self.editing.as_ref()?;
        let workbook = self.workbook();
        let current = workbook.sheet(editing.editing_sheet_index)?;
        let target = workbook.sheet(self.active_sheet_index).map(|s| s.name.as_str());
        Some(build_reference_text(range, &current.name, target))
    }

    /// Highlight color for a cell on the active sheet: the color of the
    /// first reference in the edited formula that covers it.
    pub fn reference_color_at(&self, cell: CellAddress) -> Option<Color> {
        let editing = self.editing.as_ref()?;
        let workbook = self.workbook();
        editing
            .analysis()
            .references
            .iter()
            .filter(|r| match &r.sheet_name {
                Some(name) => workbook.sheet_index_by_name(name) == Some(self.active_sheet_index),
                None => editing.editing_sheet_index == self.active_sheet_index,
            })
            .find(|r| r.range.contains(cell))
            .map(|r| ref_color(r.color_index))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Apply one action. Returns false when the action was a no-op.
    pub fn dispatch(&mut self, action: EditAction) -> bool {
        match action {
            EditAction::EnterEdit { address, entry_mode, initial_char } => {
                self.enter_edit(address, entry_mode, initial_char)
            }
            EditAction::UpdateText { text, caret_offset, selection_end } => {
                self.update_text(text, caret_offset, selection_end)
            }
            EditAction::SetOrigin(origin) => self.with_editing("set_origin", |editing| {
                editing.origin = origin;
            }),
            EditAction::SetComposition(composition) => self.with_editing("set_composition", |editing| {
                let len = char_len(&editing.text);
                editing.composition = CellEditComposition {
                    start_offset: composition.start_offset.min(len),
                    ..composition
                };
            }),
            EditAction::InsertReference(ref_text) => self.with_editing("insert_reference", |editing| {
                let caret = editing.caret_offset;
                let text = splice(&editing.text, caret, caret, &ref_text);
                editing.apply(TextEdit { text, caret_offset: caret + char_len(&ref_text) });
            }),
            EditAction::Commit => self.commit(),
            EditAction::Cancel => self.cancel(),
            EditAction::CommitAndMove { d_row, d_col } => {
                if self.editing.is_some() {
                    self.commit();
                }
                self.move_selection(d_row, d_col);
                true
            }
            EditAction::MoveSelection { d_row, d_col } => {
                if self.editing.is_some() {
                    log::trace!("move_selection ignored while editing");
                    return false;
                }
                self.move_selection(d_row, d_col);
                true
            }
            EditAction::AcceptAutocomplete { function_name } => self.accept_autocomplete(&function_name),
            EditAction::DismissAutocomplete => {
                if self.editing.is_none() || self.autocomplete_dismissed {
                    return false;
                }
                self.autocomplete_dismissed = true;
                true
            }
            EditAction::CycleReference => self.cycle_reference(),
            EditAction::SetActiveSheet(index) => self.set_active_sheet(index),
            EditAction::AddSheet { name } => self.add_sheet(name.as_deref()),
            EditAction::RenameSheet { index, name } => self.rename_sheet(index, &name),
            EditAction::DeleteSheet(index) => self.delete_sheet(index),
            EditAction::Undo => self.undo(),
            EditAction::Redo => self.redo(),
        }
    }

    /// Map a key press through the key bindings and dispatch the result.
    pub fn handle_key(&mut self, input: &KeyInput) -> bool {
        let suggestions = self.autocomplete_suggestions();
        let Some(key_action) = action_for_key(input, self.editing.as_ref(), !suggestions.is_empty()) else {
            return false;
        };

        let action = match key_action {
            KeyAction::Confirm { reverse } => {
                let (d_row, d_col) = self.settings.enter_direction.delta();
                let sign = if reverse { -1 } else { 1 };
                EditAction::CommitAndMove { d_row: d_row * sign, d_col: d_col * sign }
            }
            KeyAction::ConfirmInPlace => EditAction::Commit,
            KeyAction::ConfirmSideways { reverse } => EditAction::CommitAndMove {
                d_row: 0,
                d_col: if reverse { -1 } else { 1 },
            },
            KeyAction::Cancel => EditAction::Cancel,
            KeyAction::DismissAutocomplete => EditAction::DismissAutocomplete,
            KeyAction::AcceptAutocomplete => match suggestions.into_iter().next() {
                Some(top) => EditAction::AcceptAutocomplete { function_name: top.name },
                None => return false,
            },
            KeyAction::StartEdit => EditAction::EnterEdit {
                address: self.selected,
                entry_mode: EntryMode::Enter,
                initial_char: None,
            },
            KeyAction::StartReplace(c) => EditAction::EnterEdit {
                address: self.selected,
                entry_mode: EntryMode::Replace,
                initial_char: Some(c),
            },
            KeyAction::CycleReference => EditAction::CycleReference,
            KeyAction::Undo => EditAction::Undo,
            KeyAction::Redo => EditAction::Redo,
        };

        self.dispatch(action)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    fn with_editing(&mut self, what: &str, f: impl FnOnce(&mut CellEditingState)) -> bool {
        match self.editing.as_mut() {
            Some(editing) => {
                f(editing);
                true
            }
            None => {
                log::trace!("{} ignored: not editing", what);
                false
            }
        }
    }

    fn enter_edit(&mut self, address: CellAddress, entry_mode: EntryMode, initial_char: Option<char>) -> bool {
        if self.editing.is_some() {
            log::trace!("enter_edit ignored: already editing");
            return false;
        }
        let Some(sheet) = self.active_sheet() else {
            log::trace!("enter_edit ignored: no active sheet at {}", self.active_sheet_index);
            return false;
        };
        if address.row >= MAX_ROWS || address.col >= MAX_COLS {
            log::trace!("enter_edit ignored: {:?} outside the sheet", address);
            return false;
        }

        let text = match (entry_mode, initial_char) {
            (EntryMode::Replace, Some(c)) => c.to_string(),
            _ => sheet.get_raw(address),
        };
        let caret = char_len(&text);
        let origin = match entry_mode {
            EntryMode::FormulaBar => EditOrigin::FormulaBar,
            EntryMode::Enter | EntryMode::Replace => EditOrigin::Cell,
        };

        log::debug!("enter edit {} on sheet {} ({:?})", address, self.active_sheet_index, entry_mode);

        self.editing = Some(CellEditingState {
            address,
            entry_mode,
            origin,
            text,
            caret_offset: caret,
            selection_end: caret,
            composition: CellEditComposition::default(),
            editing_sheet_index: self.active_sheet_index,
        });
        self.selected = address;
        self.autocomplete_dismissed = false;
        true
    }

    fn update_text(&mut self, text: String, caret_offset: usize, selection_end: usize) -> bool {
        let Some(editing) = self.editing.as_mut() else {
            log::trace!("update_text ignored: not editing");
            return false;
        };
        let len = char_len(&text);
        editing.text = text;
        editing.caret_offset = caret_offset.min(len);
        editing.selection_end = selection_end.min(len);
        self.autocomplete_dismissed = false;
        true
    }

    fn commit(&mut self) -> bool {
        let Some(editing) = self.editing.take() else {
            log::trace!("commit ignored: not editing");
            return false;
        };
        self.autocomplete_dismissed = false;

        let text = if self.settings.auto_close_parens {
            close_unmatched_parens(&editing.text)
        } else {
            editing.text
        };
        let sheet_index = editing.editing_sheet_index;

        let workbook = self.history.present();
        let Some(sheet) = workbook.sheet(sheet_index) else {
            log::warn!("commit dropped: editing sheet {} no longer exists", sheet_index);
            return true;
        };
        let updated = match parse_user_input(&text) {
            CellInput::Formula(formula) => sheet.with_formula(editing.address, &formula),
            CellInput::Value(value) => sheet.with_value(editing.address, value),
        };
        let next = workbook.with_sheet(sheet_index, updated);

        self.history.push(next);
        self.active_sheet_index = sheet_index;
        self.selected = editing.address;
        log::debug!("commit {} on sheet {}", editing.address, sheet_index);
        true
    }

    fn cancel(&mut self) -> bool {
        let Some(editing) = self.editing.take() else {
            log::trace!("cancel ignored: not editing");
            return false;
        };
        self.autocomplete_dismissed = false;
        log::debug!("cancel edit {} on sheet {}", editing.address, editing.editing_sheet_index);
        true
    }

    fn move_selection(&mut self, d_row: isize, d_col: isize) {
        let row = (self.selected.row as isize).saturating_add(d_row).clamp(0, MAX_ROWS as isize - 1);
        let col = (self.selected.col as isize).saturating_add(d_col).clamp(0, MAX_COLS as isize - 1);
        self.selected = CellAddress::new(row as usize, col as usize);
    }

    fn accept_autocomplete(&mut self, function_name: &str) -> bool {
        let Some(editing) = self.editing.as_mut() else {
            log::trace!("accept_autocomplete ignored: not editing");
            return false;
        };
        let analysis = editing.analysis();
        let Some(ctx) = detect_context(&analysis.tokens, editing.caret_offset) else {
            log::trace!("accept_autocomplete ignored: no function name at caret");
            return false;
        };
        let edit = accept_autocomplete(&AcceptRequest {
            editing_text: &editing.text,
            token_start_offset: ctx.token_start_offset,
            caret_offset: editing.caret_offset,
            function_name,
        });
        editing.apply(edit);
        true
    }

    fn cycle_reference(&mut self) -> bool {
        let Some(editing) = self.editing.as_mut() else {
            log::trace!("cycle_reference ignored: not editing");
            return false;
        };
        if !editing.is_formula_mode() {
            return false;
        }
        match cycle_reference(&editing.text, editing.caret_offset) {
            Some(edit) => {
                editing.apply(edit);
                true
            }
            None => false,
        }
    }

    fn set_active_sheet(&mut self, index: usize) -> bool {
        if index >= self.workbook().sheet_count() {
            log::trace!("set_active_sheet ignored: no sheet {}", index);
            return false;
        }
        self.active_sheet_index = index;
        true
    }

    fn add_sheet(&mut self, name: Option<&str>) -> bool {
        let mut next = self.workbook().clone();
        let added = match name {
            Some(name) => next.add_sheet_named(name),
            None => Some(next.add_sheet()),
        };
        match added {
            Some(index) => {
                log::debug!("add sheet {}", index);
                self.history.push(next);
                true
            }
            None => {
                log::trace!("add_sheet ignored: name {:?} is invalid or taken", name);
                false
            }
        }
    }

    fn rename_sheet(&mut self, index: usize, name: &str) -> bool {
        let mut next = self.workbook().clone();
        if !next.rename_sheet(index, name) {
            log::trace!("rename_sheet ignored: {:?} for sheet {}", name, index);
            return false;
        }
        log::debug!("rename sheet {} to {:?}", index, name);
        self.history.push(next);
        true
    }

    fn delete_sheet(&mut self, index: usize) -> bool {
        let count = self.workbook().sheet_count();
        if index >= count || count <= 1 {
            log::trace!("delete_sheet ignored: index {} of {}", index, count);
            return false;
        }

        // Editing cannot outlive the sheet it writes to, or the sheet on screen
        let force_cancel = self
            .editing
            .as_ref()
            .is_some_and(|e| e.editing_sheet_index == index || self.active_sheet_index == index);
        if force_cancel {
            log::debug!("force-cancel edit: sheet {} is being deleted", index);
            self.editing = None;
            self.autocomplete_dismissed = false;
        }

        let mut next = self.workbook().clone();
        next.delete_sheet(index);
        self.history.push(next);

        if let Some(editing) = self.editing.as_mut() {
            if editing.editing_sheet_index > index {
                editing.editing_sheet_index -= 1;
            }
        }
        if self.active_sheet_index > index {
            self.active_sheet_index -= 1;
        } else if self.active_sheet_index == index {
            self.active_sheet_index = index.min(count - 2);
        }
        true
    }

    fn undo(&mut self) -> bool {
        if self.editing.is_some() {
            log::trace!("undo ignored while editing");
            return false;
        }
        let undone = self.history.undo().is_some();
        self.clamp_active_sheet();
        undone
    }

    fn redo(&mut self) -> bool {
        if self.editing.is_some() {
            log::trace!("redo ignored while editing");
            return false;
        }
        let redone = self.history.redo().is_some();
        self.clamp_active_sheet();
        redone
    }

    fn clamp_active_sheet(&mut self) {
        let last = self.workbook().sheet_count().saturating_sub(1);
        self.active_sheet_index = self.active_sheet_index.min(last);
    }
}

/// Append `)` for every unmatched `(` in a formula. Parens inside strings do
/// not count. Non-formula text is returned unchanged.
pub fn close_unmatched_parens(text: &str) -> String {
    let Some(body) = text.strip_prefix('=') else {
        return text.to_string();
    };

    let mut depth: usize = 0;
    for token in tokenize(body).iter().filter(|t| t.kind == TokenKind::Paren) {
        if token.text == "(" {
            depth += 1;
        } else {
            depth = depth.saturating_sub(1);
        }
    }

    let mut closed = text.to_string();
    closed.extend(std::iter::repeat(')').take(depth));
    closed
}
