use crate::editing::CellEditingState;

/// Keys the editor reacts to. Everything else reaches the text surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Tab,
    Escape,
    F2,
    F4,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub shift: bool,
    /// Primary modifier (cmd on macOS)
    pub ctrl: bool,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self { key, shift: false, ctrl: false }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// enter / shift-enter: commit and move along the configured direction
    Confirm { reverse: bool },
    /// ctrl-enter: commit without moving
    ConfirmInPlace,
    /// tab / shift-tab: commit and move sideways
    ConfirmSideways { reverse: bool },
    Cancel,
    DismissAutocomplete,
    AcceptAutocomplete,
    StartEdit,
    StartReplace(char),
    CycleReference,
    Undo,
    Redo,
}

/// Map a key press to an editor action.
///
/// Returns None during IME composition so the platform input method keeps
/// Enter, Tab and Escape for itself.
pub fn action_for_key(
    input: &KeyInput,
    editing: Option<&CellEditingState>,
    autocomplete_open: bool,
) -> Option<KeyAction> {
    if editing.is_some_and(|e| e.composition.is_composing) {
        return None;
    }
    let is_editing = editing.is_some();

    match input.key {
        Key::Enter if input.ctrl => is_editing.then_some(KeyAction::ConfirmInPlace),
        Key::Enter => Some(KeyAction::Confirm { reverse: input.shift }),
        Key::Tab if is_editing && autocomplete_open && !input.shift => Some(KeyAction::AcceptAutocomplete),
        Key::Tab => Some(KeyAction::ConfirmSideways { reverse: input.shift }),
        Key::Escape if !is_editing => None,
        Key::Escape if autocomplete_open => Some(KeyAction::DismissAutocomplete),
        Key::Escape => Some(KeyAction::Cancel),
        Key::F2 => (!is_editing).then_some(KeyAction::StartEdit),
        Key::F4 => is_editing.then_some(KeyAction::CycleReference),
        // Text undo belongs to the input surface while editing
        Key::Char(_) if input.ctrl && is_editing => None,
        Key::Char(c) if input.ctrl => match c.to_ascii_lowercase() {
            'z' if input.shift => Some(KeyAction::Redo),
            'z' => Some(KeyAction::Undo),
            'y' => Some(KeyAction::Redo),
            _ => None,
        },
        Key::Char(c) if !is_editing && !c.is_control() => Some(KeyAction::StartReplace(c)),
        Key::Char(_) => None,
    }
}
