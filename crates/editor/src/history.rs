//! Undo/redo history over whole-document snapshots

/// Default number of undo steps kept
pub const DEFAULT_MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone)]
pub struct History<T> {
    present: T,
    undo_stack: Vec<T>,
    redo_stack: Vec<T>,
    max_entries: usize,
}

impl<T> History<T> {
    pub fn new(initial: T) -> Self {
        Self::with_max_entries(initial, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(initial: T, max_entries: usize) -> Self {
        Self {
            present: initial,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn present(&self) -> &T {
        &self.present
    }

    /// Make `next` the present state. Clears redo.
    pub fn push(&mut self, next: T) {
        let previous = std::mem::replace(&mut self.present, next);
        self.undo_stack.push(previous);
        self.redo_stack.clear();

        // Limit history size
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    /// Step back; returns the new present
    pub fn undo(&mut self) -> Option<&T> {
        let previous = self.undo_stack.pop()?;
        let current = std::mem::replace(&mut self.present, previous);
        self.redo_stack.push(current);
        Some(&self.present)
    }

    /// Step forward; returns the new present
    pub fn redo(&mut self) -> Option<&T> {
        let next = self.redo_stack.pop()?;
        let current = std::mem::replace(&mut self.present, next);
        self.undo_stack.push(current);
        Some(&self.present)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Drop all undo/redo steps, keeping the present
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
