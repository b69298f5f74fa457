//! State behind the "which layout does this keyboard use?" dialog.
//!
//! The dialog opens with the first candidate pre-selected.  Confirming is
//! disabled until the user makes an explicit choice, so a stray Enter on an
//! unfamiliar keyboard cannot silently pair it with the wrong layout.  With a
//! single candidate there is nothing to choose and confirming is always
//! allowed.
//!
//! Any front end (console, native dialog) drives this type and renders it; the
//! rules live here so they can be tested without a UI.

use crate::domain::layout::{Layout, LayoutId};

/// Selection dialog model.
#[derive(Debug, Clone)]
pub struct SelectionState {
    candidates: Vec<Layout>,
    selected: usize,
    /// Set once the user picks an entry explicitly.
    touched: bool,
}

impl SelectionState {
    /// Opens a dialog over `candidates` with the first entry pre-selected.
    ///
    /// Returns `None` when there is nothing to choose from.
    pub fn new(candidates: Vec<Layout>) -> Option<Self> {
        if candidates.is_empty() {
            return None;
        }
        Some(Self {
            candidates,
            selected: 0,
            touched: false,
        })
    }

    pub fn candidates(&self) -> &[Layout] {
        &self.candidates
    }

    /// Index of the highlighted entry.
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// The highlighted entry.
    pub fn selected(&self) -> &Layout {
        &self.candidates[self.selected]
    }

    /// Highlights the entry at `index` as an explicit user choice.
    ///
    /// Returns `false` (and changes nothing) when `index` is out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.candidates.len() {
            return false;
        }
        self.selected = index;
        self.touched = true;
        true
    }

    /// Highlights the entry with identifier `id`, if present.
    pub fn select_id(&mut self, id: LayoutId) -> bool {
        match self.candidates.iter().position(|l| l.id == id) {
            Some(index) => self.select(index),
            None => false,
        }
    }

    /// Whether the confirm action is currently enabled.
    pub fn can_confirm(&self) -> bool {
        self.touched || self.candidates.len() == 1
    }

    /// Returns the chosen layout, or `None` while confirming is disabled.
    pub fn confirm(&self) -> Option<&Layout> {
        if self.can_confirm() {
            Some(self.selected())
        } else {
            None
        }
    }
}
