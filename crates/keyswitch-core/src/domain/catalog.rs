//! The catalog of layouts the user can pair a keyboard with.
//!
//! Loaded once at startup from a static resource and held for the process
//! lifetime.  Order is significant: it is the order shown in the selection
//! prompt, and the first entry is the pre-selected one.

use crate::domain::layout::{Layout, LayoutId};
use crate::format::{self, ConfigFormatError};

/// Ordered, immutable list of known layouts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutCatalog {
    layouts: Vec<Layout>,
}

impl LayoutCatalog {
    /// Builds a catalog from already-parsed entries.
    ///
    /// Later entries repeating an identifier are dropped.
    pub fn new(layouts: Vec<Layout>) -> Self {
        let mut unique: Vec<Layout> = Vec::with_capacity(layouts.len());
        for layout in layouts {
            if unique.iter().any(|l| l.id == layout.id) {
                tracing::debug!("catalog: duplicate layout {} ignored", layout.id);
                continue;
            }
            unique.push(layout);
        }
        Self { layouts: unique }
    }

    /// Parses the `<hex identifier>=<display name>` catalog text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFormatError`] for the first malformed line.
    pub fn parse(text: &str) -> Result<Self, ConfigFormatError> {
        Ok(Self::new(format::catalog::parse_catalog(text)?))
    }

    /// All layouts in catalog order.
    pub fn list_layouts(&self) -> &[Layout] {
        &self.layouts
    }

    /// Looks a layout up by identifier.
    pub fn find(&self, id: LayoutId) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.id == id)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Catalog entries whose identifier is installed on the system, in
    /// catalog order.
    ///
    /// Falls back to the full catalog when `installed` is empty or matches no
    /// entry, so the user is never shown an empty choice.
    pub fn candidates(&self, installed: &[LayoutId]) -> Vec<Layout> {
        let filtered: Vec<Layout> = self
            .layouts
            .iter()
            .filter(|l| installed.contains(&l.id))
            .cloned()
            .collect();
        if filtered.is_empty() {
            self.layouts.clone()
        } else {
            filtered
        }
    }
}
