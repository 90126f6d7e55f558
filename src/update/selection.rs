//! Selection state over the current catalog
//!
//! Pure state, no I/O. Every selected id references an id of the catalog the
//! selection was last reconciled with.

use super::UpdateCatalog;
use std::collections::BTreeSet;

/// Set of package ids chosen for upgrade
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    /// Ids present in the current catalog
    known: BTreeSet<String>,
    /// Chosen ids, always a subset of `known`
    selected: BTreeSet<String>,
}

impl SelectionState {
    /// Create an empty selection for a catalog
    pub fn for_catalog(catalog: &UpdateCatalog) -> Self {
        Self {
            known: catalog.ids().map(str::to_string).collect(),
            selected: BTreeSet::new(),
        }
    }

    /// Flip the selection of one id; unknown ids are ignored
    pub fn toggle(&mut self, id: &str) {
        if !self.known.contains(id) {
            return;
        }
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    /// Replace the selection with exactly the given catalog ids
    pub fn select_all<'a>(&mut self, catalog_ids: impl IntoIterator<Item = &'a str>) {
        self.selected = catalog_ids
            .into_iter()
            .filter(|id| self.known.contains(*id))
            .map(str::to_string)
            .collect();
    }

    /// Deselect everything
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Returns true if the id is selected
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Currently selected ids
    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    /// Number of selected ids
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Returns true if nothing is selected
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Adopt a replacement catalog, dropping selections it no longer lists
    pub fn reconcile(&mut self, catalog: &UpdateCatalog) {
        self.known = catalog.ids().map(str::to_string).collect();
        let known = &self.known;
        self.selected.retain(|id| known.contains(id));
    }
}
