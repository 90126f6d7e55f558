//! Upgrade catalog and selection
//!
//! This module provides:
//! - Catalog filter configuration (source tag, excluded ids)
//! - The upgrade-eligible catalog built from parsed records
//! - Selection state over the current catalog

mod filter;
mod selection;

pub use filter::CatalogFilter;
pub use selection::SelectionState;

use crate::domain::PackageRecord;

/// Ordered, immutable set of packages eligible for upgrade
///
/// A refresh builds a new catalog and replaces the old one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCatalog {
    records: Vec<PackageRecord>,
}

impl UpdateCatalog {
    /// Build a catalog from parsed records, preserving their order
    pub fn build(records: Vec<PackageRecord>, filter: &CatalogFilter) -> Self {
        let records = records.into_iter().filter(|r| filter.accepts(r)).collect();
        Self { records }
    }

    /// Records in catalog order
    pub fn records(&self) -> &[PackageRecord] {
        &self.records
    }

    /// Package ids in catalog order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }

    /// Returns true if the catalog lists this id
    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// Look up a record by id
    pub fn get(&self, id: &str) -> Option<&PackageRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Selected records in catalog order
    pub fn selected_records(&self, selection: &SelectionState) -> Vec<PackageRecord> {
        self.records
            .iter()
            .filter(|r| selection.is_selected(&r.id))
            .cloned()
            .collect()
    }

    /// Returns a new catalog without the given ids
    pub fn without<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        let removed: Vec<&str> = ids.into_iter().collect();
        Self {
            records: self
                .records
                .iter()
                .filter(|r| !removed.contains(&r.id.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Number of packages
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no package has an update
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<PackageRecord> {
        vec![
            PackageRecord::new("Git", "Git.Git", "2.40.0", "2.41.0", "winget"),
            PackageRecord::new("Same", "Same.Version", "1.0", "1.0", "winget"),
            PackageRecord::new("Store App", "9NBLGGH4NNS1", "1.0", "2.0", "msstore"),
            PackageRecord::new("None", "No.Update", "1.0", "", "winget"),
            PackageRecord::new("Node.js", "OpenJS.NodeJS", "20.1", "22.0", "winget"),
        ]
    }

    #[test]
    fn test_build_filters_and_preserves_order() {
        let catalog = UpdateCatalog::build(records(), &CatalogFilter::new("winget"));
        let ids: Vec<&str> = catalog.ids().collect();
        assert_eq!(ids, vec!["Git.Git", "OpenJS.NodeJS"]);
    }

    #[test]
    fn test_build_excludes_same_version_and_other_source() {
        let catalog = UpdateCatalog::build(records(), &CatalogFilter::new("winget"));
        assert!(!catalog.contains("Same.Version"));
        assert!(!catalog.contains("9NBLGGH4NNS1"));
        assert!(!catalog.contains("No.Update"));
    }

    #[test]
    fn test_build_with_exclude() {
        let filter = CatalogFilter::new("winget").with_exclude(vec!["Git.Git".to_string()]);
        let catalog = UpdateCatalog::build(records(), &filter);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("OpenJS.NodeJS"));
    }

    #[test]
    fn test_build_empty() {
        let catalog = UpdateCatalog::build(Vec::new(), &CatalogFilter::new("winget"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_get() {
        let catalog = UpdateCatalog::build(records(), &CatalogFilter::new("winget"));
        assert_eq!(catalog.get("Git.Git").unwrap().name, "Git");
        assert!(catalog.get("Missing").is_none());
    }

    #[test]
    fn test_selected_records_in_catalog_order() {
        let catalog = UpdateCatalog::build(records(), &CatalogFilter::new("winget"));
        let mut selection = SelectionState::for_catalog(&catalog);
        selection.toggle("OpenJS.NodeJS");
        selection.toggle("Git.Git");

        let selected = catalog.selected_records(&selection);
        let ids: Vec<&str> = selected.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["Git.Git", "OpenJS.NodeJS"]);
    }

    #[test]
    fn test_without() {
        let catalog = UpdateCatalog::build(records(), &CatalogFilter::new("winget"));
        let trimmed = catalog.without(["Git.Git"]);
        assert_eq!(trimmed.len(), 1);
        assert_eq!(catalog.len(), 2);
    }
}
