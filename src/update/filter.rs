//! Catalog filter configuration
//!
//! This module provides the CatalogFilter struct that encapsulates
//! all options deciding which listed packages are offered for upgrade.

use crate::domain::PackageRecord;

/// Filter configuration for building the catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    /// Expected backend source tag (compared case-insensitively)
    pub source: String,
    /// Package ids never offered for upgrade
    pub exclude: Vec<String>,
}

impl CatalogFilter {
    /// Create a new CatalogFilter for a source tag
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            exclude: Vec::new(),
        }
    }

    /// Set packages to exclude
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Check if a record comes from the expected source
    pub fn matches_source(&self, record: &PackageRecord) -> bool {
        record.source.eq_ignore_ascii_case(&self.source)
    }

    /// Check if a package id is excluded
    pub fn is_excluded(&self, id: &str) -> bool {
        self.exclude.iter().any(|p| p.eq_ignore_ascii_case(id))
    }

    /// Check if a record belongs in the catalog
    pub fn accepts(&self, record: &PackageRecord) -> bool {
        self.matches_source(record) && record.has_update() && !self.is_excluded(&record.id)
    }
}
