//! Package record parsed from a backend listing

use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of a backend listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Display name (may contain spaces)
    pub name: String,
    /// Stable identifier, unique within one listing
    pub id: String,
    /// Currently installed version
    pub current_version: String,
    /// Version offered by the backend, empty when there is no update
    pub available_version: String,
    /// Repository tag reported by the backend
    pub source: String,
}

impl PackageRecord {
    /// Creates a new record
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        current_version: impl Into<String>,
        available_version: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            current_version: current_version.into(),
            available_version: available_version.into(),
            source: source.into(),
        }
    }

    /// Returns true if the backend offers a version different from the installed one
    pub fn has_update(&self) -> bool {
        !self.available_version.is_empty() && self.available_version != self.current_version
    }
}

impl fmt::Display for PackageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.available_version.is_empty() {
            write!(f, "{} ({}) {}", self.name, self.id, self.current_version)
        } else {
            write!(
                f,
                "{} ({}) {} → {}",
                self.name, self.id, self.current_version, self.available_version
            )
        }
    }
}
