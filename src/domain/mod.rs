//! Core domain models for updatery
//!
//! This module contains the fundamental types used throughout the application:
//! - Package records parsed from a backend listing
//! - Per-package upgrade outcomes
//! - Session summary of a batch run

mod outcome;
mod package;
mod summary;

pub use outcome::{format_exit_code, UpgradeOutcome, UpgradeStatus};
pub use package::PackageRecord;
pub use summary::UpgradeSessionResult;
