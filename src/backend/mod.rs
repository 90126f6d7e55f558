//! Package manager backends
//!
//! A backend knows how to list packages, parse that listing, build the
//! upgrade invocation for one package and interpret its exit codes. The
//! runner, session and selection logic only talk to this trait.

pub mod exit_codes;
mod winget;

pub use exit_codes::ExitCodeTable;
pub use winget::{WingetBackend, WINGET_EXIT_CODES};

use crate::config::{BackendConfig, BackendKind};
use crate::domain::PackageRecord;
use crate::error::ParseError;
use crate::process::CommandSpec;

/// Capability interface of a package manager backend
pub trait Backend: Send + Sync {
    /// Backend display name
    fn name(&self) -> &str;

    /// Source tag of packages this backend can upgrade
    fn source_tag(&self) -> &str;

    /// Command producing the listing text
    fn list_command(&self) -> CommandSpec;

    /// Returns true if the listing text is the backend's "nothing found" message
    fn is_empty_listing(&self, raw: &str) -> bool;

    /// Parse listing text into records
    fn parse(&self, raw: &str) -> Result<Vec<PackageRecord>, ParseError>;

    /// Build the upgrade invocation for one package
    fn build_upgrade_command(&self, record: &PackageRecord) -> CommandSpec;

    /// Documented exit codes of the upgrade command
    fn exit_code_table(&self) -> &ExitCodeTable;

    /// Parse a listing, treating the "nothing found" message as an empty listing
    fn read_listing(&self, raw: &str) -> Result<Vec<PackageRecord>, ParseError> {
        if self.is_empty_listing(raw) {
            return Ok(Vec::new());
        }
        self.parse(raw)
    }
}

/// Create the backend selected by configuration
pub fn create_backend(config: &BackendConfig) -> Box<dyn Backend> {
    match config.kind {
        BackendKind::Winget => Box::new(WingetBackend::new(config)),
    }
}
