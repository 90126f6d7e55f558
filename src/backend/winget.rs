//! winget backend
//!
//! Handles:
//! - `winget list --upgrade-available` listings (fixed-width table)
//! - `winget upgrade --id <id> --silent` invocations
//! - winget installer exit codes

use super::exit_codes::ExitCodeTable;
use super::Backend;
use crate::config::BackendConfig;
use crate::domain::PackageRecord;
use crate::error::ParseError;
use crate::parser::TableParser;
use crate::process::CommandSpec;
use regex::Regex;
use std::sync::LazyLock;

/// Documented winget exit codes
pub const WINGET_EXIT_CODES: ExitCodeTable = ExitCodeTable::new(&[
    (3, "Reboot required to complete"),
    (5, "Access denied, administrator rights needed"),
    (0x8A150006, "ShellExecute install failed"),
    (0x8A150008, "Downloading installer failed"),
    (0x8A150010, "No applicable installer for this system"),
    (0x8A150011, "Installer hash mismatch"),
    (0x8A150019, "Requires administrator privileges"),
    (0x8A15002B, "No applicable update found"),
    (0x8A15004F, "Upgrade version is not newer than installed"),
    (0x8A150061, "Package is already installed"),
    (0x8A150101, "Application is running, close it and retry"),
    (0x8A150102, "Another installation is in progress, try again later"),
    (0x8A150103, "File in use, close the application and retry"),
    (0x8A150105, "Not enough disk space"),
    (0x8A150108, "Installer error, contact support"),
    (0x8A150109, "Restart the PC to finish installation"),
    (0x8A15010A, "Installation failed, restart the PC and retry"),
    (0x8A15010C, "Installation was cancelled"),
    (0x8A15010D, "Another version is already installed"),
    (0x8A15010E, "A higher version is already installed"),
    (0x8A15010F, "Blocked by organization policy"),
]);

// Message printed instead of a table when nothing matches the listing filter
static NO_PACKAGES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)no installed package found matching input criteria").unwrap()
});

/// Upgrade subcommand
const UPGRADE_SUBCOMMAND: &str = "upgrade";

/// Flag introducing the package id
const ID_FLAG: &str = "--id";

/// Flag suppressing installer UI
const SILENT_FLAG: &str = "--silent";

/// Backend for the Windows Package Manager
#[derive(Debug, Clone)]
pub struct WingetBackend {
    binary: String,
    source: String,
    list_args: Vec<String>,
    upgrade_extra_args: Vec<String>,
    parser: TableParser,
}

impl WingetBackend {
    /// Create a backend from configuration
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            source: config.source.clone(),
            list_args: config.list_args.clone(),
            upgrade_extra_args: config.upgrade_extra_args.clone(),
            parser: TableParser::new(),
        }
    }
}

impl Default for WingetBackend {
    fn default() -> Self {
        Self::new(&BackendConfig::default())
    }
}

impl Backend for WingetBackend {
    fn name(&self) -> &str {
        "winget"
    }

    fn source_tag(&self) -> &str {
        &self.source
    }

    fn list_command(&self) -> CommandSpec {
        CommandSpec::new(&self.binary).args(self.list_args.iter().cloned())
    }

    fn is_empty_listing(&self, raw: &str) -> bool {
        NO_PACKAGES_RE.is_match(raw)
    }

    fn parse(&self, raw: &str) -> Result<Vec<PackageRecord>, ParseError> {
        self.parser.parse(raw)
    }

    fn build_upgrade_command(&self, record: &PackageRecord) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .args([UPGRADE_SUBCOMMAND, ID_FLAG])
            .arg(&record.id)
            .arg(SILENT_FLAG)
            .args(self.upgrade_extra_args.iter().cloned())
            .elevated()
    }

    fn exit_code_table(&self) -> &ExitCodeTable {
        &WINGET_EXIT_CODES
    }
}
