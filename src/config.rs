//! Configuration file support
//!
//! Reads `config.toml` from (in priority order):
//! - the path given with `--config`
//! - the per-user config directory (`updatery/config.toml`)
//!
//! A missing default file means built-in defaults; a missing explicit file is an error.

use crate::error::ConfigError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time allowed for a listing scan
const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 120;

/// Config file name inside the config directory
const CONFIG_FILE: &str = "config.toml";

/// Supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Winget,
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: BackendConfig,
    pub elevation: ElevationConfig,
    pub catalog: CatalogConfig,
    pub scan: ScanConfig,
}

/// Backend invocation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Which backend to drive
    pub kind: BackendKind,
    /// Backend executable
    pub binary: String,
    /// Source tag of upgradable packages
    pub source: String,
    /// Arguments of the listing command
    pub list_args: Vec<String>,
    /// Arguments appended after the silent flag of every upgrade
    pub upgrade_extra_args: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Winget,
            binary: "winget".to_string(),
            source: "winget".to_string(),
            list_args: vec![
                "list".to_string(),
                "--upgrade-available".to_string(),
                "--accept-source-agreements".to_string(),
            ],
            upgrade_extra_args: vec![
                "--disable-interactivity".to_string(),
                "--accept-source-agreements".to_string(),
                "--accept-package-agreements".to_string(),
            ],
        }
    }
}

/// Elevation settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElevationConfig {
    /// Program and arguments prefixed to upgrade commands (empty: run directly)
    pub launcher: Vec<String>,
}

/// Catalog settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Package ids never offered for upgrade
    pub exclude: Vec<String>,
}

/// Listing scan settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Seconds before the listing command is killed
    pub timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_SCAN_TIMEOUT_SECS,
        }
    }
}

impl ScanConfig {
    /// Scan timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from an explicit path or the default location
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Read and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.binary.trim().is_empty() {
            return Err(ConfigError::invalid("backend.binary must not be empty"));
        }
        if self.backend.source.trim().is_empty() {
            return Err(ConfigError::invalid("backend.source must not be empty"));
        }
        if self.backend.list_args.is_empty() {
            return Err(ConfigError::invalid("backend.list_args must not be empty"));
        }
        if self.scan.timeout_secs == 0 {
            return Err(ConfigError::invalid("scan.timeout_secs must be positive"));
        }
        if self.elevation.launcher.iter().any(|a| a.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "elevation.launcher must not contain empty entries",
            ));
        }
        Ok(())
    }
}

/// Default config file location in the per-user config directory
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "updatery").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
