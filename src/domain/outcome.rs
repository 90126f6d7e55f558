//! Per-package upgrade outcome types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified result of one upgrade attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpgradeStatus {
    /// Process exited with code 0
    Succeeded,
    /// Failure with a documented meaning (known exit code or launch failure)
    FailedKnown {
        /// Exit code (or sentinel for launch failures)
        code: i32,
        /// Human-readable explanation
        message: String,
    },
    /// Failure with an exit code outside the known table
    FailedUnknown {
        /// Exit code (or sentinel for stream failures)
        code: i32,
    },
    /// The attempt was cancelled before it finished, or never started
    Cancelled,
}

impl UpgradeStatus {
    /// Creates a FailedKnown status
    pub fn failed_known(code: i32, message: impl Into<String>) -> Self {
        UpgradeStatus::FailedKnown {
            code,
            message: message.into(),
        }
    }

    /// Returns true for Succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, UpgradeStatus::Succeeded)
    }

    /// Returns true for either failure variant
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            UpgradeStatus::FailedKnown { .. } | UpgradeStatus::FailedUnknown { .. }
        )
    }

    /// Returns true for Cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UpgradeStatus::Cancelled)
    }
}

/// Render an exit code for people
///
/// Installer codes are HRESULT-style and read best as unsigned hex. Small
/// negative values are the runner's own markers and print as they are.
pub fn format_exit_code(code: i32) -> String {
    if (-255..0).contains(&code) {
        code.to_string()
    } else {
        format!("{:#X}", code as u32)
    }
}

impl fmt::Display for UpgradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeStatus::Succeeded => write!(f, "upgraded"),
            UpgradeStatus::FailedKnown { code, message } => {
                write!(f, "{} (code {})", message, format_exit_code(*code))
            }
            UpgradeStatus::FailedUnknown { code } => {
                write!(f, "unknown error (code {})", format_exit_code(*code))
            }
            UpgradeStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of upgrading a single package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeOutcome {
    /// Package identifier
    pub id: String,
    /// Classified status
    pub status: UpgradeStatus,
    /// Output produced by the upgrade process, in emission order
    pub log_lines: Vec<String>,
}

impl UpgradeOutcome {
    /// Creates a new outcome
    pub fn new(id: impl Into<String>, status: UpgradeStatus, log_lines: Vec<String>) -> Self {
        Self {
            id: id.into(),
            status,
            log_lines,
        }
    }

    /// Creates a Cancelled outcome for a package that was never started
    pub fn not_started(id: impl Into<String>) -> Self {
        Self::new(id, UpgradeStatus::Cancelled, Vec::new())
    }
}

impl fmt::Display for UpgradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.status)
    }
}
