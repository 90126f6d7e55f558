//! Exit code classification
//!
//! Windows reports installer HRESULTs both as signed and unsigned 32-bit
//! values, so lookups normalise to the unsigned form.

use crate::domain::UpgradeStatus;

/// The process could not be started
pub const LAUNCH_FAILURE_CODE: i32 = -1;

/// Output of the process could not be read
pub const STREAM_FAILURE_CODE: i32 = -2;

/// The process ended without reporting an exit code
pub const NO_EXIT_CODE: i32 = -3;

/// Fixed lookup of documented non-zero exit codes
#[derive(Debug, Clone, Copy)]
pub struct ExitCodeTable {
    entries: &'static [(u32, &'static str)],
}

impl ExitCodeTable {
    /// Create a table from static entries
    pub const fn new(entries: &'static [(u32, &'static str)]) -> Self {
        Self { entries }
    }

    /// Message for a known code
    pub fn lookup(&self, code: i32) -> Option<&'static str> {
        let code = code as u32;
        self.entries
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, message)| *message)
    }

    /// Map an exit code to an upgrade status
    pub fn classify(&self, code: i32) -> UpgradeStatus {
        if code == 0 {
            return UpgradeStatus::Succeeded;
        }
        match self.lookup(code) {
            Some(message) => UpgradeStatus::failed_known(code, message),
            None => UpgradeStatus::FailedUnknown { code },
        }
    }

    /// Every documented code with its message
    pub fn entries(&self) -> &'static [(u32, &'static str)] {
        self.entries
    }
}
