//! Session-level result summary
//!
//! Collects per-package outcomes of one batch run in execution order.

use super::UpgradeOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate result of one upgrade batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeSessionResult {
    /// One outcome per attempted package, in catalog order
    pub outcomes: Vec<UpgradeOutcome>,
    /// Number of succeeded upgrades
    pub succeeded: usize,
    /// Number of failed upgrades (known and unknown)
    pub failed: usize,
    /// Number of cancelled or never-started upgrades
    pub cancelled: usize,
    /// Time the batch started
    pub started_at: DateTime<Utc>,
    /// Time the batch was finalized
    pub finished_at: DateTime<Utc>,
}

impl UpgradeSessionResult {
    /// Finalizes a session result from its outcomes
    pub fn finalize(outcomes: Vec<UpgradeOutcome>, started_at: DateTime<Utc>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.status.is_success()).count();
        let failed = outcomes.iter().filter(|o| o.status.is_failure()).count();
        let cancelled = outcomes.iter().filter(|o| o.status.is_cancelled()).count();

        Self {
            outcomes,
            succeeded,
            failed,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Returns an empty result for a batch with nothing selected
    pub fn empty() -> Self {
        Self::finalize(Vec::new(), Utc::now())
    }

    /// Total number of packages in the batch
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if every package succeeded (vacuously true for an empty batch)
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.outcomes.len()
    }

    /// Ids of packages that were upgraded successfully
    pub fn succeeded_ids(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_success())
            .map(|o| o.id.as_str())
    }
}
