//! Terminal feedback for listing scans and upgrade batches
//!
//! A scan shows a spinner; a batch shows a bar advancing once per package
//! outcome with a running failure count. Upgrade output lines are printed
//! through the bar so they do not tear the display. A hidden reporter
//! (quiet and JSON modes) swallows everything.

use crate::domain::UpgradeOutcome;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const SCAN_TEMPLATE: &str = "{spinner:.cyan} Scanning {msg} for upgrades... ({elapsed})";
const BATCH_TEMPLATE: &str = "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}";

/// Progress display for one scan or one upgrade batch
pub struct Progress {
    bar: Option<ProgressBar>,
    failed: u64,
}

impl Progress {
    /// Spinner shown while the backend listing runs
    pub fn scan(enabled: bool, backend: &str) -> Self {
        let bar = enabled.then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template(SCAN_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
            spinner.set_message(backend.to_string());
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        });
        Self { bar, failed: 0 }
    }

    /// Bar counting finished packages of a batch
    pub fn batch(enabled: bool, total: u64) -> Self {
        let bar = enabled.then(|| {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template(BATCH_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓▒░"),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        });
        Self { bar, failed: 0 }
    }

    /// Name the package whose upgrade just launched
    pub fn package_started(&self, package_id: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(self.message(package_id));
        }
    }

    /// Show one line of upgrade output above the bar
    pub fn log_line(&self, line: &str) {
        if let Some(bar) = &self.bar {
            bar.println(line);
        }
    }

    /// Count a finished package
    pub fn package_finished(&mut self, outcome: &UpgradeOutcome) {
        if outcome.status.is_failure() {
            self.failed += 1;
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
            bar.set_message(self.message(""));
        }
    }

    /// Note that a cancel request was sent
    pub fn cancelling(&self) {
        if let Some(bar) = &self.bar {
            bar.println("Cancelling...");
        }
    }

    /// Packages counted as failed so far
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Remove the display
    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }

    fn message(&self, package_id: &str) -> String {
        match self.failed {
            0 => package_id.to_string(),
            n => format!("{} ({} failed)", package_id, n).trim_start().to_string(),
        }
    }
}
