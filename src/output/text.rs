//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Aligned catalog table with selection markers
//! - Per-package outcome lines with colors
//! - Batch summary with counts and duration

use crate::domain::{
    format_exit_code, PackageRecord, UpgradeOutcome, UpgradeSessionResult, UpgradeStatus,
};
use crate::output::{OutputFormatter, Verbosity};
use crate::update::{SelectionState, UpdateCatalog};
use colored::{Color, Colorize};
use std::io::Write;

/// Column headers of the catalog table
const HEADERS: [&str; 5] = ["Name", "Id", "Version", "Available", "Source"];

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self::with_color(verbosity, true)
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    /// Render the catalog table, one numbered row per package
    pub fn catalog_table(
        &self,
        catalog: &UpdateCatalog,
        selection: Option<&SelectionState>,
    ) -> Vec<String> {
        if catalog.is_empty() {
            return vec![self.paint("All packages are up to date.", Color::Green)];
        }

        let rows: Vec<[&str; 5]> = catalog.records().iter().map(cells).collect();
        let mut widths = HEADERS.map(|h| h.chars().count());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        let number_width = rows.len().to_string().len();
        let marker_width = if selection.is_some() { 4 } else { 0 };

        let mut lines = Vec::with_capacity(rows.len() + 2);
        let header = pad_row(&HEADERS, &widths);
        lines.push(format!(
            "{:marker_width$}{:>number_width$}  {}",
            "",
            "#",
            self.bold(&header)
        ));
        lines.push(self.dim(&"-".repeat(marker_width + number_width + 2 + header.chars().count())));

        for (index, (record, row)) in catalog.records().iter().zip(&rows).enumerate() {
            let marker = match selection {
                Some(selection) if selection.is_selected(&record.id) => {
                    format!("{} ", self.paint("[x]", Color::Cyan))
                }
                Some(_) => "[ ] ".to_string(),
                None => String::new(),
            };
            lines.push(format!(
                "{}{:>number_width$}  {}",
                marker,
                index + 1,
                pad_row(row, &widths)
            ));
        }
        lines
    }

    /// One-line description of an outcome
    pub fn outcome_line(&self, outcome: &UpgradeOutcome) -> String {
        match &outcome.status {
            UpgradeStatus::Succeeded => {
                format!("{} {} upgraded", self.paint("✓", Color::Green), outcome.id)
            }
            UpgradeStatus::FailedKnown { code, message } => format!(
                "{} {} failed: {} ({})",
                self.paint("✗", Color::Red),
                outcome.id,
                message,
                format_exit_code(*code)
            ),
            UpgradeStatus::FailedUnknown { code } => format!(
                "{} {} failed with exit code {}",
                self.paint("✗", Color::Red),
                outcome.id,
                format_exit_code(*code)
            ),
            UpgradeStatus::Cancelled => {
                format!("{} {} cancelled", self.paint("-", Color::Yellow), outcome.id)
            }
        }
    }

    /// Header announcing the upgrade about to run
    pub fn started_line(&self, package_id: &str, index: usize, total: usize) -> String {
        format!("{} [{}/{}] {}", self.paint("==>", Color::Cyan), index + 1, total, package_id)
    }

    /// Informational message, such as a rejected action
    pub fn notice_line(&self, message: &str) -> String {
        format!("{} {}", self.paint("!", Color::Yellow), message)
    }

    /// One line of upgrade output, prefixed with its package
    pub fn log_line(&self, package_id: &str, text: &str) -> String {
        format!("{} {}", self.dim(&format!("[{package_id}]")), text)
    }

    /// Counts and duration of a finished batch
    pub fn summary_line(&self, result: &UpgradeSessionResult) -> String {
        let seconds = (result.finished_at - result.started_at).num_seconds().max(0);
        let mut parts = vec![self.paint(&format!("{} upgraded", result.succeeded), Color::Green)];
        if result.failed > 0 {
            parts.push(self.paint(&format!("{} failed", result.failed), Color::Red));
        }
        if result.cancelled > 0 {
            parts.push(self.paint(&format!("{} cancelled", result.cancelled), Color::Yellow));
        }
        format!("{} in {}s", parts.join(", "), seconds)
    }
}

impl OutputFormatter for TextFormatter {
    fn format_catalog(
        &self,
        catalog: &UpdateCatalog,
        selection: Option<&SelectionState>,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if self.verbosity == Verbosity::Quiet {
            for id in catalog.ids() {
                writeln!(writer, "{}", id)?;
            }
            return Ok(());
        }

        if !catalog.is_empty() {
            writeln!(
                writer,
                "{} package(s) can be upgraded:",
                self.bold(&catalog.len().to_string())
            )?;
            writeln!(writer)?;
        }
        for line in self.catalog_table(catalog, selection) {
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }

    fn format_session(
        &self,
        result: &UpgradeSessionResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if result.total() == 0 {
            writeln!(writer, "Nothing to upgrade.")?;
            return Ok(());
        }

        if self.verbosity != Verbosity::Quiet {
            for outcome in &result.outcomes {
                writeln!(writer, "{}", self.outcome_line(outcome))?;
                if self.verbosity == Verbosity::Verbose && outcome.status.is_failure() {
                    for line in &outcome.log_lines {
                        writeln!(writer, "    {}", self.dim(line))?;
                    }
                }
            }
            writeln!(writer)?;
        }
        writeln!(writer, "{}", self.summary_line(result))?;
        Ok(())
    }
}

fn cells(record: &PackageRecord) -> [&str; 5] {
    [
        record.name.as_str(),
        record.id.as_str(),
        record.current_version.as_str(),
        record.available_version.as_str(),
        record.source.as_str(),
    ]
}

fn pad_row(cells: &[&str; 5], widths: &[usize; 5]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    padded.join("  ").trim_end().to_string()
}
