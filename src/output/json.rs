//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of the upgradable catalog
//! - Structured per-package upgrade outcomes

use crate::domain::{UpgradeSessionResult, UpgradeStatus};
use crate::output::{OutputFormatter, Verbosity};
use crate::update::{SelectionState, UpdateCatalog};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the catalog
#[derive(Serialize)]
struct JsonCatalog<'a> {
    /// Number of upgradable packages
    count: usize,
    /// Upgradable packages in catalog order
    packages: Vec<JsonPackage<'a>>,
}

/// JSON representation of one upgradable package
#[derive(Serialize)]
struct JsonPackage<'a> {
    name: &'a str,
    id: &'a str,
    current_version: &'a str,
    available_version: &'a str,
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected: Option<bool>,
}

/// JSON representation of a finished batch
#[derive(Serialize)]
struct JsonSession<'a> {
    summary: JsonSummary,
    outcomes: Vec<JsonOutcome<'a>>,
}

/// JSON representation of batch counts
#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    succeeded: usize,
    failed: usize,
    cancelled: usize,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

/// JSON representation of one outcome
#[derive(Serialize)]
struct JsonOutcome<'a> {
    id: &'a str,
    status: &'a UpgradeStatus,
    /// Process output (only in verbose mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    log: Option<&'a [String]>,
}

impl OutputFormatter for JsonFormatter {
    fn format_catalog(
        &self,
        catalog: &UpdateCatalog,
        selection: Option<&SelectionState>,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let packages = catalog
            .records()
            .iter()
            .map(|record| JsonPackage {
                name: &record.name,
                id: &record.id,
                current_version: &record.current_version,
                available_version: &record.available_version,
                source: &record.source,
                selected: selection.map(|s| s.is_selected(&record.id)),
            })
            .collect();
        let output = JsonCatalog {
            count: catalog.len(),
            packages,
        };

        serde_json::to_writer_pretty(&mut *writer, &output)?;
        writeln!(writer)?;
        Ok(())
    }

    fn format_session(
        &self,
        result: &UpgradeSessionResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let outcomes = result
            .outcomes
            .iter()
            .map(|outcome| JsonOutcome {
                id: &outcome.id,
                status: &outcome.status,
                log: (self.verbosity == Verbosity::Verbose).then_some(outcome.log_lines.as_slice()),
            })
            .collect();
        let output = JsonSession {
            summary: JsonSummary {
                total: result.total(),
                succeeded: result.succeeded,
                failed: result.failed,
                cancelled: result.cancelled,
                started_at: result.started_at,
                finished_at: result.finished_at,
            },
            outcomes,
        };

        serde_json::to_writer_pretty(&mut *writer, &output)?;
        writeln!(writer)?;
        Ok(())
    }
}
