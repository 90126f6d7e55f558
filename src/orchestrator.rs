//! Upgrade session for coordinating a batch of upgrades
//!
//! This module provides:
//! - Strictly sequential execution in catalog order (one installer at a time)
//! - Progress events over a bounded channel
//! - Cancellation: the in-flight upgrade is killed, queued ones never start
//! - Partial continuation: a failed package never aborts the batch

use crate::domain::{PackageRecord, UpgradeOutcome, UpgradeSessionResult};
use crate::runner::{CancelSignal, LineSink, UpgradeRunner};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use tokio::sync::mpsc;

/// Capacity of the session event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Progress reported while a batch runs
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// An upgrade is about to launch
    Started {
        package_id: String,
        /// Zero-based position in the batch
        index: usize,
        total: usize,
    },
    /// One line of upgrade output
    LogLine { package_id: String, text: String },
    /// An upgrade finished, failed, was cancelled or never started
    Outcome(UpgradeOutcome),
}

impl SessionEvent {
    /// Package the event refers to
    pub fn package_id(&self) -> &str {
        match self {
            SessionEvent::Started { package_id, .. } => package_id,
            SessionEvent::LogLine { package_id, .. } => package_id,
            SessionEvent::Outcome(outcome) => &outcome.id,
        }
    }
}

#[async_trait]
impl LineSink for mpsc::Sender<SessionEvent> {
    async fn line(&self, package_id: &str, text: &str) {
        let event = SessionEvent::LogLine {
            package_id: package_id.to_string(),
            text: text.to_string(),
        };
        if self.send(event).await.is_err() {
            debug!("Session event receiver closed, dropping output line");
        }
    }
}

/// Runs upgrade batches
#[derive(Clone)]
pub struct UpgradeSession {
    runner: UpgradeRunner,
}

impl UpgradeSession {
    /// Create a session driving the given runner
    pub fn new(runner: UpgradeRunner) -> Self {
        Self { runner }
    }

    /// Upgrade the records one after another
    ///
    /// Returns one outcome per record in input order. Once `cancel` fires,
    /// the running upgrade is killed and the remaining records are reported
    /// as cancelled without being launched.
    pub async fn run_batch(
        &self,
        records: Vec<PackageRecord>,
        events: &mpsc::Sender<SessionEvent>,
        mut cancel: CancelSignal,
    ) -> UpgradeSessionResult {
        let started_at = Utc::now();
        let total = records.len();
        let mut outcomes = Vec::with_capacity(total);
        info!("Starting upgrade batch of {} package(s)", total);

        for (index, record) in records.iter().enumerate() {
            let outcome = if cancel.is_cancelled() {
                UpgradeOutcome::not_started(&record.id)
            } else {
                send(
                    events,
                    SessionEvent::Started {
                        package_id: record.id.clone(),
                        index,
                        total,
                    },
                )
                .await;
                self.runner.run(record, events, &mut cancel).await
            };

            send(events, SessionEvent::Outcome(outcome.clone())).await;
            outcomes.push(outcome);
        }

        let result = UpgradeSessionResult::finalize(outcomes, started_at);
        info!(
            "Upgrade batch finished: {} succeeded, {} failed, {} cancelled",
            result.succeeded, result.failed, result.cancelled
        );
        result
    }
}

async fn send(events: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if events.send(event).await.is_err() {
        debug!("Session event receiver closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::WingetBackend;
    use crate::domain::UpgradeStatus;
    use crate::process::testing::{Script, ScriptedLauncher};
    use crate::runner::cancellation;
    use std::sync::Arc;

    fn record(id: &str) -> PackageRecord {
        PackageRecord::new(id, id, "1.0", "2.0", "winget")
    }

    fn session(launcher: Arc<ScriptedLauncher>) -> UpgradeSession {
        UpgradeSession::new(UpgradeRunner::new(
            Arc::new(WingetBackend::default()),
            launcher,
        ))
    }

    fn package_of(command: &crate::process::CommandSpec) -> String {
        command.args[2].clone()
    }

    async fn run_collecting(
        session: &UpgradeSession,
        records: Vec<PackageRecord>,
    ) -> (UpgradeSessionResult, Vec<SessionEvent>) {
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let result = session.run_batch(records, &tx, CancelSignal::never()).await;
        drop(tx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events)
    }

    #[tokio::test]
    async fn test_batch_runs_sequentially_in_order() {
        let launcher = Arc::new(ScriptedLauncher::new(|cmd| match package_of(cmd).as_str() {
            "B" => Script::exit(0x8A150061_u32 as i32, &[]),
            _ => Script::exit(0, &[]),
        }));
        let (result, _) = run_collecting(
            &session(Arc::clone(&launcher)),
            vec![record("A"), record("B"), record("C")],
        )
        .await;

        let launched: Vec<String> = launcher.launched().iter().map(package_of).collect();
        assert_eq!(launched, vec!["A", "B", "C"]);

        let ids: Vec<&str> = result.outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.cancelled, 0);
        assert!(matches!(
            result.outcomes[1].status,
            UpgradeStatus::FailedKnown { .. }
        ));
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let launcher = Arc::new(ScriptedLauncher::new(|cmd| match package_of(cmd).as_str() {
            "A" => Script::launch_failure(),
            _ => Script::exit(0, &[]),
        }));
        let (result, _) =
            run_collecting(&session(launcher), vec![record("A"), record("B")]).await;

        assert!(result.outcomes[0].status.is_failure());
        assert_eq!(result.outcomes[1].status, UpgradeStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_events_are_ordered_per_package() {
        let launcher = Arc::new(ScriptedLauncher::new(|cmd| {
            let id = package_of(cmd);
            Script {
                lines: vec![Ok(format!("{id} one")), Ok(format!("{id} two"))],
                exit: Some(0),
                ..Script::default()
            }
        }));
        let (_, events) =
            run_collecting(&session(launcher), vec![record("A"), record("B")]).await;

        assert_eq!(events.len(), 8);
        assert_eq!(
            events[0],
            SessionEvent::Started {
                package_id: "A".to_string(),
                index: 0,
                total: 2
            }
        );
        assert_eq!(
            events[1],
            SessionEvent::LogLine {
                package_id: "A".to_string(),
                text: "A one".to_string()
            }
        );
        assert!(matches!(&events[3], SessionEvent::Outcome(o) if o.id == "A"));
        assert_eq!(events[4].package_id(), "B");
        assert!(matches!(&events[7], SessionEvent::Outcome(o) if o.id == "B"));
    }

    #[tokio::test]
    async fn test_cancel_mid_batch() {
        let launcher = Arc::new(ScriptedLauncher::new(|cmd| match package_of(cmd).as_str() {
            "B" => Script::hang(&["B downloading"]),
            _ => Script::exit(0, &[]),
        }));
        let session = session(Arc::clone(&launcher));
        let (handle, signal) = cancellation();
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            session
                .run_batch(vec![record("A"), record("B"), record("C")], &tx, signal)
                .await
        });

        let mut outcomes = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                SessionEvent::LogLine { package_id, .. } if package_id == "B" => handle.cancel(),
                SessionEvent::Outcome(outcome) => outcomes.push(outcome),
                _ => {}
            }
        }
        let result = task.await.unwrap();

        assert_eq!(result.outcomes[0].status, UpgradeStatus::Succeeded);
        assert_eq!(result.outcomes[1].status, UpgradeStatus::Cancelled);
        assert_eq!(result.outcomes[1].log_lines, vec!["B downloading"]);
        assert_eq!(result.outcomes[2].status, UpgradeStatus::Cancelled);
        assert!(result.outcomes[2].log_lines.is_empty());
        assert_eq!(result.cancelled, 2);

        assert_eq!(launcher.launched().len(), 2);
        assert_eq!(launcher.kills(), 1);
        assert_eq!(outcomes.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let launcher = Arc::new(ScriptedLauncher::new(|_| Script::exit(0, &[])));
        let (result, events) = run_collecting(&session(launcher), Vec::new()).await;

        assert_eq!(result.total(), 0);
        assert!(result.all_succeeded());
        assert!(events.is_empty());
    }
}
