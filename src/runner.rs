//! Supervised execution of a single upgrade
//!
//! This module provides:
//! - `UpgradeRunner`: launch one upgrade, stream its output, classify its exit
//! - `LineSink`: where streamed output lines go while the process runs
//! - `CancelHandle` / `CancelSignal`: cooperative cancellation shared with the session

use crate::backend::exit_codes::{LAUNCH_FAILURE_CODE, NO_EXIT_CODE, STREAM_FAILURE_CODE};
use crate::backend::Backend;
use crate::domain::{PackageRecord, UpgradeOutcome, UpgradeStatus};
use crate::process::{ProcessHandle, ProcessLauncher};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

/// Receiver of output lines produced by a running upgrade
#[async_trait]
pub trait LineSink: Send + Sync {
    /// Forward one line of output from the given package's upgrade
    async fn line(&self, package_id: &str, text: &str);
}

/// Requests cancellation of a running batch
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Signal cancellation; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observes cancellation requests
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_, signal) = cancellation();
        signal
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested
    ///
    /// Pends forever when every handle is gone without cancelling.
    pub async fn cancelled(&mut self) {
        let closed = self.rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Create a connected cancel handle and signal
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
}

/// What woke the runner up while supervising a process
enum Step<T> {
    Cancelled,
    Ready(T),
}

/// Runs one upgrade invocation to a classified outcome
#[derive(Clone)]
pub struct UpgradeRunner {
    backend: Arc<dyn Backend>,
    launcher: Arc<dyn ProcessLauncher>,
}

impl UpgradeRunner {
    /// Create a runner for the given backend and process launcher
    pub fn new(backend: Arc<dyn Backend>, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self { backend, launcher }
    }

    /// Upgrade one package
    ///
    /// Every call yields exactly one outcome. Output lines are forwarded to
    /// `sink` in emission order and kept in the outcome's log. On cancellation
    /// the child is killed and the partial log is retained.
    pub async fn run(
        &self,
        record: &PackageRecord,
        sink: &dyn LineSink,
        cancel: &mut CancelSignal,
    ) -> UpgradeOutcome {
        let id = record.id.clone();
        if cancel.is_cancelled() {
            return UpgradeOutcome::not_started(id);
        }

        let command = self.backend.build_upgrade_command(record);
        info!("Upgrading {}: {}", id, command);

        let mut handle = match self.launcher.launch(&command).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to launch upgrade of {}: {}", id, e);
                let status =
                    UpgradeStatus::failed_known(LAUNCH_FAILURE_CODE, format!("failed to launch: {e}"));
                return UpgradeOutcome::new(id, status, Vec::new());
            }
        };

        let mut log_lines = Vec::new();
        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                next = handle.next_line() => Step::Ready(next),
            };
            match step {
                Step::Cancelled => return cancelled(id, handle, log_lines).await,
                Step::Ready(Ok(Some(line))) => {
                    sink.line(&id, &line).await;
                    log_lines.push(line);
                }
                Step::Ready(Ok(None)) => break,
                Step::Ready(Err(e)) => {
                    warn!("Lost output of {}: {}", id, e);
                    terminate(&id, handle.as_mut()).await;
                    let status = UpgradeStatus::FailedUnknown {
                        code: STREAM_FAILURE_CODE,
                    };
                    return UpgradeOutcome::new(id, status, log_lines);
                }
            }
        }

        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => Step::Cancelled,
            exit = handle.wait() => Step::Ready(exit),
        };
        let status = match step {
            Step::Cancelled => return cancelled(id, handle, log_lines).await,
            Step::Ready(Ok(Some(code))) => self.backend.exit_code_table().classify(code),
            Step::Ready(Ok(None)) => UpgradeStatus::FailedUnknown { code: NO_EXIT_CODE },
            Step::Ready(Err(e)) => {
                warn!("Failed to wait for upgrade of {}: {}", id, e);
                UpgradeStatus::FailedUnknown {
                    code: STREAM_FAILURE_CODE,
                }
            }
        };
        debug!("Upgrade of {} finished: {}", id, status);
        UpgradeOutcome::new(id, status, log_lines)
    }
}

async fn cancelled(
    id: String,
    mut handle: Box<dyn ProcessHandle>,
    log_lines: Vec<String>,
) -> UpgradeOutcome {
    info!("Cancelling upgrade of {}", id);
    terminate(&id, handle.as_mut()).await;
    UpgradeOutcome::new(id, UpgradeStatus::Cancelled, log_lines)
}

async fn terminate(id: &str, handle: &mut dyn ProcessHandle) {
    if let Err(e) = handle.kill().await {
        warn!("Failed to terminate upgrade of {}: {}", id, e);
    }
}
