//! Interactive control flow
//!
//! The controller owns the catalog and the selection. Scans and upgrade
//! batches run on spawned tasks and report back over channels, so state is
//! only ever mutated here, one message at a time:
//! - user actions arrive on `UserAction` channel
//! - results come back as worker messages
//! - everything the surface needs to render goes out as `UiEvent`
//!
//! While a batch runs, refreshes and selection changes are rejected.

use crate::backend::Backend;
use crate::domain::{UpgradeOutcome, UpgradeSessionResult};
use crate::error::{AppError, RefreshError};
use crate::orchestrator::{SessionEvent, UpgradeSession, EVENT_CHANNEL_CAPACITY};
use crate::process::ProcessLauncher;
use crate::runner::{cancellation, CancelHandle, UpgradeRunner};
use crate::scan::{load_listing_file, refresh_catalog};
use crate::update::{CatalogFilter, SelectionState, UpdateCatalog};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Requests from the interaction surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Flip the selection of one package
    Toggle(String),
    /// Select every package in the catalog
    SelectAll,
    /// Deselect everything
    Clear,
    /// Re-scan the listing
    Refresh,
    /// Upgrade the selected packages
    Upgrade,
    /// Cancel the running batch
    Cancel,
    /// Leave, cancelling a running batch first
    Quit,
}

/// Updates for the interaction surface
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A refresh started
    Refreshing,
    /// The catalog was replaced
    CatalogChanged(UpdateCatalog),
    /// The selection changed (ids in catalog order)
    SelectionChanged(Vec<String>),
    /// An upgrade is about to launch
    UpgradeStarted {
        package_id: String,
        index: usize,
        total: usize,
    },
    /// One line of upgrade output
    LogLine { package_id: String, text: String },
    /// One package finished
    Outcome(UpgradeOutcome),
    /// The batch finished or was cancelled
    SessionComplete(UpgradeSessionResult),
    /// Informational message, usually a rejected action
    Notice(String),
    /// The refresh failed and the previous catalog was kept
    RefreshFailed(String),
}

/// Where listings come from
#[derive(Debug, Clone)]
pub enum ListingSource {
    /// Run the backend list command
    Live { timeout: Duration },
    /// Read a saved listing
    File(PathBuf),
}

/// Messages from spawned work back to the controller
enum WorkerMessage {
    Refreshed(Result<UpdateCatalog, String>),
    Session(SessionEvent),
    BatchDone(UpgradeSessionResult),
}

/// What the controller is currently waiting on
enum Activity {
    Idle,
    Refreshing,
    Upgrading(CancelHandle),
}

/// Whether the control loop keeps running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Single owner of catalog and selection state
pub struct Controller {
    backend: Arc<dyn Backend>,
    launcher: Arc<dyn ProcessLauncher>,
    session: UpgradeSession,
    filter: CatalogFilter,
    listing: ListingSource,
    catalog: UpdateCatalog,
    selection: SelectionState,
    activity: Activity,
    quit_requested: bool,
}

impl Controller {
    /// Create a controller with an empty catalog
    pub fn new(
        backend: Arc<dyn Backend>,
        launcher: Arc<dyn ProcessLauncher>,
        filter: CatalogFilter,
        listing: ListingSource,
    ) -> Self {
        let runner = UpgradeRunner::new(Arc::clone(&backend), Arc::clone(&launcher));
        Self {
            backend,
            launcher,
            session: UpgradeSession::new(runner),
            filter,
            listing,
            catalog: UpdateCatalog::default(),
            selection: SelectionState::default(),
            activity: Activity::Idle,
            quit_requested: false,
        }
    }

    /// Drive the control loop until quit or until the action channel closes
    ///
    /// A refresh is started immediately.
    pub async fn run(mut self, mut actions: mpsc::Receiver<UserAction>, ui: mpsc::Sender<UiEvent>) {
        let (worker_tx, mut worker_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.start_refresh(&worker_tx, &ui).await;

        loop {
            let flow = tokio::select! {
                action = actions.recv(), if !self.quit_requested => match action {
                    Some(action) => self.handle_action(action, &worker_tx, &ui).await,
                    None => self.handle_action(UserAction::Quit, &worker_tx, &ui).await,
                },
                Some(message) = worker_rx.recv() => self.handle_worker(message, &ui).await,
            };
            if flow == Flow::Quit {
                break;
            }
        }
        info!("Controller stopped");
    }

    async fn handle_action(
        &mut self,
        action: UserAction,
        worker_tx: &mpsc::Sender<WorkerMessage>,
        ui: &mpsc::Sender<UiEvent>,
    ) -> Flow {
        debug!("User action: {:?}", action);
        match action {
            UserAction::Quit => {
                if let Activity::Upgrading(cancel) = &self.activity {
                    info!("Quit requested during a batch, cancelling first");
                    cancel.cancel();
                    self.quit_requested = true;
                    return Flow::Continue;
                }
                return Flow::Quit;
            }
            UserAction::Cancel => match &self.activity {
                Activity::Upgrading(cancel) => cancel.cancel(),
                _ => notify(ui, "Nothing to cancel").await,
            },
            UserAction::Refresh => match self.activity {
                Activity::Idle => self.start_refresh(worker_tx, ui).await,
                Activity::Refreshing => notify(ui, "A refresh is already running").await,
                Activity::Upgrading(_) => {
                    notify(ui, "Cannot refresh while upgrades are running").await
                }
            },
            UserAction::Upgrade => match self.activity {
                Activity::Idle => self.start_batch(worker_tx, ui).await,
                Activity::Refreshing => {
                    notify(ui, "Wait for the refresh to finish before upgrading").await
                }
                Activity::Upgrading(_) => notify(ui, "Upgrades are already running").await,
            },
            UserAction::Toggle(_) | UserAction::SelectAll | UserAction::Clear => {
                if matches!(self.activity, Activity::Upgrading(_)) {
                    notify(ui, "Selection is locked while upgrades are running").await;
                    return Flow::Continue;
                }
                match action {
                    UserAction::Toggle(id) => self.selection.toggle(&id),
                    UserAction::SelectAll => self.selection.select_all(self.catalog.ids()),
                    _ => self.selection.clear(),
                }
                self.publish_selection(ui).await;
            }
        }
        Flow::Continue
    }

    async fn handle_worker(&mut self, message: WorkerMessage, ui: &mpsc::Sender<UiEvent>) -> Flow {
        match message {
            WorkerMessage::Refreshed(Ok(catalog)) => {
                self.activity = Activity::Idle;
                info!("Catalog refreshed: {} upgradable package(s)", catalog.len());
                self.replace_catalog(catalog, ui).await;
            }
            WorkerMessage::Refreshed(Err(message)) => {
                self.activity = Activity::Idle;
                warn!("Refresh failed: {}", message);
                emit(ui, UiEvent::RefreshFailed(message)).await;
            }
            WorkerMessage::Session(event) => {
                let event = match event {
                    SessionEvent::Started {
                        package_id,
                        index,
                        total,
                    } => UiEvent::UpgradeStarted {
                        package_id,
                        index,
                        total,
                    },
                    SessionEvent::LogLine { package_id, text } => {
                        UiEvent::LogLine { package_id, text }
                    }
                    SessionEvent::Outcome(outcome) => UiEvent::Outcome(outcome),
                };
                emit(ui, event).await;
            }
            WorkerMessage::BatchDone(result) => {
                self.activity = Activity::Idle;
                let remaining = self.catalog.without(result.succeeded_ids());
                self.replace_catalog(remaining, ui).await;
                emit(ui, UiEvent::SessionComplete(result)).await;
                if self.quit_requested {
                    return Flow::Quit;
                }
            }
        }
        Flow::Continue
    }

    async fn start_refresh(&mut self, worker_tx: &mpsc::Sender<WorkerMessage>, ui: &mpsc::Sender<UiEvent>) {
        self.activity = Activity::Refreshing;
        emit(ui, UiEvent::Refreshing).await;

        let backend = Arc::clone(&self.backend);
        let launcher = Arc::clone(&self.launcher);
        let filter = self.filter.clone();
        let listing = self.listing.clone();
        let tx = worker_tx.clone();

        tokio::spawn(async move {
            let result = match listing {
                ListingSource::Live { timeout } => {
                    refresh_catalog(launcher.as_ref(), backend.as_ref(), &filter, timeout)
                        .await
                        .map_err(|e: RefreshError| e.to_string())
                }
                ListingSource::File(path) => load_listing_file(&path, backend.as_ref(), &filter)
                    .map_err(|e: AppError| e.to_string()),
            };
            if tx.send(WorkerMessage::Refreshed(result)).await.is_err() {
                debug!("Controller gone, dropping refresh result");
            }
        });
    }

    async fn start_batch(&mut self, worker_tx: &mpsc::Sender<WorkerMessage>, ui: &mpsc::Sender<UiEvent>) {
        let records = self.catalog.selected_records(&self.selection);
        if records.is_empty() {
            notify(ui, "No packages selected").await;
            return;
        }

        let (cancel, signal) = cancellation();
        self.activity = Activity::Upgrading(cancel);

        let session = self.session.clone();
        let tx = worker_tx.clone();

        tokio::spawn(async move {
            let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            let batch = async move { session.run_batch(records, &events_tx, signal).await };
            let forward = async {
                while let Some(event) = events_rx.recv().await {
                    if tx.send(WorkerMessage::Session(event)).await.is_err() {
                        debug!("Controller gone, dropping session event");
                    }
                }
            };
            let (result, ()) = tokio::join!(batch, forward);
            if tx.send(WorkerMessage::BatchDone(result)).await.is_err() {
                debug!("Controller gone, dropping batch result");
            }
        });
    }

    async fn replace_catalog(&mut self, catalog: UpdateCatalog, ui: &mpsc::Sender<UiEvent>) {
        self.catalog = catalog;
        self.selection.reconcile(&self.catalog);
        emit(ui, UiEvent::CatalogChanged(self.catalog.clone())).await;
        self.publish_selection(ui).await;
    }

    async fn publish_selection(&self, ui: &mpsc::Sender<UiEvent>) {
        let ids = self
            .catalog
            .ids()
            .filter(|id| self.selection.is_selected(id))
            .map(str::to_string)
            .collect();
        emit(ui, UiEvent::SelectionChanged(ids)).await;
    }
}

async fn emit(ui: &mpsc::Sender<UiEvent>, event: UiEvent) {
    if ui.send(event).await.is_err() {
        debug!("UI event receiver closed");
    }
}

async fn notify(ui: &mpsc::Sender<UiEvent>, message: &str) {
    emit(ui, UiEvent::Notice(message.to_string())).await;
}
