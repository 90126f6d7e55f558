//! updatery - winget upgrade discovery and orchestration CLI
//!
//! Modes:
//! - interactive (no subcommand): select packages and upgrade them
//! - `list`: print packages with an available upgrade
//! - `upgrade`: upgrade the given packages (or all) and report outcomes

use clap::Parser;
use colored::Colorize;
use log::{debug, warn};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use updatery::backend::{create_backend, Backend};
use updatery::cli::{CliArgs, Command};
use updatery::config::Config;
use updatery::controller::{Controller, ListingSource};
use updatery::domain::UpgradeSessionResult;
use updatery::interactive;
use updatery::orchestrator::{SessionEvent, UpgradeSession, EVENT_CHANNEL_CAPACITY};
use updatery::output::{create_formatter, OutputConfig, OutputFormat, TextFormatter, Verbosity};
use updatery::process::SystemLauncher;
use updatery::progress::Progress;
use updatery::runner::{cancellation, UpgradeRunner};
use updatery::scan::{load_listing_file, refresh_catalog};
use updatery::update::{CatalogFilter, SelectionState, UpdateCatalog};

/// Exit code when some upgrades failed
const EXIT_FAILED: u8 = 2;

/// Exit code when the batch was cancelled (128 + SIGINT)
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the default level
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Shared wiring for every mode
struct App {
    args: CliArgs,
    config: Config,
    backend: Arc<dyn Backend>,
    launcher: Arc<SystemLauncher>,
    filter: CatalogFilter,
    output: OutputConfig,
}

impl App {
    fn new(args: CliArgs) -> anyhow::Result<Self> {
        let mut config = Config::load(args.config.as_deref())?;
        if let Some(source) = &args.source {
            config.backend.source = source.clone();
        }
        config.catalog.exclude.extend(args.exclude.iter().cloned());
        if let Some(timeout) = args.timeout {
            config.scan.timeout_secs = timeout.as_secs();
        }
        config.validate()?;
        debug!("Effective configuration: {:?}", config);

        let backend: Arc<dyn Backend> = Arc::from(create_backend(&config.backend));
        let launcher = Arc::new(SystemLauncher::with_elevation(
            config.elevation.launcher.clone(),
        ));
        let filter = CatalogFilter::new(config.backend.source.clone())
            .with_exclude(config.catalog.exclude.clone());
        let output = OutputConfig::from_cli(args.json(), args.verbose, args.quiet, !args.no_color);

        Ok(Self {
            args,
            config,
            backend,
            launcher,
            filter,
            output,
        })
    }

    fn listing_source(&self) -> ListingSource {
        match &self.args.input {
            Some(path) => ListingSource::File(path.clone()),
            None => ListingSource::Live {
                timeout: self.config.scan.timeout(),
            },
        }
    }

    fn show_progress(&self) -> bool {
        self.output.format == OutputFormat::Text && self.output.verbosity != Verbosity::Quiet
    }

    /// Build the catalog from the saved listing or a live scan
    async fn load_catalog(&self) -> anyhow::Result<UpdateCatalog> {
        match self.listing_source() {
            ListingSource::File(path) => {
                Ok(load_listing_file(&path, self.backend.as_ref(), &self.filter)?)
            }
            ListingSource::Live { timeout } => {
                let progress = Progress::scan(self.show_progress(), self.backend.name());
                let catalog = refresh_catalog(
                    self.launcher.as_ref(),
                    self.backend.as_ref(),
                    &self.filter,
                    timeout,
                )
                .await;
                progress.finish();
                Ok(catalog?)
            }
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let command = args.command.clone();
    let app = App::new(args)?;

    match command {
        None => run_interactive(app).await,
        Some(Command::List { .. }) => run_list(app).await,
        Some(Command::Upgrade { all, ids, .. }) => run_upgrade(app, all, &ids).await,
    }
}

async fn run_interactive(app: App) -> anyhow::Result<ExitCode> {
    let mut notices = Vec::new();
    if !app.launcher.has_elevation() {
        notices.push(
            "No elevation launcher configured: upgrades run with the current privileges and may prompt or fail"
                .to_string(),
        );
    }

    let formatter = TextFormatter::with_color(app.output.verbosity, app.output.color);
    let listing = app.listing_source();
    let controller = Controller::new(app.backend, app.launcher, app.filter, listing);
    interactive::run(controller, formatter, &notices).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run_list(app: App) -> anyhow::Result<ExitCode> {
    let catalog = app.load_catalog().await?;

    let formatter = create_formatter(app.output.clone());
    let mut stdout = io::stdout().lock();
    formatter.format_catalog(&catalog, None, &mut stdout)?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

async fn run_upgrade(app: App, all: bool, ids: &[String]) -> anyhow::Result<ExitCode> {
    let catalog = app.load_catalog().await?;

    let mut selection = SelectionState::for_catalog(&catalog);
    if all {
        selection.select_all(catalog.ids());
    } else {
        for id in ids {
            if !catalog.contains(id) {
                warn!("{} has no upgrade available, skipping", id);
                continue;
            }
            if !selection.is_selected(id) {
                selection.toggle(id);
            }
        }
    }
    let records = catalog.selected_records(&selection);

    let result = if records.is_empty() {
        UpgradeSessionResult::empty()
    } else {
        let total = records.len() as u64;
        let session = UpgradeSession::new(UpgradeRunner::new(
            Arc::clone(&app.backend),
            app.launcher.clone(),
        ));
        let (cancel, signal) = cancellation();
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let batch = tokio::spawn(async move { session.run_batch(records, &tx, signal).await });

        let text = TextFormatter::with_color(app.output.verbosity, app.output.color);
        let stream_lines = app.show_progress();
        let mut progress = Progress::batch(app.show_progress(), total);

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(SessionEvent::Started { package_id, .. }) => progress.package_started(&package_id),
                    Some(SessionEvent::LogLine { package_id, text: line }) => {
                        if stream_lines && !line.trim().is_empty() {
                            progress.log_line(&text.log_line(&package_id, &line));
                        }
                    }
                    Some(SessionEvent::Outcome(outcome)) => progress.package_finished(&outcome),
                    None => break,
                },
                interrupt = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                    interrupt?;
                    progress.cancelling();
                    cancel.cancel();
                }
            }
        }
        debug!("Batch finished with {} failure(s)", progress.failed());
        progress.finish();
        batch.await?
    };

    let formatter = create_formatter(app.output.clone());
    let mut stdout = io::stdout().lock();
    formatter.format_session(&result, &mut stdout)?;
    stdout.flush()?;

    if result.cancelled > 0 {
        Ok(ExitCode::from(EXIT_CANCELLED))
    } else if result.failed > 0 {
        Ok(ExitCode::from(EXIT_FAILED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
