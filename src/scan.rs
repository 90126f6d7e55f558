//! Catalog refresh from the backend listing
//!
//! The listing command runs unelevated and is killed if it exceeds the scan
//! timeout. A saved listing file can stand in for the live command.

use crate::backend::Backend;
use crate::domain::PackageRecord;
use crate::error::{AppError, RefreshError, StreamError};
use crate::process::{ProcessHandle, ProcessLauncher};
use crate::update::{CatalogFilter, UpdateCatalog};
use log::{debug, info, warn};
use std::path::Path;
use std::time::Duration;

/// Run the backend listing command and parse its output
pub async fn scan_listing(
    launcher: &dyn ProcessLauncher,
    backend: &dyn Backend,
    timeout: Duration,
) -> Result<Vec<PackageRecord>, RefreshError> {
    let command = backend.list_command();
    info!("Scanning {} listing: {}", backend.name(), command);

    let mut handle = launcher.launch(&command).await?;
    let collected = tokio::time::timeout(timeout, collect(handle.as_mut())).await;
    let (text, code) = match collected {
        Ok(collected) => collected?,
        Err(_) => {
            warn!("Listing scan exceeded {:?}, terminating", timeout);
            if let Err(e) = handle.kill().await {
                warn!("Failed to terminate listing scan: {}", e);
            }
            return Err(RefreshError::Timeout {
                seconds: timeout.as_secs(),
            });
        }
    };

    // winget exits non-zero when nothing matches, so the text decides
    if let Some(code) = code.filter(|code| *code != 0) {
        debug!("Listing command exited with {:#X}", code as u32);
    }

    let records = backend.read_listing(&text)?;
    debug!("Listing contained {} record(s)", records.len());
    Ok(records)
}

/// Scan and build a filtered catalog
pub async fn refresh_catalog(
    launcher: &dyn ProcessLauncher,
    backend: &dyn Backend,
    filter: &CatalogFilter,
    timeout: Duration,
) -> Result<UpdateCatalog, RefreshError> {
    let records = scan_listing(launcher, backend, timeout).await?;
    Ok(UpdateCatalog::build(records, filter))
}

/// Build a filtered catalog from a saved listing file
pub fn load_listing_file(
    path: &Path,
    backend: &dyn Backend,
    filter: &CatalogFilter,
) -> Result<UpdateCatalog, AppError> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::ListingRead {
        path: path.to_path_buf(),
        source,
    })?;
    let records = backend.read_listing(&text).map_err(RefreshError::from)?;
    Ok(UpdateCatalog::build(records, filter))
}

async fn collect(handle: &mut dyn ProcessHandle) -> Result<(String, Option<i32>), StreamError> {
    let mut text = String::new();
    while let Some(line) = handle.next_line().await? {
        text.push_str(&line);
        text.push('\n');
    }
    let code = handle.wait().await?;
    Ok((text, code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::WingetBackend;
    use crate::error::ParseError;
    use crate::process::testing::{Script, ScriptedLauncher};
    use std::fs;
    use tempfile::TempDir;

    const LISTING: &[&str] = &[
        "Name               Id                 Version  Available  Source",
        "--------------------------------------------------------------------",
        "Git                Git.Git            2.43.0   2.44.0     winget",
        "Node.js LTS        OpenJS.NodeJS.LTS  20.11.0  20.11.1    winget",
        "Contoso Tool       Contoso.Tool       1.0      1.0        winget",
        "3 upgrades available.",
    ];

    #[tokio::test]
    async fn test_scan_listing_parses_output() {
        let launcher = ScriptedLauncher::new(|_| Script::exit(0, LISTING));
        let backend = WingetBackend::default();

        let records = scan_listing(&launcher, &backend, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].name, "Node.js LTS");
        let launched = launcher.launched();
        assert!(!launched[0].elevated);
        assert_eq!(launched[0].args[0], "list");
    }

    #[tokio::test]
    async fn test_refresh_catalog_filters() {
        let launcher = ScriptedLauncher::new(|_| Script::exit(0, LISTING));
        let backend = WingetBackend::default();
        let filter = CatalogFilter::new("winget").with_exclude(vec!["Git.Git".to_string()]);

        let catalog = refresh_catalog(&launcher, &backend, &filter, Duration::from_secs(5))
            .await
            .unwrap();

        let ids: Vec<&str> = catalog.ids().collect();
        assert_eq!(ids, vec!["OpenJS.NodeJS.LTS"]);
    }

    #[tokio::test]
    async fn test_scan_no_packages_message_nonzero_exit() {
        let launcher = ScriptedLauncher::new(|_| {
            Script::exit(
                0x8A150014_u32 as i32,
                &["No installed package found matching input criteria."],
            )
        });
        let records = scan_listing(&launcher, &WingetBackend::default(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_scan_launch_failure() {
        let launcher = ScriptedLauncher::new(|_| Script::launch_failure());
        let err = scan_listing(&launcher, &WingetBackend::default(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::Launch(_)));
    }

    #[tokio::test]
    async fn test_scan_timeout_kills_process() {
        let launcher = ScriptedLauncher::new(|_| Script::hang(&["Name Id"]));
        let err = scan_listing(&launcher, &WingetBackend::default(), Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(err, RefreshError::Timeout { .. }));
        assert_eq!(launcher.kills(), 1);
    }

    #[tokio::test]
    async fn test_scan_parse_error() {
        let launcher = ScriptedLauncher::new(|_| Script::exit(0, &["something went wrong"]));
        let err = scan_listing(&launcher, &WingetBackend::default(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RefreshError::Parse(ParseError::EmptyOrUnrecognized)
        ));
    }

    #[tokio::test]
    async fn test_scan_stream_error() {
        let launcher = ScriptedLauncher::new(|_| Script {
            lines: vec![Err(())],
            ..Script::default()
        });
        let err = scan_listing(&launcher, &WingetBackend::default(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::Stream(_)));
    }

    #[test]
    fn test_load_listing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("listing.txt");
        fs::write(&path, LISTING.join("\n")).unwrap();

        let catalog = load_listing_file(
            &path,
            &WingetBackend::default(),
            &CatalogFilter::new("winget"),
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_load_listing_file_missing() {
        let dir = TempDir::new().unwrap();
        let err = load_listing_file(
            &dir.path().join("missing.txt"),
            &WingetBackend::default(),
            &CatalogFilter::new("winget"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ListingRead { .. }));
    }
}
