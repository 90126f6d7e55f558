//! CLI argument parsing module for updatery

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Parse a timeout in format: N (seconds), Ns (seconds), Nm (minutes)
fn parse_timeout(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty timeout string".to_string());
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else {
        (s, 1)
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number in timeout: {}", num_str))?;
    if num == 0 {
        return Err("timeout must be positive".to_string());
    }

    let secs = num
        .checked_mul(multiplier)
        .ok_or_else(|| format!("timeout is too large: {}", s))?;
    Ok(Duration::from_secs(secs))
}

/// Discover and apply pending package upgrades
#[derive(Parser, Debug, Clone)]
#[command(
    name = "updatery",
    version,
    about = "Discover and apply pending winget package upgrades"
)]
pub struct CliArgs {
    /// Command to run (interactive mode when omitted)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (default: per-user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Read the listing from a saved file instead of running the backend
    #[arg(long, global = true)]
    pub input: Option<PathBuf>,

    /// Expected source tag of upgradable packages
    #[arg(long, global = true)]
    pub source: Option<String>,

    /// Never offer this package id (can be specified multiple times)
    #[arg(long, global = true, action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Listing scan timeout (e.g., 90, 90s, 2m)
    #[arg(long, global = true, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List packages with an available upgrade
    List {
        /// Output results in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Upgrade the given packages, or all of them
    Upgrade {
        /// Upgrade every package in the catalog
        #[arg(long, conflicts_with = "ids")]
        all: bool,

        /// Package ids to upgrade
        #[arg(required_unless_present = "all")]
        ids: Vec<String>,

        /// Output results in JSON format
        #[arg(long)]
        json: bool,
    },
}

impl CliArgs {
    /// Whether the selected command writes JSON
    pub fn json(&self) -> bool {
        matches!(
            self.command,
            Some(Command::List { json: true }) | Some(Command::Upgrade { json: true, .. })
        )
    }
}
