//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ParseError: Backend listing could not be turned into records
//! - LaunchError: Process could not be started (missing binary, elevation denied)
//! - StreamError: Output of a running process could not be read
//! - RefreshError: A listing scan failed (launch, stream, timeout or parse)
//! - ConfigError: Issues with the configuration file

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Listing refresh errors
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Errors reading a saved listing
    #[error("failed to read listing {path}: {source}")]
    ListingRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors turning listing text into records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The header does not name one of the expected columns
    #[error("listing header is missing the '{column}' column")]
    MissingColumn { column: String },

    /// Two rows share the same identifier
    #[error("listing contains duplicate package id '{id}'")]
    DuplicateId { id: String },

    /// Nothing that looks like a listing table
    #[error("listing is empty or not recognized")]
    EmptyOrUnrecognized,
}

/// Errors starting a process
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Executable could not be found
    #[error("executable '{program}' not found")]
    NotFound { program: String },

    /// The elevation launcher refused or failed
    #[error("elevation denied for '{program}': {message}")]
    ElevationDenied { program: String, message: String },

    /// Spawning failed for another reason
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reading from a running process
#[derive(Error, Debug)]
pub enum StreamError {
    /// Reading an output line failed
    #[error("failed to read process output: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the process to exit failed
    #[error("failed to wait for process: {source}")]
    Wait {
        #[source]
        source: std::io::Error,
    },

    /// Terminating the process failed
    #[error("failed to terminate process: {source}")]
    Kill {
        #[source]
        source: std::io::Error,
    },
}

/// Errors refreshing the catalog from the backend
#[derive(Error, Debug)]
pub enum RefreshError {
    /// The list command could not be started
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// The list command output could not be read
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The list command did not finish in time
    #[error("listing scan timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The output could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A configuration value is not usable
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ParseError {
    /// Creates a new MissingColumn error
    pub fn missing_column(column: impl Into<String>) -> Self {
        ParseError::MissingColumn {
            column: column.into(),
        }
    }

    /// Creates a new DuplicateId error
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        ParseError::DuplicateId { id: id.into() }
    }
}

impl LaunchError {
    /// Classifies a spawn failure for a program
    pub fn from_spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        let program = program.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => LaunchError::NotFound { program },
            std::io::ErrorKind::PermissionDenied => LaunchError::ElevationDenied {
                program,
                message: source.to_string(),
            },
            _ => LaunchError::Spawn { program, source },
        }
    }
}

impl ConfigError {
    /// Creates a new Parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new Invalid error
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            message: message.into(),
        }
    }
}
