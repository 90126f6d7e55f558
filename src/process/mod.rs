//! Process execution capability
//!
//! This module provides:
//! - Argument-vector command construction (never a shell string)
//! - The launcher/handle traits the runner and scanner are written against
//! - The system implementation backed by tokio processes

mod system;
#[cfg(test)]
pub(crate) mod testing;

pub use system::{SystemLauncher, SystemProcess};

use crate::error::{LaunchError, StreamError};
use async_trait::async_trait;
use std::fmt;

/// A program plus its arguments, passed to the OS without shell interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path
    pub program: String,
    /// Arguments, each passed as a single opaque argument
    pub args: Vec<String>,
    /// Whether the command must run with administrative privileges
    pub elevated: bool,
}

impl CommandSpec {
    /// Create a command without arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            elevated: false,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Mark the command as requiring elevation
    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }

    /// Full argument vector including the program
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// A running process whose combined output is read line by line
#[async_trait]
pub trait ProcessHandle: Send {
    /// Next output line in emission order, `None` once output is exhausted
    async fn next_line(&mut self) -> Result<Option<String>, StreamError>;

    /// Wait for exit; `None` when the process ended without an exit code
    async fn wait(&mut self) -> Result<Option<i32>, StreamError>;

    /// Terminate the process and reap it
    async fn kill(&mut self) -> Result<(), StreamError>;
}

/// Capability to start processes, optionally elevated
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start a command
    async fn launch(&self, command: &CommandSpec) -> Result<Box<dyn ProcessHandle>, LaunchError>;
}
