//! Scripted launcher for unit tests

use super::{CommandSpec, ProcessHandle, ProcessLauncher};
use crate::error::{LaunchError, StreamError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted behaviour of one process
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    /// Output lines, `Err(())` simulates a read failure at that point
    pub lines: Vec<Result<String, ()>>,
    /// Exit code reported by wait
    pub exit: Option<i32>,
    /// Never finish on its own (only a kill ends it)
    pub hang: bool,
    /// Fail at launch with NotFound
    pub fail_launch: bool,
}

impl Script {
    pub fn exit(code: i32, lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| Ok(l.to_string())).collect(),
            exit: Some(code),
            ..Self::default()
        }
    }

    pub fn hang(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| Ok(l.to_string())).collect(),
            hang: true,
            ..Self::default()
        }
    }

    pub fn launch_failure() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }
}

type ScriptFn = dyn Fn(&CommandSpec) -> Script + Send + Sync;

/// Launcher returning scripted processes chosen per command
pub(crate) struct ScriptedLauncher {
    script: Box<ScriptFn>,
    launched: Mutex<Vec<CommandSpec>>,
    kills: Arc<AtomicUsize>,
}

impl ScriptedLauncher {
    pub fn new(script: impl Fn(&CommandSpec) -> Script + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            launched: Mutex::new(Vec::new()),
            kills: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Commands launched so far
    pub fn launched(&self) -> Vec<CommandSpec> {
        self.launched.lock().unwrap().clone()
    }

    /// Number of kill requests received
    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessLauncher for ScriptedLauncher {
    async fn launch(&self, command: &CommandSpec) -> Result<Box<dyn ProcessHandle>, LaunchError> {
        self.launched.lock().unwrap().push(command.clone());
        let script = (self.script)(command);
        if script.fail_launch {
            return Err(LaunchError::NotFound {
                program: command.program.clone(),
            });
        }
        Ok(Box::new(ScriptedProcess {
            lines: script.lines.into_iter().collect(),
            exit: script.exit,
            hang: script.hang,
            killed: false,
            kills: Arc::clone(&self.kills),
        }))
    }
}

struct ScriptedProcess {
    lines: VecDeque<Result<String, ()>>,
    exit: Option<i32>,
    hang: bool,
    killed: bool,
    kills: Arc<AtomicUsize>,
}

#[async_trait]
impl ProcessHandle for ScriptedProcess {
    async fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        match self.lines.pop_front() {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(())) => Err(StreamError::Read {
                source: std::io::Error::other("pipe closed"),
            }),
            None if self.hang && !self.killed => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn wait(&mut self) -> Result<Option<i32>, StreamError> {
        if self.killed {
            return Ok(None);
        }
        if self.hang {
            return std::future::pending().await;
        }
        Ok(self.exit)
    }

    async fn kill(&mut self) -> Result<(), StreamError> {
        self.killed = true;
        self.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
