//! System process launcher backed by tokio
//!
//! stdout and stderr share one pipe, so lines arrive in exactly the order the
//! child wrote them. Children are killed when their handle is dropped so an
//! abandoned upgrade never keeps running unattended.

use super::{CommandSpec, ProcessHandle, ProcessLauncher};
use crate::error::{LaunchError, StreamError};
use async_trait::async_trait;
use log::debug;
use std::io::{BufRead, BufReader, Read};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// Buffered output lines per process
const LINE_BUFFER: usize = 256;

/// Launcher that starts real OS processes
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher {
    /// Program and arguments prefixed to elevated commands (e.g. `gsudo`, `sudo -n`)
    elevation: Option<Vec<String>>,
}

impl SystemLauncher {
    /// Create a launcher that runs elevated commands with the current privileges
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a launcher that wraps elevated commands with a launcher prefix
    pub fn with_elevation(prefix: Vec<String>) -> Self {
        let elevation = if prefix.is_empty() { None } else { Some(prefix) };
        Self { elevation }
    }

    /// Returns true if an elevation prefix is configured
    pub fn has_elevation(&self) -> bool {
        self.elevation.is_some()
    }

    /// Resolve the argument vector actually executed
    fn resolve(&self, command: &CommandSpec) -> (String, Vec<String>) {
        match (&self.elevation, command.elevated) {
            (Some(prefix), true) => {
                let mut args: Vec<String> = prefix[1..].to_vec();
                args.push(command.program.clone());
                args.extend(command.args.iter().cloned());
                (prefix[0].clone(), args)
            }
            _ => (command.program.clone(), command.args.clone()),
        }
    }
}

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn launch(&self, command: &CommandSpec) -> Result<Box<dyn ProcessHandle>, LaunchError> {
        let (program, args) = self.resolve(command);
        debug!("spawning {} {}", program, args.join(" "));

        let spawn_error = |source: std::io::Error| LaunchError::Spawn {
            program: program.clone(),
            source,
        };
        let (output, writer) = std::io::pipe().map_err(spawn_error)?;
        let stderr_writer = writer.try_clone().map_err(spawn_error)?;

        let mut process = Command::new(&program);
        process
            .args(&args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true);
        let child = process
            .spawn()
            .map_err(|e| LaunchError::from_spawn(&program, e))?;
        // Our copies of the write end must close for the reader to see EOF
        drop(process);

        // Runs until every holder of the write end, grandchildren included, closes it
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        std::thread::Builder::new()
            .name(format!("{program}-output"))
            .spawn(move || forward_lines(output, tx))
            .map_err(spawn_error)?;

        Ok(Box::new(SystemProcess { child, lines: rx }))
    }
}

/// Handle to a process started by [`SystemLauncher`]
pub struct SystemProcess {
    child: Child,
    lines: mpsc::Receiver<std::io::Result<String>>,
}

#[async_trait]
impl ProcessHandle for SystemProcess {
    async fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        match self.lines.recv().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(source)) => Err(StreamError::Read { source }),
            None => Ok(None),
        }
    }

    async fn wait(&mut self) -> Result<Option<i32>, StreamError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|source| StreamError::Wait { source })?;
        Ok(status.code())
    }

    async fn kill(&mut self) -> Result<(), StreamError> {
        self.child
            .kill()
            .await
            .map_err(|source| StreamError::Kill { source })
    }
}

/// Read raw lines from the merged pipe and forward their visible text
///
/// Bytes are decoded lossily since installers do not always emit UTF-8.
fn forward_lines<R: Read>(pipe: R, tx: mpsc::Sender<std::io::Result<String>>) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                if tx.blocking_send(Ok(visible_line(&text))).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
}

/// Strip line terminators and keep only the text after progress-bar carriage returns
fn visible_line(text: &str) -> String {
    let text = text.trim_end_matches(['\r', '\n']);
    text.rsplit('\r').next().unwrap_or(text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_line() {
        assert_eq!(visible_line("hello\r\n"), "hello");
        assert_eq!(visible_line("  10%\r  50%\r 100%\n"), " 100%");
        assert_eq!(visible_line("plain"), "plain");
    }

    #[test]
    fn test_resolve_without_elevation() {
        let launcher = SystemLauncher::new();
        let cmd = CommandSpec::new("winget").arg("upgrade").elevated();
        let (program, args) = launcher.resolve(&cmd);
        assert_eq!(program, "winget");
        assert_eq!(args, vec!["upgrade"]);
    }

    #[test]
    fn test_resolve_with_elevation_prefix() {
        let launcher = SystemLauncher::with_elevation(vec!["sudo".to_string(), "-n".to_string()]);
        let cmd = CommandSpec::new("winget").args(["upgrade", "--id", "A.B"]).elevated();
        let (program, args) = launcher.resolve(&cmd);
        assert_eq!(program, "sudo");
        assert_eq!(args, vec!["-n", "winget", "upgrade", "--id", "A.B"]);
    }

    #[test]
    fn test_resolve_prefix_only_for_elevated_commands() {
        let launcher = SystemLauncher::with_elevation(vec!["sudo".to_string()]);
        let cmd = CommandSpec::new("winget").arg("list");
        let (program, _) = launcher.resolve(&cmd);
        assert_eq!(program, "winget");
    }

    #[test]
    fn test_with_empty_elevation_is_none() {
        assert!(!SystemLauncher::with_elevation(Vec::new()).has_elevation());
    }

    #[tokio::test]
    async fn test_launch_missing_program() {
        let launcher = SystemLauncher::new();
        let cmd = CommandSpec::new("updatery-no-such-program-xyz");
        let err = match launcher.launch(&cmd).await {
            Ok(_) => panic!("expected launch failure"),
            Err(e) => e,
        };
        assert!(matches!(err, LaunchError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_streams_lines_and_exit_code() {
        let launcher = SystemLauncher::new();
        let cmd = CommandSpec::new("sh").args(["-c", "echo one; echo two; exit 3"]);
        let mut handle = launcher.launch(&cmd).await.unwrap();

        let mut lines = Vec::new();
        while let Some(line) = handle.next_line().await.unwrap() {
            lines.push(line);
        }
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(handle.wait().await.unwrap(), Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_merges_stderr() {
        let launcher = SystemLauncher::new();
        let cmd = CommandSpec::new("sh").args(["-c", "echo problem 1>&2"]);
        let mut handle = launcher.launch(&cmd).await.unwrap();

        assert_eq!(handle.next_line().await.unwrap(), Some("problem".to_string()));
        assert_eq!(handle.next_line().await.unwrap(), None);
        assert_eq!(handle.wait().await.unwrap(), Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interleaved_streams_keep_write_order() {
        let launcher = SystemLauncher::new();
        let script = "i=1; while [ $i -le 200 ]; do echo out$i; echo err$i 1>&2; i=$((i+1)); done";
        let cmd = CommandSpec::new("sh").args(["-c", script]);
        let mut handle = launcher.launch(&cmd).await.unwrap();

        let mut lines = Vec::new();
        while let Some(line) = handle.next_line().await.unwrap() {
            lines.push(line);
        }
        let expected: Vec<String> = (1..=200)
            .flat_map(|i| [format!("out{i}"), format!("err{i}")])
            .collect();
        assert_eq!(lines, expected);
        assert_eq!(handle.wait().await.unwrap(), Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kill_terminates_child() {
        let launcher = SystemLauncher::new();
        let cmd = CommandSpec::new("sh").args(["-c", "sleep 30"]);
        let mut handle = launcher.launch(&cmd).await.unwrap();

        handle.kill().await.unwrap();
        assert_eq!(handle.wait().await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_elevation_prefix_is_executed() {
        let launcher = SystemLauncher::with_elevation(vec!["env".to_string()]);
        let cmd = CommandSpec::new("sh").args(["-c", "echo elevated"]).elevated();
        let mut handle = launcher.launch(&cmd).await.unwrap();

        assert_eq!(handle.next_line().await.unwrap(), Some("elevated".to_string()));
        assert_eq!(handle.wait().await.unwrap(), Some(0));
    }
}
