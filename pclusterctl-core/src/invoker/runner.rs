//! Process runners - the seam between the invoker and the operating system
//!
//! Provides a trait for launching a tool, with:
//! - Real implementation using tokio::process
//! - Mock implementation for testing
//! - Deadline and cancellation enforcement

use std::io::ErrorKind;
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::env::ToolEnv;
use crate::error::{CtlError, Result};

/// Everything needed to launch one child process
#[derive(Debug, Clone)]
pub struct Launch {
    pub program: String,
    pub args: Vec<String>,
    pub env: ToolEnv,
    pub deadline: Option<Duration>,
}

/// Captured output of a child that exited
#[derive(Debug, Clone, Default)]
pub struct Output {
    /// Exit code, or `-N` when killed by signal `N`; `None` only when the
    /// platform reports neither
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// What happened to a launch
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(Output),
    NotFound,
    TimedOut(Duration),
    Cancelled,
}

/// Exit code as a shell-agnostic integer: `-N` for death by signal `N`
fn status_code(status: ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.code().or_else(|| status.signal().map(|signal| -signal))
    }
    #[cfg(not(unix))]
    {
        status.code()
    }
}

/// Trait for process execution (testable)
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, launch: &Launch, cancel: &CancellationToken) -> Result<RunOutcome>;
}

/// Real runner using tokio::process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, launch: &Launch, cancel: &CancellationToken) -> Result<RunOutcome> {
        if cancel.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        let spawned = Command::new(&launch.program)
            .args(&launch.args)
            .env_clear()
            .envs(launch.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match spawned {
            Ok(child) => child,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(program = %launch.program, "executable not found");
                return Ok(RunOutcome::NotFound);
            }
            Err(err) => return Err(CtlError::spawn(&launch.program, err)),
        };

        debug!(program = %launch.program, pid = ?child.id(), "child started");

        // Dropping the wait future drops the child, and kill_on_drop reaps it
        let wait = child.wait_with_output();
        let output = match launch.deadline {
            Some(deadline) => tokio::select! {
                res = wait => res?,
                _ = tokio::time::sleep(deadline) => return Ok(RunOutcome::TimedOut(deadline)),
                _ = cancel.cancelled() => return Ok(RunOutcome::Cancelled),
            },
            None => tokio::select! {
                res = wait => res?,
                _ = cancel.cancelled() => return Ok(RunOutcome::Cancelled),
            },
        };

        Ok(RunOutcome::Completed(Output {
            status: status_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }))
    }
}

/// Mock runner for testing: replays queued outcomes and records launches
#[derive(Default)]
pub struct MockRunner {
    responses: Mutex<Vec<RunOutcome>>,
    launches: Mutex<Vec<Launch>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an outcome to return on the next run
    pub fn push(&self, outcome: RunOutcome) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(outcome);
    }

    /// Queue a completed run with the given exit code and output
    pub fn push_output(&self, status: i32, stdout: &str, stderr: &str) {
        self.push(RunOutcome::Completed(Output {
            status: Some(status),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }));
    }

    /// Every launch seen so far, oldest first
    pub fn launches(&self) -> Vec<Launch> {
        self.launches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ToolRunner for MockRunner {
    async fn run(&self, launch: &Launch, _cancel: &CancellationToken) -> Result<RunOutcome> {
        self.launches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(launch.clone());

        let mut responses = self
            .responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if responses.is_empty() {
            Ok(RunOutcome::Completed(Output {
                status: Some(0),
                ..Output::default()
            }))
        } else {
            Ok(responses.remove(0))
        }
    }
}
