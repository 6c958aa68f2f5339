//! External tool invoker
//!
//! Runs one named tool per call and turns whatever happened into an
//! [`InvocationResult`]. A missing executable, a non-zero exit and stdout that
//! is not JSON all come back as data; the invoker passes no judgment on
//! success. Callers apply a [`SuccessPolicy`](crate::policy::SuccessPolicy).

mod result;
mod runner;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::env::ToolEnv;
use crate::error::Result;

pub use result::{InvocationResult, ParsedBody, Termination, EXIT_NO_STATUS, EXIT_TOOL_MISSING};
pub use runner::{Launch, MockRunner, Output, ProcessRunner, RunOutcome, ToolRunner};

/// Per-call overlays on top of the invoker's base environment
#[derive(Debug, Clone, Default)]
pub struct CallEnv<'a> {
    /// Value for `AWS_PROFILE`
    pub profile: Option<&'a str>,
    /// Applied after the profile, so these can override it
    pub extra: Option<&'a BTreeMap<String, String>>,
}

impl<'a> CallEnv<'a> {
    pub fn profile(profile: Option<&'a str>) -> Self {
        Self {
            profile,
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: &'a BTreeMap<String, String>) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// Invokes one external executable
#[derive(Clone)]
pub struct ToolInvoker {
    program: String,
    base_env: ToolEnv,
    deadline: Option<Duration>,
    runner: Arc<dyn ToolRunner>,
}

impl std::fmt::Debug for ToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvoker")
            .field("program", &self.program)
            .field("base_env_vars", &self.base_env.len())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl ToolInvoker {
    /// Invoker backed by real child processes
    pub fn new(program: impl Into<String>, base_env: ToolEnv) -> Self {
        Self::with_runner(program, base_env, Arc::new(ProcessRunner))
    }

    pub fn with_runner(
        program: impl Into<String>,
        base_env: ToolEnv,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        Self {
            program: program.into(),
            base_env,
            deadline: None,
            runner,
        }
    }

    /// Kill the child and report [`Termination::TimedOut`] after `deadline`
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn base_env(&self) -> &ToolEnv {
        &self.base_env
    }

    /// Environment a child would see for this call
    pub fn child_env(&self, call: &CallEnv<'_>) -> ToolEnv {
        let env = self.base_env.with_profile(call.profile);
        match call.extra {
            Some(extra) => env.with_overrides(extra),
            None => env,
        }
    }

    /// Run the tool with `args` and wait for it to finish.
    ///
    /// Returns `Err` only when the child could not be launched for a reason
    /// other than the executable being absent.
    #[instrument(skip_all, fields(program = %self.program, subcommand = args.first().map(String::as_str).unwrap_or("")))]
    pub async fn invoke(
        &self,
        args: Vec<String>,
        call: CallEnv<'_>,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult> {
        let env = self.child_env(&call);
        let mut command = Vec::with_capacity(args.len() + 1);
        command.push(self.program.clone());
        command.extend(args.iter().cloned());

        debug!(
            argv = ?command,
            profile = call.profile.unwrap_or("<inherited>"),
            extra_vars = ?call.extra.map(|m| m.keys().collect::<Vec<_>>()),
            "invoking tool"
        );

        let launch = Launch {
            program: self.program.clone(),
            args,
            env,
            deadline: self.deadline,
        };

        let started = Instant::now();
        let outcome = self.runner.run(&launch, cancel).await?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match outcome {
            RunOutcome::Completed(output) => InvocationResult::exited(
                command,
                output.status.unwrap_or(EXIT_NO_STATUS),
                &output.stdout,
                &output.stderr,
            ),
            RunOutcome::NotFound => {
                warn!(program = %self.program, "tool not found on PATH");
                InvocationResult::tool_missing(command)
            }
            RunOutcome::TimedOut(after) => {
                warn!(program = %self.program, after_ms = after.as_millis() as u64, "tool timed out");
                InvocationResult::timed_out(command, after.as_millis() as u64)
            }
            RunOutcome::Cancelled => {
                warn!(program = %self.program, "tool invocation cancelled");
                InvocationResult::cancelled(command)
            }
        };

        debug!(
            exit_code = result.exit_code,
            termination = ?result.termination,
            parsed = result.body.is_parsed(),
            elapsed_ms,
            "tool finished"
        );

        Ok(result.with_elapsed_ms(elapsed_ms))
    }
}
