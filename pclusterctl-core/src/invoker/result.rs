//! Normalized outcome of one external tool execution

use serde::Serialize;
use serde_json::{Map, Value};

use crate::policy::SuccessPolicy;

/// Exit code reported when the executable could not be located
pub const EXIT_TOOL_MISSING: i32 = 4;

/// Exit code reported when the child produced none (timeout, cancel)
pub const EXIT_NO_STATUS: i32 = -1;

/// How the child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The child ran and exited on its own (any exit code)
    Exited,
    /// The executable was not found; nothing was run
    ToolMissing,
    /// The deadline passed and the child was killed
    TimedOut { after_ms: u64 },
    /// The caller cancelled and the child was killed
    Cancelled,
}

/// Stdout interpreted as JSON.
///
/// Keeps "no output" apart from "output that is not JSON" so callers can tell
/// a quiet command from a broken one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParsedBody {
    Parsed(Value),
    Empty,
    Unparseable { error: String },
}

impl ParsedBody {
    /// Parse trimmed stdout. Never fails.
    pub fn from_stdout(stdout: &str) -> Self {
        if stdout.is_empty() {
            return Self::Empty;
        }
        match serde_json::from_str::<Value>(stdout) {
            Ok(value) => Self::Parsed(value),
            Err(err) => Self::Unparseable {
                error: err.to_string(),
            },
        }
    }

    /// The decoded JSON object, if stdout was one
    pub fn object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Parsed(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// The decoded object, or an empty mapping for anything else
    pub fn to_map(&self) -> Map<String, Value> {
        self.object().cloned().unwrap_or_default()
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.object().and_then(|map| map.get(key))
    }

    /// Text of a top-level field; non-string values are rendered as JSON
    pub fn text_field(&self, key: &str) -> Option<String> {
        self.field(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

/// Outcome of one invocation. Built once, then only read.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResult {
    /// Full argv, program first
    pub command: Vec<String>,
    pub exit_code: i32,
    pub termination: Termination,
    pub stdout: String,
    pub stderr: String,
    pub body: ParsedBody,
    /// The `"message"` field of the body, empty when absent
    pub status_message: String,
    /// Set by [`InvocationResult::judged_by`]; `false` until then
    pub success: bool,
    pub elapsed_ms: u64,
}

impl InvocationResult {
    /// Result for a child that exited; output is trimmed and parsed here
    pub fn exited(command: Vec<String>, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        let stdout = stdout.trim().to_string();
        let body = ParsedBody::from_stdout(&stdout);
        let status_message = body.text_field("message").unwrap_or_default();

        Self {
            command,
            exit_code,
            termination: Termination::Exited,
            stdout,
            stderr: stderr.trim().to_string(),
            body,
            status_message,
            success: false,
            elapsed_ms: 0,
        }
    }

    pub fn tool_missing(command: Vec<String>) -> Self {
        let program = command.first().cloned().unwrap_or_default();
        Self::unrun(
            command,
            EXIT_TOOL_MISSING,
            Termination::ToolMissing,
            format!("{program} not found on PATH"),
        )
    }

    pub fn timed_out(command: Vec<String>, after_ms: u64) -> Self {
        let program = command.first().cloned().unwrap_or_default();
        Self::unrun(
            command,
            EXIT_NO_STATUS,
            Termination::TimedOut { after_ms },
            format!("{program} timed out after {after_ms}ms and was killed"),
        )
    }

    pub fn cancelled(command: Vec<String>) -> Self {
        let program = command.first().cloned().unwrap_or_default();
        Self::unrun(
            command,
            EXIT_NO_STATUS,
            Termination::Cancelled,
            format!("{program} was cancelled"),
        )
    }

    fn unrun(command: Vec<String>, exit_code: i32, termination: Termination, stderr: String) -> Self {
        Self {
            command,
            exit_code,
            termination,
            stdout: String::new(),
            stderr,
            body: ParsedBody::Empty,
            status_message: String::new(),
            success: false,
            elapsed_ms: 0,
        }
    }

    pub(crate) fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// Apply a caller policy, returning the judged result
    pub fn judged_by(mut self, policy: &dyn SuccessPolicy) -> Self {
        self.success = policy.accepts(&self);
        self
    }

    /// Program name that was (or would have been) executed
    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    /// Argument vector without the program name
    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }

    /// Best human-readable failure reason: status message, then stderr
    pub fn failure_reason(&self) -> &str {
        if !self.status_message.is_empty() {
            &self.status_message
        } else if !self.stderr.is_empty() {
            &self.stderr
        } else {
            "no output"
        }
    }
}
