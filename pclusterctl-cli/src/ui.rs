//! Terminal output helpers for pclusterctl
//!
//! # Quiet Mode
//!
//! Spinners are suppressed when:
//! - `--quiet` flag is passed
//! - `PCLUSTERCTL_QUIET=1` environment variable is set
//! - stderr is not a TTY (piped output)

use std::io::IsTerminal;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pclusterctl_core::{InvocationResult, Termination};
use serde_json::Value;

/// Global quiet mode state
static QUIET_MODE: OnceLock<bool> = OnceLock::new();

/// Initialize quiet mode from flags and environment
///
/// Call this once at startup with the --quiet flag value.
pub fn init_quiet_mode(quiet_flag: bool) {
    let is_quiet = quiet_flag
        || std::env::var("PCLUSTERCTL_QUIET").map(|v| v == "1").unwrap_or(false)
        || !std::io::stderr().is_terminal();

    QUIET_MODE.set(is_quiet).ok();
}

pub fn is_quiet() -> bool {
    *QUIET_MODE.get().unwrap_or(&false)
}

fn message_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Create a spinner that respects quiet mode
pub fn spinner(msg: impl Into<String>) -> Option<ProgressBar> {
    if is_quiet() {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

/// Clear the spinner line, leaving room for the result summary
pub fn finish(pb: Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.set_style(message_style());
        pb.finish_and_clear();
    }
}

/// Run a future with a spinner; the spinner is cleared either way
pub async fn with_spinner<T>(
    msg: impl Into<String>,
    f: impl std::future::Future<Output = T>,
) -> T {
    let pb = spinner(msg);
    let out = f.await;
    finish(pb);
    out
}

/// Pretty JSON for `--json` mode
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

fn termination_note(result: &InvocationResult) -> Option<String> {
    match result.termination {
        Termination::Exited => None,
        Termination::ToolMissing => Some(format!(
            "{} is not installed or not on PATH (exit {})",
            result.program(),
            result.exit_code
        )),
        Termination::TimedOut { after_ms } => {
            Some(format!("timed out after {:.1}s", after_ms as f64 / 1000.0))
        }
        Termination::Cancelled => Some("cancelled".to_string()),
    }
}

/// Human summary of one invocation
pub fn print_result(label: &str, result: &InvocationResult) {
    let mark = if result.success { "✓" } else { "✗" };
    println!("{} {} (exit {}, {}ms)", mark, label, result.exit_code, result.elapsed_ms);
    println!("   command: {}", result.command.join(" "));

    if let Some(note) = termination_note(result) {
        println!("   {}", note);
    }
    if !result.status_message.is_empty() {
        println!("   message: {}", result.status_message);
    }
    if !result.success && !result.stderr.is_empty() {
        for line in result.stderr.lines() {
            eprintln!("   stderr: {}", line);
        }
    }
}

/// Print a parsed body field by field, falling back to raw stdout
pub fn print_body(result: &InvocationResult) {
    match result.body.object() {
        Some(map) => {
            for (key, value) in map {
                match value {
                    Value::String(s) => println!("   {}: {}", key, s),
                    other => println!("   {}: {}", key, other),
                }
            }
        }
        None if !result.stdout.is_empty() => println!("{}", result.stdout),
        None => {}
    }
}
