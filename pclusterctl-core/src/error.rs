//! Structured error types for pclusterctl-core.
//!
//! Expected tool failures (missing executable, non-zero exit, unparseable
//! output) are never errors: they are carried as data in
//! [`InvocationResult`](crate::InvocationResult). Only conditions the caller
//! cannot branch on surface through this type.

use std::io;
use thiserror::Error;

/// Main error type for pclusterctl-core operations
#[derive(Error, Debug)]
pub enum CtlError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// The child process could not be launched for a reason other than
    /// the executable being absent
    #[error("failed to launch {program}: {source}")]
    Spawn { program: String, source: io::Error },

    /// Request rejected before any process was spawned
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
}

/// Result type alias for pclusterctl-core operations
pub type Result<T> = std::result::Result<T, CtlError>;

impl CtlError {
    /// Create a spawn error for the given program
    pub fn spawn(program: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}
