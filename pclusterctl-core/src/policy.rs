//! Success policies applied by callers to an [`InvocationResult`].
//!
//! The invoker never decides success on its own. Each operation picks one
//! of these predicates, so changing how a tool's answer is read touches only
//! this module.

use crate::invoker::InvocationResult;

/// `pcluster` release line whose dry-run wording [`DRY_RUN_SUCCESS_MESSAGE`] matches
pub const PCLUSTER_CONTRACT: &str = "3.x";

/// The `"message"` a successful `pcluster create-cluster --dryrun true` returns
pub const DRY_RUN_SUCCESS_MESSAGE: &str = "Request would have succeeded, but DryRun flag is set.";

/// True when `version` (e.g. `3.9.1`) is on the [`PCLUSTER_CONTRACT`] release line
pub fn within_contract(version: &str) -> bool {
    let major = PCLUSTER_CONTRACT.trim_end_matches(".x");
    version.trim().trim_start_matches('v').split('.').next() == Some(major)
}

/// Decides whether an invocation counts as a success
pub trait SuccessPolicy: Send + Sync {
    fn accepts(&self, result: &InvocationResult) -> bool;
}

/// Status message must equal `expected` byte for byte.
///
/// No prefix, substring or case folding: a reworded success message from a
/// newer tool is a failure until `expected` is updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunAccepted {
    pub expected: String,
}

impl DryRunAccepted {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Default for DryRunAccepted {
    fn default() -> Self {
        Self::new(DRY_RUN_SUCCESS_MESSAGE)
    }
}

impl SuccessPolicy for DryRunAccepted {
    fn accepts(&self, result: &InvocationResult) -> bool {
        result.status_message == self.expected
    }
}

/// Exit code must be exactly zero; stdout is ignored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitCodeZero;

impl SuccessPolicy for ExitCodeZero {
    fn accepts(&self, result: &InvocationResult) -> bool {
        result.exit_code == 0
    }
}
