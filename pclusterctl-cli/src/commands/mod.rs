//! Command implementations for the pclusterctl CLI

pub mod cluster;
pub mod doctor;

use pclusterctl_core::{CtlConfig, ToolEnv};
use tokio_util::sync::CancellationToken;

pub use cluster::run_cluster;
pub use doctor::run_doctor;

/// State shared by every command for one process run
pub struct RunContext {
    pub config: CtlConfig,
    /// Environment captured once at startup; children get overlays of this
    pub env: ToolEnv,
    pub json: bool,
    pub cancel: CancellationToken,
}
