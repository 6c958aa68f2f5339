//! Core library for pclusterctl: running the AWS ParallelCluster CLI and
//! classifying what it returned.

pub mod config;
pub mod env;
pub mod error;
pub mod invoker;
pub mod pcluster;
pub mod policy;

pub use config::CtlConfig;
pub use env::{should_stop_after_validation, ToolEnv};
pub use error::{CtlError, Result};
pub use invoker::{
    CallEnv, InvocationResult, ParsedBody, ProcessRunner, Termination, ToolInvoker, ToolRunner,
};
pub use pcluster::{ClusterRef, ClusterRequest, Pcluster, ProvisionOptions, Provisioned};
pub use policy::{
    within_contract, DryRunAccepted, ExitCodeZero, SuccessPolicy, DRY_RUN_SUCCESS_MESSAGE,
    PCLUSTER_CONTRACT,
};
