//! AWS ParallelCluster (`pcluster` 3.x) operations built on [`ToolInvoker`]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::CtlConfig;
use crate::env::{should_stop_after_validation, ToolEnv};
use crate::error::{CtlError, Result};
use crate::invoker::{CallEnv, InvocationResult, ToolInvoker};
use crate::policy::{DryRunAccepted, ExitCodeZero, SuccessPolicy};

/// Inputs for `create-cluster`, dry run or real
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRequest {
    pub name: String,
    pub config_path: PathBuf,
    pub region: String,
    pub profile: Option<String>,
}

/// An existing cluster addressed by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    pub name: String,
    pub region: String,
    pub profile: Option<String>,
}

impl ClusterRequest {
    pub fn cluster(&self) -> ClusterRef {
        ClusterRef {
            name: self.name.clone(),
            region: self.region.clone(),
            profile: self.profile.clone(),
        }
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CtlError::invalid_request(format!("{what} must not be empty")));
    }
    Ok(())
}

/// `create-cluster -n <name> -c <config> [--dryrun true] --region <region>`
pub fn create_cluster_args(req: &ClusterRequest, dry_run: bool) -> Vec<String> {
    let mut args = vec![
        "create-cluster".to_string(),
        "-n".to_string(),
        req.name.clone(),
        "-c".to_string(),
        req.config_path.display().to_string(),
    ];
    if dry_run {
        args.push("--dryrun".to_string());
        args.push("true".to_string());
    }
    args.push("--region".to_string());
    args.push(req.region.clone());
    args
}

/// `<subcommand> -n <name> --region <region>`
fn named_cluster_args(subcommand: &str, cluster: &ClusterRef) -> Vec<String> {
    vec![
        subcommand.to_string(),
        "-n".to_string(),
        cluster.name.clone(),
        "--region".to_string(),
        cluster.region.clone(),
    ]
}

/// `"clusterStatus"` from a `describe-cluster` result, e.g. `CREATE_COMPLETE`
pub fn cluster_status(result: &InvocationResult) -> Option<String> {
    result.body.text_field("clusterStatus")
}

/// Knobs for [`Pcluster::provision`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisionOptions {
    /// Stop after a successful dry run even if the env flag is unset
    pub validate_only: bool,
    /// Go straight to the real create
    pub skip_validation: bool,
}

/// Where a provisioning run ended
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Provisioned {
    ValidationFailed { validation: InvocationResult },
    StoppedAfterValidation { validation: InvocationResult },
    CreateFailed {
        validation: Option<InvocationResult>,
        create: InvocationResult,
    },
    Created {
        validation: Option<InvocationResult>,
        create: InvocationResult,
    },
}

impl Provisioned {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::StoppedAfterValidation { .. } | Self::Created { .. })
    }
}

/// Wrapper around the `pcluster` CLI
#[derive(Clone)]
pub struct Pcluster {
    invoker: ToolInvoker,
    dry_run_policy: Arc<dyn SuccessPolicy>,
    extra_env: BTreeMap<String, String>,
}

impl Pcluster {
    pub fn new(invoker: ToolInvoker) -> Self {
        Self {
            invoker,
            dry_run_policy: Arc::new(DryRunAccepted::default()),
            extra_env: BTreeMap::new(),
        }
    }

    /// Build from loaded config and a captured process environment
    pub fn from_config(config: &CtlConfig, env: ToolEnv) -> Self {
        let invoker = ToolInvoker::new(config.pcluster.binary.clone(), env)
            .with_deadline(config.pcluster.timeout());
        Self::new(invoker)
            .with_dry_run_policy(Arc::new(DryRunAccepted::new(
                config.pcluster.dry_run_message.clone(),
            )))
            .with_extra_env(config.env.clone())
    }

    pub fn with_dry_run_policy(mut self, policy: Arc<dyn SuccessPolicy>) -> Self {
        self.dry_run_policy = policy;
        self
    }

    /// Kill pcluster after `deadline` instead of the configured timeout
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.invoker = self.invoker.with_deadline(deadline);
        self
    }

    /// Variables applied on top of the profile for every call
    pub fn with_extra_env(mut self, extra_env: BTreeMap<String, String>) -> Self {
        self.extra_env = extra_env;
        self
    }

    fn call_env<'a>(&'a self, profile: Option<&'a str>) -> CallEnv<'a> {
        let call = CallEnv::profile(profile);
        if self.extra_env.is_empty() {
            call
        } else {
            call.with_extra(&self.extra_env)
        }
    }

    async fn run(
        &self,
        args: Vec<String>,
        profile: Option<&str>,
        policy: &dyn SuccessPolicy,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult> {
        let result = self
            .invoker
            .invoke(args, self.call_env(profile), cancel)
            .await?
            .judged_by(policy);

        if !result.success {
            warn!(
                exit_code = result.exit_code,
                reason = result.failure_reason(),
                "pcluster reported failure"
            );
        }
        Ok(result)
    }

    /// Dry-run `create-cluster`; success only on the exact dry-run message
    #[instrument(skip_all, fields(cluster = %req.name, region = %req.region))]
    pub async fn validate_dry_run(
        &self,
        req: &ClusterRequest,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult> {
        require(&req.name, "cluster name")?;
        require(&req.region, "region")?;
        info!("validating cluster configuration (dry run)");

        let args = create_cluster_args(req, true);
        self.run(args, req.profile.as_deref(), self.dry_run_policy.as_ref(), cancel)
            .await
    }

    /// Real `create-cluster`; success on exit code 0
    #[instrument(skip_all, fields(cluster = %req.name, region = %req.region))]
    pub async fn create_real(
        &self,
        req: &ClusterRequest,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult> {
        require(&req.name, "cluster name")?;
        require(&req.region, "region")?;
        info!("creating cluster");

        let args = create_cluster_args(req, false);
        self.run(args, req.profile.as_deref(), &ExitCodeZero, cancel)
            .await
    }

    #[instrument(skip_all, fields(cluster = %cluster.name, region = %cluster.region))]
    pub async fn delete(
        &self,
        cluster: &ClusterRef,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult> {
        require(&cluster.name, "cluster name")?;
        require(&cluster.region, "region")?;
        info!("deleting cluster");

        let args = named_cluster_args("delete-cluster", cluster);
        self.run(args, cluster.profile.as_deref(), &ExitCodeZero, cancel)
            .await
    }

    #[instrument(skip_all, fields(cluster = %cluster.name, region = %cluster.region))]
    pub async fn describe(
        &self,
        cluster: &ClusterRef,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult> {
        require(&cluster.name, "cluster name")?;
        require(&cluster.region, "region")?;

        let args = named_cluster_args("describe-cluster", cluster);
        self.run(args, cluster.profile.as_deref(), &ExitCodeZero, cancel)
            .await
    }

    #[instrument(skip_all, fields(region = %region))]
    pub async fn list(
        &self,
        region: &str,
        profile: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult> {
        require(region, "region")?;

        let args = vec!["list-clusters".to_string(), "--region".to_string(), region.to_string()];
        self.run(args, profile, &ExitCodeZero, cancel).await
    }

    /// `pcluster version`, with the same profile and extra env as cluster calls
    #[instrument(skip_all)]
    pub async fn version(
        &self,
        profile: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult> {
        self.run(vec!["version".to_string()], profile, &ExitCodeZero, cancel)
            .await
    }

    /// `"version"` from a `pcluster version` result
    pub fn reported_version(result: &InvocationResult) -> Option<String> {
        result.body.text_field("version")
    }

    /// True when the operator asked to halt after a successful dry run
    pub fn should_stop_after_validation(&self) -> bool {
        should_stop_after_validation(self.invoker.base_env())
    }

    /// Dry run, then (unless told to stop) the real create
    pub async fn provision(
        &self,
        req: &ClusterRequest,
        options: ProvisionOptions,
        cancel: &CancellationToken,
    ) -> Result<Provisioned> {
        let validation = if options.skip_validation {
            info!(cluster = %req.name, "skipping dry-run validation");
            None
        } else {
            let validation = self.validate_dry_run(req, cancel).await?;
            if !validation.success {
                return Ok(Provisioned::ValidationFailed { validation });
            }
            if options.validate_only || self.should_stop_after_validation() {
                info!(cluster = %req.name, "stopping after validation");
                return Ok(Provisioned::StoppedAfterValidation { validation });
            }
            Some(validation)
        };

        let create = self.create_real(req, cancel).await?;
        if create.success {
            Ok(Provisioned::Created { validation, create })
        } else {
            Ok(Provisioned::CreateFailed { validation, create })
        }
    }
}
