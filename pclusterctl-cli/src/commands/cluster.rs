//! Cluster lifecycle commands
//!
//! Commands: validate, create, delete, describe, list

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pclusterctl_core::pcluster::cluster_status;
use pclusterctl_core::{
    ClusterRef, ClusterRequest, InvocationResult, Pcluster, ProvisionOptions, Provisioned,
};
use tracing::info;

use super::RunContext;
use crate::ui;

#[derive(Parser, Debug)]
pub struct ClusterArgs {
    #[command(subcommand)]
    pub command: ClusterCommands,
}

#[derive(Subcommand, Debug)]
pub enum ClusterCommands {
    /// Validate a cluster config with a pcluster dry run
    Validate(CreateArgs),
    /// Dry-run, then create the cluster
    Create(CreateCommandArgs),
    /// Delete a cluster
    Delete(NamedArgs),
    /// Show a cluster's status
    Describe(NamedArgs),
    /// List clusters in a region
    List(TargetArgs),
}

/// Region, profile and timeout shared by every cluster command
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// AWS region (defaults to pcluster.region in config)
    #[arg(long, env = "PCLUSTERCTL_REGION")]
    pub region: Option<String>,

    /// AWS credential profile, exported to pcluster as AWS_PROFILE
    #[arg(long, env = "PCLUSTERCTL_PROFILE")]
    pub profile: Option<String>,

    /// Kill pcluster after this many seconds (overrides pcluster.timeout_secs)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Cluster name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Path to the cluster configuration YAML
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: PathBuf,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct CreateCommandArgs {
    #[command(flatten)]
    pub create: CreateArgs,

    /// Stop after a successful dry run (same as PCLUSTER_STOP_AFTER_VALIDATION=1)
    #[arg(long, conflicts_with = "skip_validation")]
    pub validate_only: bool,

    /// Create without running the dry run first
    #[arg(long)]
    pub skip_validation: bool,
}

#[derive(Args, Debug)]
pub struct NamedArgs {
    /// Cluster name
    #[arg(long, short = 'n')]
    pub name: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Region and profile after applying flag > env > config precedence
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    region: String,
    profile: Option<String>,
}

fn resolve_target(ctx: &RunContext, args: &TargetArgs) -> Result<Target> {
    let region = args
        .region
        .clone()
        .or_else(|| ctx.config.pcluster.region.clone())
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| {
            anyhow!(
                "No region given\n   Pass --region, set PCLUSTERCTL_REGION, or set pcluster.region in {}",
                pclusterctl_core::CtlConfig::config_path().display()
            )
        })?;
    let profile = args
        .profile
        .clone()
        .or_else(|| ctx.config.pcluster.profile.clone());

    Ok(Target { region, profile })
}

fn pcluster_for(ctx: &RunContext, args: &TargetArgs) -> Result<Pcluster> {
    if args.timeout == Some(0) {
        bail!("--timeout must be greater than zero");
    }
    let pcluster = Pcluster::from_config(&ctx.config, ctx.env.clone());
    Ok(match args.timeout {
        Some(secs) => pcluster.with_deadline(Some(Duration::from_secs(secs))),
        None => pcluster,
    })
}

fn cluster_request(ctx: &RunContext, args: &CreateArgs) -> Result<ClusterRequest> {
    if !args.config.exists() {
        bail!("Cluster config not found: {}", args.config.display());
    }
    let target = resolve_target(ctx, &args.target)?;
    Ok(ClusterRequest {
        name: args.name.clone(),
        config_path: args.config.clone(),
        region: target.region,
        profile: target.profile,
    })
}

fn cluster_ref(ctx: &RunContext, args: &NamedArgs) -> Result<ClusterRef> {
    let target = resolve_target(ctx, &args.target)?;
    Ok(ClusterRef {
        name: args.name.clone(),
        region: target.region,
        profile: target.profile,
    })
}

/// Print a single result and turn failure into an error
fn report(ctx: &RunContext, label: &str, result: &InvocationResult) -> Result<()> {
    if ctx.json {
        ui::print_json(result)?;
    } else {
        ui::print_result(label, result);
    }

    if result.success {
        Ok(())
    } else {
        Err(anyhow!("{} failed: {}", label, result.failure_reason()))
    }
}

// === Command Implementations ===

pub async fn run_cluster(args: ClusterArgs, ctx: &RunContext) -> Result<()> {
    match args.command {
        ClusterCommands::Validate(args) => run_validate(args, ctx).await,
        ClusterCommands::Create(args) => run_create(args, ctx).await,
        ClusterCommands::Delete(args) => run_delete(args, ctx).await,
        ClusterCommands::Describe(args) => run_describe(args, ctx).await,
        ClusterCommands::List(args) => run_list(args, ctx).await,
    }
}

async fn run_validate(args: CreateArgs, ctx: &RunContext) -> Result<()> {
    let pcluster = pcluster_for(ctx, &args.target)?;
    let req = cluster_request(ctx, &args)?;

    let result = ui::with_spinner(
        format!("Validating {} in {}", req.name, req.region),
        pcluster.validate_dry_run(&req, &ctx.cancel),
    )
    .await
    .context("dry run could not be started")?;

    report(ctx, "dry run", &result)
}

async fn run_create(args: CreateCommandArgs, ctx: &RunContext) -> Result<()> {
    let pcluster = pcluster_for(ctx, &args.create.target)?;
    let req = cluster_request(ctx, &args.create)?;
    let options = ProvisionOptions {
        validate_only: args.validate_only,
        skip_validation: args.skip_validation,
    };

    let outcome = ui::with_spinner(
        format!("Provisioning {} in {}", req.name, req.region),
        pcluster.provision(&req, options, &ctx.cancel),
    )
    .await
    .context("cluster creation could not be started")?;

    if ctx.json {
        ui::print_json(&outcome)?;
    } else {
        match &outcome {
            Provisioned::ValidationFailed { validation } => ui::print_result("dry run", validation),
            Provisioned::StoppedAfterValidation { validation } => {
                ui::print_result("dry run", validation);
                println!("   stopping after validation; cluster not created");
            }
            Provisioned::CreateFailed { validation, create }
            | Provisioned::Created { validation, create } => {
                if let Some(validation) = validation {
                    ui::print_result("dry run", validation);
                }
                ui::print_result("create", create);
                ui::print_body(create);
            }
        }
    }

    match outcome {
        Provisioned::ValidationFailed { validation } => Err(anyhow!(
            "dry run failed: {}",
            validation.failure_reason()
        )),
        Provisioned::CreateFailed { create, .. } => {
            Err(anyhow!("create failed: {}", create.failure_reason()))
        }
        Provisioned::StoppedAfterValidation { .. } | Provisioned::Created { .. } => {
            info!(cluster = %req.name, "provisioning finished");
            Ok(())
        }
    }
}

async fn run_delete(args: NamedArgs, ctx: &RunContext) -> Result<()> {
    let pcluster = pcluster_for(ctx, &args.target)?;
    let cluster = cluster_ref(ctx, &args)?;

    let result = ui::with_spinner(
        format!("Deleting {} in {}", cluster.name, cluster.region),
        pcluster.delete(&cluster, &ctx.cancel),
    )
    .await
    .context("delete could not be started")?;

    report(ctx, "delete", &result)
}

async fn run_describe(args: NamedArgs, ctx: &RunContext) -> Result<()> {
    let pcluster = pcluster_for(ctx, &args.target)?;
    let cluster = cluster_ref(ctx, &args)?;

    let result = pcluster
        .describe(&cluster, &ctx.cancel)
        .await
        .context("describe could not be started")?;

    if !ctx.json && result.success {
        let status = cluster_status(&result).unwrap_or_else(|| "UNKNOWN".to_string());
        println!("{} ({}): {}", cluster.name, cluster.region, status);
        ui::print_body(&result);
        return Ok(());
    }
    report(ctx, "describe", &result)
}

async fn run_list(args: TargetArgs, ctx: &RunContext) -> Result<()> {
    let pcluster = pcluster_for(ctx, &args)?;
    let target = resolve_target(ctx, &args)?;

    let result = pcluster
        .list(&target.region, target.profile.as_deref(), &ctx.cancel)
        .await
        .context("list could not be started")?;

    if !ctx.json && result.success {
        ui::print_body(&result);
        return Ok(());
    }
    report(ctx, "list", &result)
}
