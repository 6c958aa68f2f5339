//! Environment diagnostics
//!
//! Checks that pcluster can be found and answers, and shows which region,
//! profile and stop-after-validation setting a cluster command would use.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use pclusterctl_core::env::{PROFILE_VAR, STOP_AFTER_VALIDATION_VAR};
use pclusterctl_core::{within_contract, Pcluster, ToolEnv, PCLUSTER_CONTRACT};
use tracing::debug;

use super::RunContext;

#[derive(Parser, Debug)]
pub struct DoctorArgs {
    /// Skip running `pcluster version`
    #[arg(long)]
    pub offline: bool,
}

/// Locate `binary` using the PATH the child would see
fn locate(binary: &str, env: &ToolEnv) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    which::which_in(binary, env.get_os("PATH"), cwd).ok()
}

pub async fn run_doctor(args: DoctorArgs, ctx: &RunContext) -> Result<()> {
    let mut problems = 0usize;
    let binary = &ctx.config.pcluster.binary;

    println!("🔍 Checking pclusterctl environment...");

    match locate(binary, &ctx.env) {
        Some(path) => println!("   ✓ {} found at {}", binary, path.display()),
        None => {
            problems += 1;
            println!("   ✗ {} not found on PATH", binary);
            println!("     Install AWS ParallelCluster: pip install aws-parallelcluster");
        }
    }

    if !args.offline && problems == 0 {
        let pcluster = Pcluster::from_config(&ctx.config, ctx.env.clone());
        let result = pcluster
            .version(ctx.config.pcluster.profile.as_deref(), &ctx.cancel)
            .await?;
        debug!(exit_code = result.exit_code, "pcluster version");

        if result.success {
            let version =
                Pcluster::reported_version(&result).unwrap_or_else(|| result.stdout.clone());
            println!("   ✓ pcluster version {}", version);
            if !within_contract(&version) {
                println!(
                    "   ⚠ dry-run success message is written for pcluster {}; check pcluster.dry_run_message",
                    PCLUSTER_CONTRACT
                );
            }
        } else {
            problems += 1;
            println!("   ✗ pcluster version failed: {}", result.failure_reason());
        }
    }

    match &ctx.config.pcluster.region {
        Some(region) => println!("   ✓ default region: {}", region),
        None => println!("   ⚠ no default region; pass --region or set PCLUSTERCTL_REGION"),
    }

    match (&ctx.config.pcluster.profile, ctx.env.get(PROFILE_VAR)) {
        (Some(profile), _) => println!("   ✓ profile (config): {}", profile),
        (None, Some(profile)) => println!("   ✓ profile ({}): {}", PROFILE_VAR, profile),
        (None, None) => println!("   ⚠ no profile; AWS default credential chain applies"),
    }

    match ctx.config.pcluster.timeout_secs {
        Some(secs) => println!("   ✓ timeout: {}s", secs),
        None => println!("   ⚠ no timeout configured"),
    }

    if pclusterctl_core::should_stop_after_validation(&ctx.env) {
        println!("   ⚠ {}=1: create will stop after the dry run", STOP_AFTER_VALIDATION_VAR);
    }

    if problems > 0 {
        return Err(anyhow!("{} problem(s) found", problems));
    }

    println!("\n✅ Ready");
    Ok(())
}
