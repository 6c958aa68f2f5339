//! pclusterctl CLI - provision and tear down ephemeral AWS ParallelCluster environments
//!
//! Wraps the `pcluster` command line:
//! - Dry-run validation and creation of clusters (`cluster validate`, `cluster create`)
//! - Teardown and inspection (`cluster delete`, `cluster describe`, `cluster list`)
//! - Config file management (`config` subcommand)
//! - Environment diagnostics (`doctor`)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pclusterctl_core::{CtlConfig, ToolEnv};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

mod commands;
mod config;
mod tracing_setup;
mod ui;

use commands::RunContext;

#[derive(Parser, Debug)]
#[command(
    name = "pclusterctl",
    author,
    version,
    about = "Provision and tear down ephemeral AWS ParallelCluster environments",
    long_about = "Thin, predictable wrapper around the pcluster CLI. Every call runs pcluster once, \
                  captures its output, and reports success by a fixed rule: dry runs must return \
                  the exact pcluster success message, everything else must exit 0."
)]
struct Cli {
    /// Suppress spinners (for script consumption)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Debug logging to stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate, create, delete and inspect clusters
    Cluster(commands::cluster::ClusterArgs),
    /// Manage pclusterctl configuration (init, get, list, validate, path)
    Config(config::ConfigArgs),
    /// Check that pcluster is installed and settings resolve
    Doctor(commands::doctor::DoctorArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Cancel in-flight pcluster calls on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping pcluster");
            trigger.cancel();
        }
    });
    cancel
}

fn run_context(json: bool) -> Result<RunContext> {
    let config = CtlConfig::load().context("failed to load configuration")?;
    let env = ToolEnv::from_process();
    debug!(vars = env.len(), binary = %config.pcluster.binary, "context ready");

    Ok(RunContext {
        config,
        env,
        json,
        cancel: cancel_on_ctrl_c(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();
    ui::init_quiet_mode(cli.quiet || cli.json);

    match cli.command {
        Commands::Cluster(args) => {
            let ctx = run_context(cli.json)?;
            commands::run_cluster(args, &ctx).await?
        }
        Commands::Config(args) => config::run_config(args)?,
        Commands::Doctor(args) => {
            let ctx = run_context(cli.json)?;
            commands::run_doctor(args, &ctx).await?
        }
        Commands::Completions(args) => run_completions(args)?,
    }
    Ok(())
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
