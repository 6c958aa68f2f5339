use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pclusterctl_core::config::CONFIG_TEMPLATE;
use pclusterctl_core::CtlConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a starter config file
    Init(InitArgs),
    /// Get a config value by dot-notation key
    Get(GetArgs),
    /// Print the effective config as TOML
    List,
    /// Check that the config file parses and is usable
    Validate,
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Dot-notation key (e.g., "pcluster.region", "env.AWS_RETRY_MODE")
    pub key: String,
}

pub fn run_config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init(args) => run_init(args),
        ConfigCommands::Get(args) => run_get(args),
        ConfigCommands::List => run_list(),
        ConfigCommands::Validate => run_validate(),
        ConfigCommands::Path => run_path(),
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    let config_path = CtlConfig::config_path();

    if config_path.exists() && !args.force {
        return Err(anyhow::anyhow!(
            "Config already exists at {}\n\nUse --force to overwrite",
            config_path.display()
        ));
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    std::fs::write(&config_path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    println!("✅ Created config at: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Edit the config: $EDITOR {}", config_path.display());
    println!("  2. Set pcluster.region and pcluster.profile");
    println!("  3. Run: pclusterctl doctor");

    Ok(())
}

fn run_get(args: GetArgs) -> Result<()> {
    let config = CtlConfig::load()?;
    println!("{}", config.get(&args.key)?);
    Ok(())
}

fn run_list() -> Result<()> {
    let config = CtlConfig::load()?;
    let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config to TOML")?;
    println!("{}", toml_str);
    Ok(())
}

fn run_validate() -> Result<()> {
    let path = CtlConfig::config_path();
    println!("🔍 Validating {}", path.display());

    if !path.exists() {
        println!("   ⚠ No config file; built-in defaults apply");
    }

    let config = CtlConfig::load()?;
    println!("   ✓ Config loaded successfully");
    println!("   binary: {}", config.pcluster.binary);

    match &config.pcluster.region {
        Some(region) => println!("   ✓ region: {}", region),
        None => println!("   ⚠ pcluster.region not set; pass --region on every call"),
    }
    match config.pcluster.timeout_secs {
        Some(secs) => println!("   ✓ timeout: {}s", secs),
        None => println!("   ⚠ no timeout; a hung pcluster blocks indefinitely"),
    }
    if !config.env.is_empty() {
        let keys: Vec<&str> = config.env.keys().map(String::as_str).collect();
        println!("   extra env: {}", keys.join(", "));
    }

    println!("\n✅ Configuration valid!");
    Ok(())
}

fn run_path() -> Result<()> {
    println!("{}", CtlConfig::config_path().display());
    Ok(())
}
