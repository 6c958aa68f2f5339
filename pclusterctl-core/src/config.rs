use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::policy::DRY_RUN_SUCCESS_MESSAGE;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_VAR: &str = "PCLUSTERCTL_CONFIG";

/// Configuration for pclusterctl, read from ~/.pclusterctl/config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CtlConfig {
    pub pcluster: PclusterConfig,

    /// Extra variables handed to every pcluster invocation.
    /// Applied after the credential profile, so they win over it.
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PclusterConfig {
    /// Executable name or path
    pub binary: String,
    pub region: Option<String>,
    pub profile: Option<String>,
    /// Kill pcluster after this many seconds; unset waits forever
    pub timeout_secs: Option<u64>,
    /// Message `create-cluster --dryrun true` returns on success
    pub dry_run_message: String,
}

impl Default for PclusterConfig {
    fn default() -> Self {
        Self {
            binary: "pcluster".to_string(),
            region: None,
            profile: None,
            timeout_secs: None,
            dry_run_message: DRY_RUN_SUCCESS_MESSAGE.to_string(),
        }
    }
}

impl PclusterConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl CtlConfig {
    /// Load config from the default location.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file (invalid TOML): {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Config file path: $PCLUSTERCTL_CONFIG or ~/.pclusterctl/config.toml
    pub fn config_path() -> PathBuf {
        if let Some(path) = env::var_os(CONFIG_PATH_VAR).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pclusterctl/config.toml")
    }

    /// Reject values that would make every invocation fail
    pub fn validate(&self) -> Result<()> {
        if self.pcluster.binary.trim().is_empty() {
            anyhow::bail!("pcluster.binary must not be empty");
        }
        if self.pcluster.dry_run_message.is_empty() {
            anyhow::bail!("pcluster.dry_run_message must not be empty");
        }
        if self.pcluster.timeout_secs == Some(0) {
            anyhow::bail!("pcluster.timeout_secs must be greater than zero");
        }
        if let Some(key) = self.env.keys().find(|k| k.is_empty() || k.contains('=')) {
            anyhow::bail!("invalid variable name in [env]: {:?}", key);
        }
        Ok(())
    }

    /// Look up a value by dot-notation key (e.g. "pcluster.region")
    pub fn get(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.splitn(2, '.').collect();

        match (parts.first(), parts.get(1)) {
            (Some(&"pcluster"), Some(&"binary")) => Ok(self.pcluster.binary.clone()),
            (Some(&"pcluster"), Some(&"region")) => self
                .pcluster
                .region
                .clone()
                .ok_or_else(|| anyhow::anyhow!("pcluster.region not set")),
            (Some(&"pcluster"), Some(&"profile")) => self
                .pcluster
                .profile
                .clone()
                .ok_or_else(|| anyhow::anyhow!("pcluster.profile not set")),
            (Some(&"pcluster"), Some(&"timeout_secs")) => self
                .pcluster
                .timeout_secs
                .map(|s| s.to_string())
                .ok_or_else(|| anyhow::anyhow!("pcluster.timeout_secs not set")),
            (Some(&"pcluster"), Some(&"dry_run_message")) => Ok(self.pcluster.dry_run_message.clone()),
            (Some(&"env"), Some(var)) => self
                .env
                .get(*var)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("env.{} not set", var)),
            _ => Err(anyhow::anyhow!("Unknown config key: {}", key)),
        }
    }
}

/// Starter config written by `pclusterctl config init`
pub const CONFIG_TEMPLATE: &str = r#"# pclusterctl configuration

[pcluster]
# Executable name or absolute path
binary = "pcluster"
# Default region and credential profile (flags and PCLUSTERCTL_* env vars win)
# region = "us-west-2"
# profile = "default"
# Kill pcluster after this many seconds (unset: wait indefinitely)
# timeout_secs = 3600
# Exact message a successful dry run returns (pcluster 3.x wording)
dry_run_message = "Request would have succeeded, but DryRun flag is set."

# Extra environment for every pcluster invocation; overrides the profile
[env]
# AWS_RETRY_MODE = "standard"
"#;
