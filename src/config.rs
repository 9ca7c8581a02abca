use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Root configuration structure, deserialized from `.depgate/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub policy: PolicyConfig,
    pub registry: RegistryConfig,
}

/// Where the policy document lives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Policy file (YAML or JSON), relative to the project root unless
    /// absolute. No policy is enforced when unset.
    pub path: Option<PathBuf>,
}

/// Registry lookups used to attach cooling metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Query registries at all. `--offline` turns this off.
    pub online: bool,
    /// Per-lookup deadline.
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    /// Concurrent lookups per batch.
    pub batch_size: usize,
    pub endpoints: Endpoints,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            online: true,
            timeout_secs: 10,
            cache_ttl_secs: 3600,
            batch_size: 75,
            endpoints: Endpoints::default(),
        }
    }
}

/// Base URL overrides (mirrors, proxies, test servers). Unset entries use
/// the public registries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub go_proxy: Option<String>,
    pub npm: Option<String>,
    pub npm_downloads: Option<String>,
    pub pypi: Option<String>,
    pub crates_io: Option<String>,
    pub nuget: Option<String>,
    pub github: Option<String>,
}

impl Config {
    /// Policy path resolved against `project_path`.
    pub fn policy_path(&self, project_path: &Path) -> Option<PathBuf> {
        self.policy.path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                project_path.join(p)
            }
        })
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<project_path>/.depgate/config.toml`
/// 3. `~/.config/depgate/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".depgate").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("depgate").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    tracing::debug!("no config file found, using defaults");
    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}
