use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub update: UpdateConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_accept")]
    pub accept: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 0 keeps the fan-out unbounded
    #[serde(default)]
    pub max_concurrent_checks: usize,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LocalConfig {
    #[serde(default = "default_local_host")]
    pub host: String,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMethod {
    /// Spawn `<command> pull <model>` and wait for it
    #[default]
    Command,
    /// Pull through the local server's streaming endpoint
    Stream,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfig {
    #[serde(default)]
    pub method: UpdateMethod,
    #[serde(default = "default_command")]
    pub command: String,
}

// Default value functions
fn default_registry_url() -> String {
    "https://ollama.ai".to_string()
}
fn default_namespace() -> String {
    "library".to_string()
}
fn default_accept() -> String {
    "application/vnd.docker.distribution.manifest.v2+json".to_string()
}
const fn default_timeout_secs() -> u64 {
    30
}
fn default_local_host() -> String {
    "http://127.0.0.1:11434".to_string()
}
fn default_command() -> String {
    "ollama".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            namespace: default_namespace(),
            accept: default_accept(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_checks: 0,
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            host: default_local_host(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            method: UpdateMethod::default(),
            command: default_command(),
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No config directory available, using defaults");
                Ok(Self::default().with_env_overrides())
            }
        }
    }

    /// Load config from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str::<Self>(&content).map_err(|e| {
                SyncError::Config(format!("Failed to parse {}: {e}", path.display()))
            })?
        } else {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    /// Apply `OLLAMA_HOST`, the same variable the ollama CLI honours
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            if !host.trim().is_empty() {
                self.local.host = normalize_host(host.trim());
            }
        }
        self
    }
}

/// Default config path: `$XDG_CONFIG_HOME/modelsync/config.toml`
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("modelsync").join("config.toml"))
}

/// Accept `host:port` as well as full URLs
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
