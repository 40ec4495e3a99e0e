//! Configuration management for repo-backup.
//!
//! Loads configuration from a TOML file; the access token may come from an
//! environment variable instead of the file.

use crate::remote::github::{Credential, RepoRef};
use crate::utils::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the contents API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Target repository as `owner/name`
    #[serde(default)]
    pub repository: Option<String>,

    /// Branch to read from and commit to (repository default when unset)
    #[serde(default)]
    pub branch: Option<String>,

    /// Access token; takes precedence over `token_env`
    #[serde(default)]
    pub token: Option<String>,

    /// Environment variable consulted when `token` is unset
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Remote directory used when no prefix is given
    #[serde(default = "default_prefix")]
    pub default_prefix: String,

    /// Entry names skipped at any depth while enumerating folders
    #[serde(default = "default_exclude_names")]
    pub exclude_names: Vec<String>,

    /// Commit messages read `"{prefix}: {file name}"`
    #[serde(default = "default_commit_message_prefix")]
    pub commit_message_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_user_agent() -> String {
    format!("repo-backup/{}", env!("CARGO_PKG_VERSION"))
}

fn default_prefix() -> String {
    crate::plan::DEFAULT_PREFIX.to_string()
}

fn default_exclude_names() -> Vec<String> {
    crate::fs::walker::DEFAULT_EXCLUDES
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn default_commit_message_prefix() -> String {
    "Backup".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            repository: None,
            branch: None,
            token: None,
            token_env: default_token_env(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            default_prefix: default_prefix(),
            exclude_names: default_exclude_names(),
            commit_message_prefix: default_commit_message_prefix(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            remote: RemoteConfig::default(),
            backup: BackupConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the access token: explicit value first, then the environment.
    pub fn credential(&self) -> Option<Credential> {
        self.remote
            .token
            .clone()
            .or_else(|| std::env::var(&self.remote.token_env).ok())
            .filter(|token| !token.trim().is_empty())
            .map(Credential::new)
    }

    /// Parse the configured `owner/name` repository.
    pub fn repository(&self) -> Result<RepoRef> {
        let full_name = self.remote.repository.as_deref().ok_or_else(|| {
            SyncError::InvalidInput("no repository configured (expected owner/name)".to_string())
        })?;
        full_name.parse()
    }
}
