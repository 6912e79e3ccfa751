//! Configuration loading and management
//!
//! Handles parsing of `.taskflow.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// Name of the configuration file at the project root
pub const CONFIG_FILE: &str = ".taskflow.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Actor configuration
    #[serde(default)]
    pub actor: ActorConfig,

    /// Dataset store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Commit snapshot configuration
    #[serde(default)]
    pub commits: CommitsConfig,

    /// Task rules
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Actor-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Default actor name when none specified
    #[serde(default = "default_actor")]
    pub default: String,
}

fn default_actor() -> String {
    "anonymous".to_string()
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            default: default_actor(),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the dataset, relative to the root
    #[serde(default = "default_store_dir")]
    pub dir: String,

    /// How long a transaction waits for the store lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_store_dir() -> String {
    ".taskflow".to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Commit snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitsConfig {
    /// Directory holding commit snapshots, relative to the store directory
    #[serde(default = "default_commits_dir")]
    pub dir: String,
}

fn default_commits_dir() -> String {
    "commits".to_string()
}

impl Default for CommitsConfig {
    fn default() -> Self {
        Self {
            dir: default_commits_dir(),
        }
    }
}

/// Task rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Longest parent chain accepted by the hierarchy check
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Task type assigned when none is given
    #[serde(default = "default_task_type")]
    pub default_type: String,
}

fn default_max_depth() -> usize {
    64
}

fn default_task_type() -> String {
    "task".to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            default_type: default_task_type(),
        }
    }
}

impl Config {
    /// Load configuration from a `.taskflow.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|err| Error::InvalidConfig(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the project root; defaults when no file exists
    pub fn load_from_root(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let config = Self::load(&config_path)?;
        tracing::debug!(path = %config_path.display(), "loaded config");
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Absolute store directory for a root
    pub fn store_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.store.dir)
    }

    fn validate(&self) -> Result<()> {
        if self.store.dir.trim().is_empty() {
            return Err(Error::InvalidConfig("store.dir cannot be empty".to_string()));
        }
        if self.commits.dir.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "commits.dir cannot be empty".to_string(),
            ));
        }
        if self.tasks.max_depth == 0 {
            return Err(Error::InvalidConfig(
                "tasks.max_depth must be >= 1".to_string(),
            ));
        }
        let code = self.tasks.default_type.trim();
        if code.is_empty() {
            return Err(Error::InvalidConfig(
                "tasks.default_type cannot be empty".to_string(),
            ));
        }
        if !code
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            return Err(Error::InvalidConfig(format!(
                "tasks.default_type must be a type code, got '{code}'"
            )));
        }
        Ok(())
    }
}
