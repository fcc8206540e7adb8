//! taskloom configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::guard::GuardLimits;

/// Main taskloom configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Concurrency bounds
    pub concurrency: ConcurrencyConfig,

    /// Per-node and per-task time budgets
    pub timeouts: TimeoutConfig,

    /// Loop guard thresholds
    pub guard: GuardLimits,

    /// Iteration driver settings
    pub driver: DriverConfig,

    /// Side-channel lookup cache
    pub cache: CacheConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency.tool_parallelism == 0 {
            return Err(eyre::eyre!("concurrency.tool-parallelism must be at least 1"));
        }
        if self.concurrency.role_parallelism == 0 {
            return Err(eyre::eyre!("concurrency.role-parallelism must be at least 1"));
        }
        if self.driver.max_iterations == 0 {
            return Err(eyre::eyre!("driver.max-iterations must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .taskloom.yml
        let local_config = PathBuf::from(".taskloom.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/taskloom/taskloom.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("taskloom").join("taskloom.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Concurrency bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Tool calls running at once within one iteration
    #[serde(rename = "tool-parallelism")]
    pub tool_parallelism: usize,

    /// Role tasks running at once within one workflow
    #[serde(rename = "role-parallelism")]
    pub role_parallelism: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            tool_parallelism: 3,
            role_parallelism: 2,
        }
    }
}

/// Time budgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per tool call
    #[serde(rename = "tool-timeout-ms")]
    pub tool_timeout_ms: u64,

    /// Per task (one iteration loop) and per workflow node
    #[serde(rename = "task-timeout-ms")]
    pub task_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            tool_timeout_ms: 60_000,
            task_timeout_ms: 600_000,
        }
    }
}

impl TimeoutConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }
}

/// Iteration driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Reasoning iterations before a best-effort completion
    #[serde(rename = "max-iterations")]
    pub max_iterations: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

/// Lookup cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    #[serde(rename = "ttl-secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 30,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
