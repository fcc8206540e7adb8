//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SchedulerConfig {
    /// Max nodes running at once; values below 1 are treated as 1
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Per-node timeout in milliseconds (None = wait indefinitely)
    #[serde(default)]
    pub node_timeout_ms: Option<u64>,
}

fn default_max_concurrent() -> usize {
    3
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            node_timeout_ms: None,
        }
    }
}

impl SchedulerConfig {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            node_timeout_ms: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.node_timeout_ms = Some(timeout_ms);
        self
    }

    /// Get the node timeout as a Duration
    pub fn node_timeout(&self) -> Option<Duration> {
        self.node_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.node_timeout(), None);
    }

    #[test]
    fn test_timeout_duration() {
        let config = SchedulerConfig::new(2).with_timeout_ms(1500);
        assert_eq!(config.node_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_deserialize_kebab_case() {
        let config: SchedulerConfig = serde_yaml::from_str("max-concurrent: 5\nnode-timeout-ms: 250").unwrap();
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.node_timeout_ms, Some(250));
    }
}
