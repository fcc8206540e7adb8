//! Loop guard thresholds

use serde::{Deserialize, Serialize};

/// Thresholds applied by `LoopGuard`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GuardLimits {
    /// Attempts allowed per fingerprint before the task aborts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Repeats of one executed fingerprint tolerated per task
    #[serde(default = "default_max_repeats")]
    pub max_repeats: u32,

    /// Executions allowed per tool name, regardless of input
    #[serde(default = "default_max_tool_uses")]
    pub max_tool_uses: u32,

    /// Failures in a row that trip the circuit breaker
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

fn default_max_attempts() -> u32 {
    2
}

fn default_max_repeats() -> u32 {
    1
}

fn default_max_tool_uses() -> u32 {
    4
}

fn default_max_consecutive_failures() -> u32 {
    2
}

impl Default for GuardLimits {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_repeats: default_max_repeats(),
            max_tool_uses: default_max_tool_uses(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}
