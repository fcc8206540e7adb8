//! Guard termination reasons

use thiserror::Error;

/// Controlled termination of a task by the loop guard
///
/// `Display` is the natural-language explanation shown to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoopGuardAbort {
    #[error("Stopping: `{fingerprint}` was already attempted {attempts} times without success. Last failure: {last_error}")]
    AttemptsExhausted {
        fingerprint: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Stopping: `{fingerprint}` was already executed {executions} times; the task is repeating itself. Last error: {}", last_error_text(.last_error))]
    RepeatedAction {
        fingerprint: String,
        executions: u32,
        last_error: Option<String>,
    },

    #[error("Stopping: `{tool}` was already used {uses} times in this task. Last error: {}", last_error_text(.last_error))]
    ToolOveruse {
        tool: String,
        uses: u32,
        last_error: Option<String>,
    },

    #[error("Stopping after {failures} consecutive failures. Last error: {last_error}")]
    ConsecutiveFailures { failures: u32, last_error: String },
}

impl LoopGuardAbort {
    /// The last concrete error this abort carries, if any
    pub fn last_error(&self) -> Option<&str> {
        match self {
            Self::AttemptsExhausted { last_error, .. } | Self::ConsecutiveFailures { last_error, .. } => {
                Some(last_error)
            }
            Self::RepeatedAction { last_error, .. } | Self::ToolOveruse { last_error, .. } => last_error.as_deref(),
        }
    }
}

fn last_error_text(last_error: &Option<String>) -> &str {
    last_error.as_deref().unwrap_or("none")
}
