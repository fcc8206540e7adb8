//! Tool error types

use thiserror::Error;

/// Errors raised by a `ToolInvoker` while executing a call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    UnknownTool { name: String },

    #[error("Invalid input for {tool}: {reason}")]
    InvalidInput { tool: String, reason: String },

    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },

    #[error("{tool} timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },
}

impl ToolError {
    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Rejections raised at the resolver boundary, before anything executes
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown tool `{0}`")]
    UnknownTool(String),

    #[error("Input for `{tool}` must be an object")]
    NotAnObject { tool: String },

    #[error("Unknown parameter `{key}` for `{tool}`")]
    UnknownKey { tool: String, key: String },

    #[error("Missing required parameter `{key}` for `{tool}`")]
    MissingKey { tool: String, key: String },

    #[error("Parameter `{key}` for `{tool}` must be {expected}")]
    WrongType {
        tool: String,
        key: String,
        expected: &'static str,
    },

    #[error("Parameter `{key}` for `{tool}` was given more than once (via aliases)")]
    ConflictingAlias { tool: String, key: String },

    #[error("Duplicate action id `{0}` in one batch")]
    DuplicateId(String),
}
