//! Tool invocation contract

use async_trait::async_trait;

use crate::domain::ToolInput;

use super::ToolError;

/// Executes tool calls on behalf of the iteration driver
///
/// Implementations (filesystem, version control, shell, ...) live outside this
/// crate. Inputs have already been validated against the tool's schema.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, name: &str, input: &ToolInput) -> Result<String, ToolError>;
}
