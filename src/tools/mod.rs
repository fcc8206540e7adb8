//! Tool catalog and invocation contract
//!
//! Tools themselves (filesystem, git, shell, memory lookups) are external.
//! This module owns what the orchestrator needs to know about them: each
//! tool's input schema, which resource it touches, and how it is invoked.

mod catalog;
mod error;
mod invoker;
mod traits;

pub use catalog::{Effect, ParamSpec, ParamType, Target, ToolCatalog, ToolSpec, ValidatedCall};
pub use error::{ToolError, ValidationError};
pub use invoker::CachingInvoker;
pub use traits::ToolInvoker;
