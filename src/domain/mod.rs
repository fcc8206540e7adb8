//! Domain types for taskloom
//!
//! Actions and their results (tool granularity), task nodes and workflow
//! results (role granularity), plus the shared fingerprint and priority types.

mod action;
mod fingerprint;
mod priority;
mod task;

pub use action::{Action, ExecutionResult, ProposedAction, ResourceAccess, ToolInput, resources_overlap};
pub use fingerprint::Fingerprint;
pub use priority::Priority;
pub use task::{RolePayload, RoleResponse, TaskDependency, TaskNode, WorkflowResult};
