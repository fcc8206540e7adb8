//! Cross-role workflows
//!
//! A `WorkflowGraph` of author-declared task nodes is validated, run on a
//! role-level `BoundedScheduler` and folded into one `SynthesizedOutcome`.

mod error;
mod executor;
mod graph;
mod role;
mod synthesis;

pub use error::WorkflowError;
pub use executor::{WorkflowExecutor, WorkflowReport};
pub use graph::WorkflowGraph;
pub use role::{DriverRole, Role, RoleRegistry};
pub use synthesis::{SynthesizedOutcome, WorkflowStats, synthesize};
