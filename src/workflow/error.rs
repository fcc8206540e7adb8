//! Workflow error types

use thiserror::Error;

/// Reasons a workflow graph cannot run
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// Nodes on the cycle, in dependency order
    #[error("dependency cycle: {}", cycle_path(.0))]
    Cycle(Vec<String>),

    #[error("task `{task}` depends on unknown task `{dependency}`")]
    UnknownDependency { task: String, dependency: String },

    #[error("task `{task}` is assigned to unknown role `{role}`")]
    UnknownRole { task: String, role: String },

    #[error("duplicate task id `{0}`")]
    DuplicateTask(String),

    #[error("workflow is unschedulable; never started: {}", .stranded.join(", "))]
    Unschedulable { stranded: Vec<String> },
}

fn cycle_path(nodes: &[String]) -> String {
    match nodes.first() {
        Some(first) => format!("{} -> {}", nodes.join(" -> "), first),
        None => String::new(),
    }
}
