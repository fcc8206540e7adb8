//! Event types for taskloom progress streaming
//!
//! These events represent all observable activity of a run:
//! - Task lifecycle (start, iteration, complete)
//! - Scheduler nodes (start, complete, fail), at tool or role granularity
//! - Loop guard decisions (skip, abort)
//! - Workflow lifecycle (start, complete)

use serde::{Deserialize, Serialize};

/// Core event enum - the vocabulary of taskloom activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // === Task Lifecycle ===
    /// A task's iteration loop has started
    TaskStarted { scope_id: String, description: String },
    /// A reasoning iteration has started
    IterationStarted { scope_id: String, iteration: u32 },
    /// A task has reached a terminal outcome
    TaskCompleted {
        scope_id: String,
        /// `completed`, `best-effort`, `aborted` or `failed`
        outcome: String,
        iterations: u32,
    },

    // === Scheduler Nodes ===
    /// A scheduled node has started running
    NodeStarted {
        scope_id: String,
        node_id: String,
        label: String,
    },
    /// A scheduled node finished successfully
    NodeCompleted {
        scope_id: String,
        node_id: String,
        label: String,
        duration_ms: u64,
    },
    /// A scheduled node failed, timed out or was skipped
    NodeFailed {
        scope_id: String,
        node_id: String,
        label: String,
        error: String,
        duration_ms: u64,
    },

    // === Loop Guard ===
    /// The guard skipped a proposed action
    ActionSkipped {
        scope_id: String,
        action_id: String,
        fingerprint: String,
        reason: String,
    },
    /// The guard terminated the task
    GuardAborted { scope_id: String, reason: String },

    // === Workflow Lifecycle ===
    /// A cross-role workflow has started
    WorkflowStarted { scope_id: String, task_count: usize },
    /// A cross-role workflow has finished
    WorkflowCompleted {
        scope_id: String,
        success: bool,
        succeeded: usize,
        failed: usize,
        wall_time_ms: u64,
    },
}

impl Event {
    /// Get the task or workflow id this event belongs to
    pub fn scope_id(&self) -> &str {
        match self {
            Event::TaskStarted { scope_id, .. }
            | Event::IterationStarted { scope_id, .. }
            | Event::TaskCompleted { scope_id, .. }
            | Event::NodeStarted { scope_id, .. }
            | Event::NodeCompleted { scope_id, .. }
            | Event::NodeFailed { scope_id, .. }
            | Event::ActionSkipped { scope_id, .. }
            | Event::GuardAborted { scope_id, .. }
            | Event::WorkflowStarted { scope_id, .. }
            | Event::WorkflowCompleted { scope_id, .. } => scope_id,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::TaskStarted { .. } => "TaskStarted",
            Event::IterationStarted { .. } => "IterationStarted",
            Event::TaskCompleted { .. } => "TaskCompleted",
            Event::NodeStarted { .. } => "NodeStarted",
            Event::NodeCompleted { .. } => "NodeCompleted",
            Event::NodeFailed { .. } => "NodeFailed",
            Event::ActionSkipped { .. } => "ActionSkipped",
            Event::GuardAborted { .. } => "GuardAborted",
            Event::WorkflowStarted { .. } => "WorkflowStarted",
            Event::WorkflowCompleted { .. } => "WorkflowCompleted",
        }
    }
}
