//! taskloom - bounded-concurrency action scheduling for reasoning agents
//!
//! taskloom sits between a reasoning step that proposes tool calls and the
//! tools that execute them. Each proposed batch is validated, screened by a
//! loop guard, annotated with ordering constraints and run on a scheduler that
//! never exceeds its concurrency bound. The same scheduler runs author-declared
//! role workflows, whose results are folded into one synthesized outcome.
//!
//! # Modules
//!
//! - [`domain`] - Actions, fingerprints, task nodes and role results
//! - [`tools`] - Tool catalog, input validation and the invoker contract
//! - [`resolver`] - Dependency and parallel-safety annotation of a batch
//! - [`scheduler`] - Dependency-aware bounded-concurrency executor
//! - [`guard`] - Per-task repetition and retry limits
//! - [`driver`] - The per-task reasoning loop
//! - [`workflow`] - Cross-role task graphs and result synthesis
//! - [`events`] - Progress events for observers
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod driver;
pub mod events;
pub mod guard;
pub mod resolver;
pub mod scheduler;
pub mod tools;
pub mod workflow;

// Re-export commonly used types
pub use cache::TtlCache;
pub use config::Config;
pub use domain::{
    Action, ExecutionResult, Fingerprint, Priority, ProposedAction, ResourceAccess, RolePayload, RoleResponse,
    TaskNode, ToolInput, WorkflowResult,
};
pub use driver::{IterationDriver, ParallelExecutionResult, Planner, PlannerDecision, PlannerError, TaskOutcome, TaskReport};
pub use events::{Event, EventBus, EventEmitter};
pub use guard::{GuardLimits, LoopGuard, LoopGuardAbort};
pub use scheduler::{BatchReport, BoundedScheduler, NodeError, ScheduleError, ScheduleNode, SchedulerConfig};
pub use tools::{ToolCatalog, ToolError, ToolInvoker, ValidationError};
pub use workflow::{
    Role, RoleRegistry, SynthesizedOutcome, WorkflowError, WorkflowExecutor, WorkflowGraph, WorkflowReport,
};
