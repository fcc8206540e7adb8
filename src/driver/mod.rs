//! Iteration driver
//!
//! Composes the planner, tool catalog, loop guard, dependency resolver and
//! scheduler into the per-task reasoning loop. Node-level failures become
//! history for the next iteration; only guard aborts, unschedulable batches,
//! an unavailable planner or an exceeded time budget end a task early.

mod core;
mod planner;
mod report;

pub use core::{DEFAULT_MAX_ITERATIONS, IterationDriver};
pub use planner::{Planner, PlannerDecision, PlannerError};
pub use report::{IterationRecord, ParallelExecutionResult, RejectedAction, TaskOutcome, TaskReport, TaskStats};
