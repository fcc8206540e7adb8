//! Bounded-concurrency, dependency-aware scheduler
//!
//! Generic over the payload each node carries and the output its runner
//! produces, so the same engine executes tool calls within one iteration and
//! role tasks within a workflow.

mod config;
mod core;
mod error;
mod node;
mod report;

pub use config::SchedulerConfig;
pub use core::BoundedScheduler;
pub use error::{NodeError, ScheduleError};
pub use node::{Edge, ScheduleNode};
pub use report::{BatchReport, NodeOutcome, parallelization_gain};
