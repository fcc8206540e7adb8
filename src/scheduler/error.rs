//! Scheduler error types

use thiserror::Error;

use super::BatchReport;

/// Why a single node did not succeed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NodeError {
    #[error("{0}")]
    Failed(String),

    #[error("timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    #[error("skipped: dependency {dependency} failed")]
    Skipped { dependency: String },
}

/// Batch-level failures
#[derive(Debug, Error)]
pub enum ScheduleError<O> {
    #[error("duplicate node id `{0}`")]
    DuplicateNode(String),

    /// Nothing running, nothing ready, work remaining: a cycle or an edge to
    /// a node that does not exist
    #[error("graph is unschedulable; never started: {}", .stranded.join(", "))]
    Unschedulable { partial: BatchReport<O>, stranded: Vec<String> },
}

impl<O> ScheduleError<O> {
    /// Ids of nodes that never started
    pub fn stranded(&self) -> &[String] {
        match self {
            Self::DuplicateNode(_) => &[],
            Self::Unschedulable { stranded, .. } => stranded,
        }
    }
}
