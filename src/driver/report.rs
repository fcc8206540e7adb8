//! Per-iteration records and the final task report

use serde::Serialize;

use crate::domain::ExecutionResult;
use crate::guard::SkippedAction;

/// Terminal state of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TaskOutcome {
    /// The planner produced a final answer
    Completed { answer: String },
    /// The iteration budget ran out; not an error
    BestEffort { summary: String },
    /// The loop guard stopped the task
    Aborted { reason: String },
    /// Planner unavailable, graph unschedulable or time budget exceeded
    Failed { message: String },
}

impl TaskOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::BestEffort { .. } => "best-effort",
            Self::Aborted { .. } => "aborted",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::BestEffort { .. })
    }

    /// The user-facing text
    pub fn message(&self) -> &str {
        match self {
            Self::Completed { answer } => answer,
            Self::BestEffort { summary } => summary,
            Self::Aborted { reason } => reason,
            Self::Failed { message } => message,
        }
    }
}

/// Results of one batch of tool calls
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParallelExecutionResult {
    /// In completion order
    pub results: Vec<ExecutionResult>,
    pub total_duration_ms: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub parallelization_gain: f64,
    pub peak_concurrency: usize,
    /// Actions that never started because the batch could not be scheduled
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stranded: Vec<String>,
}

/// A proposal rejected by input validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedAction {
    pub id: String,
    pub tool: String,
    pub error: String,
}

/// Everything that happened in one reasoning iteration; fed back to the
/// planner as history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ParallelExecutionResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedAction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedAction>,
}

impl IterationRecord {
    pub fn new(iteration: u32, rationale: impl Into<String>) -> Self {
        Self {
            iteration,
            rationale: rationale.into(),
            execution: None,
            skipped: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn results(&self) -> &[ExecutionResult] {
        self.execution.as_ref().map(|e| e.results.as_slice()).unwrap_or(&[])
    }
}

/// Aggregated statistics over a whole task
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskStats {
    pub iterations: u32,
    pub actions_executed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub total_duration_ms: u64,
    pub peak_concurrency: usize,
    /// Mean over iterations that executed something
    pub average_parallelization_gain: f64,
}

impl TaskStats {
    pub fn from_records(records: &[IterationRecord], total_duration_ms: u64) -> Self {
        let mut stats = Self {
            iterations: records.len() as u32,
            total_duration_ms,
            ..Self::default()
        };

        let mut gains = Vec::new();
        for record in records {
            stats.skipped += record.skipped.len();
            stats.rejected += record.rejected.len();
            if let Some(execution) = &record.execution {
                stats.actions_executed += execution.results.iter().filter(|r| r.started_at.is_some()).count();
                stats.succeeded += execution.succeeded;
                stats.failed += execution.failed;
                stats.peak_concurrency = stats.peak_concurrency.max(execution.peak_concurrency);
                gains.push(execution.parallelization_gain);
            }
        }

        if !gains.is_empty() {
            stats.average_parallelization_gain = gains.iter().sum::<f64>() / gains.len() as f64;
        }
        stats
    }
}

/// Final report of one task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub task_id: String,
    pub task: String,
    pub outcome: TaskOutcome,
    pub iterations: Vec<IterationRecord>,
    pub stats: TaskStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_kinds() {
        let aborted = TaskOutcome::Aborted { reason: "stuck".into() };
        assert_eq!(aborted.kind(), "aborted");
        assert!(!aborted.is_success());
        assert_eq!(aborted.message(), "stuck");
        assert!(TaskOutcome::BestEffort { summary: String::new() }.is_success());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(TaskOutcome::Failed { message: "x".into() }).unwrap();
        assert_eq!(json["status"], "failed");
    }

    #[test]
    fn test_stats_from_records() {
        let mut first = IterationRecord::new(1, "look");
        first.execution = Some(ParallelExecutionResult {
            succeeded: 2,
            failed: 1,
            parallelization_gain: 0.5,
            peak_concurrency: 3,
            ..Default::default()
        });
        let mut second = IterationRecord::new(2, "answer");
        second.rejected.push(RejectedAction {
            id: "2-1".into(),
            tool: "nope".into(),
            error: "Unknown tool `nope`".into(),
        });

        let stats = TaskStats::from_records(&[first, second], 120);
        assert_eq!(stats.iterations, 2);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.peak_concurrency, 3);
        assert!((stats.average_parallelization_gain - 0.5).abs() < 1e-9);
    }
}
