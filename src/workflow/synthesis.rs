//! Merge a workflow's per-task results into one outcome

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::WorkflowResult;
use crate::scheduler::parallelization_gain;

/// Counts and timings for a finished workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub success_rate: f64,
    /// Sum of every task's own duration
    pub total_duration_ms: u64,
    pub average_duration_ms: u64,
    pub wall_time_ms: u64,
    pub parallelization_gain: f64,
}

/// The single reportable result of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedOutcome {
    pub success: bool,
    pub content: String,
    pub actions: Vec<String>,
    pub suggestions: Vec<String>,
    pub stats: WorkflowStats,
}

/// Aggregate results in the order given
///
/// Success means at least half of the tasks succeeded. Actions and
/// suggestions come from successful tasks only, first occurrence wins.
pub fn synthesize(results: &[WorkflowResult], wall_time: Duration, estimated_serial: Duration) -> SynthesizedOutcome {
    let wall_time_ms = wall_time.as_millis() as u64;
    if results.is_empty() {
        return SynthesizedOutcome {
            success: false,
            content: "no tasks were executed".to_string(),
            actions: Vec::new(),
            suggestions: Vec::new(),
            stats: WorkflowStats {
                wall_time_ms,
                ..Default::default()
            },
        };
    }

    let (ok, failed): (Vec<&WorkflowResult>, Vec<&WorkflowResult>) = results.iter().partition(|r| r.success);
    let total = results.len();
    let total_duration_ms: u64 = results.iter().map(|r| r.duration_ms).sum();

    let mut actions = Vec::new();
    let mut suggestions = Vec::new();
    for result in &ok {
        push_unique(&mut actions, &result.result.payload.actions);
        push_unique(&mut suggestions, &result.result.payload.suggestions);
    }

    let mut sections = Vec::new();
    if !ok.is_empty() {
        let lines: Vec<String> = ok
            .iter()
            .map(|r| format!("- [{}] {}: {}", r.role, r.task_id, r.result.payload.content))
            .collect();
        sections.push(format!("Succeeded ({}):\n{}", ok.len(), lines.join("\n")));
    }
    if !failed.is_empty() {
        let lines: Vec<String> = failed
            .iter()
            .map(|r| {
                let reason = r.result.error.as_deref().unwrap_or("no error reported");
                format!("- [{}] {}: {}", r.role, r.task_id, reason)
            })
            .collect();
        sections.push(format!("Failed ({}):\n{}", failed.len(), lines.join("\n")));
    }

    SynthesizedOutcome {
        success: ok.len() * 2 >= total,
        content: sections.join("\n\n"),
        actions,
        suggestions,
        stats: WorkflowStats {
            total,
            succeeded: ok.len(),
            failed: failed.len(),
            success_rate: ok.len() as f64 / total as f64,
            total_duration_ms,
            average_duration_ms: total_duration_ms / total as u64,
            wall_time_ms,
            parallelization_gain: parallelization_gain(estimated_serial, wall_time),
        },
    }
}

fn push_unique(into: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}
