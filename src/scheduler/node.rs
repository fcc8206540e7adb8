//! Units of work submitted to the scheduler

use std::time::Duration;

use crate::domain::Priority;

/// Dependency edge to another node of the same run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: String,
    /// Dependent is settled as failed (never started) if this dependency fails
    pub requires_success: bool,
}

/// One schedulable node carrying an opaque payload for the runner
#[derive(Debug, Clone)]
pub struct ScheduleNode<T> {
    pub id: String,
    /// Human-readable name used in events and reports (tool or role name)
    pub label: String,
    pub deps: Vec<Edge>,
    pub priority: Priority,
    pub parallel_safe: bool,
    /// Static duration estimate for the parallelization-gain heuristic
    pub estimate: Duration,
    pub payload: T,
}

impl<T> ScheduleNode<T> {
    pub fn new(id: impl Into<String>, payload: T) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            deps: Vec::new(),
            priority: Priority::Normal,
            parallel_safe: true,
            estimate: Duration::ZERO,
            payload,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Wait for `id` to complete, whether it succeeds or fails
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.deps.push(Edge {
            id: id.into(),
            requires_success: false,
        });
        self
    }

    /// Wait for `id` and only run if it succeeded
    pub fn requires(mut self, id: impl Into<String>) -> Self {
        self.deps.push(Edge {
            id: id.into(),
            requires_success: true,
        });
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Never run alongside any other node
    pub fn exclusive(mut self) -> Self {
        self.parallel_safe = false;
        self
    }

    pub fn parallel_safe(mut self, parallel_safe: bool) -> Self {
        self.parallel_safe = parallel_safe;
        self
    }

    pub fn estimate(mut self, estimate: Duration) -> Self {
        self.estimate = estimate;
        self
    }
}
