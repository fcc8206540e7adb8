//! Per-node outcomes and batch statistics

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::NodeError;

/// Result of one node, successful or not
#[derive(Debug, Clone)]
pub struct NodeOutcome<O> {
    pub id: String,
    pub label: String,
    /// None when the node was settled without starting
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub duration: Duration,
    pub result: Result<O, NodeError>,
}

impl<O> NodeOutcome<O> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Aggregated outcome of one scheduler run
#[derive(Debug, Clone)]
pub struct BatchReport<O> {
    /// In completion order
    pub outcomes: Vec<NodeOutcome<O>>,
    pub wall_time: Duration,
    pub succeeded: usize,
    pub failed: usize,
    pub peak_concurrency: usize,
    /// Sum of the static estimates of every submitted node
    pub estimated_serial: Duration,
}

impl<O> Default for BatchReport<O> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
            wall_time: Duration::ZERO,
            succeeded: 0,
            failed: 0,
            peak_concurrency: 0,
            estimated_serial: Duration::ZERO,
        }
    }
}

impl<O> BatchReport<O> {
    /// Advisory estimate of time saved versus serial execution, in [0, 1]
    pub fn parallelization_gain(&self) -> f64 {
        parallelization_gain(self.estimated_serial, self.wall_time)
    }

    pub fn outcome(&self, id: &str) -> Option<&NodeOutcome<O>> {
        self.outcomes.iter().find(|o| o.id == id)
    }

    /// Ids in the order they finished
    pub fn completion_order(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.id.as_str()).collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// `max(0, (estimated - wall) / estimated)`; zero when nothing was estimated
pub fn parallelization_gain(estimated_serial: Duration, wall_time: Duration) -> f64 {
    let estimated = estimated_serial.as_secs_f64();
    if estimated <= 0.0 {
        return 0.0;
    }
    ((estimated - wall_time.as_secs_f64()) / estimated).max(0.0)
}
