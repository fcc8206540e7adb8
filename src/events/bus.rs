//! Event Bus - pub/sub channel for taskloom progress events
//!
//! Components emit events, consumers (CLI printers, loggers, front ends) subscribe.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::Event;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4_096;

/// Central event bus for progress streaming
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped, and a
    /// lagging subscriber loses the oldest events.
    pub fn emit(&self, event: Event) {
        debug!(event_type = event.event_type(), scope_id = event.scope_id(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter bound to one task or workflow id
    pub fn emitter_for(&self, scope_id: impl Into<String>) -> EventEmitter {
        let scope_id = scope_id.into();
        debug!(%scope_id, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            scope_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for components to emit events without owning the bus
///
/// Cheap to clone; every convenience method fills in the scope id.
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<Event>,
    scope_id: String,
}

impl EventEmitter {
    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    /// Emit a raw event
    pub fn emit(&self, event: Event) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }

    // === Convenience methods ===

    pub fn task_started(&self, description: &str) {
        self.emit(Event::TaskStarted {
            scope_id: self.scope_id.clone(),
            description: description.to_string(),
        });
    }

    pub fn iteration_started(&self, iteration: u32) {
        self.emit(Event::IterationStarted {
            scope_id: self.scope_id.clone(),
            iteration,
        });
    }

    pub fn task_completed(&self, outcome: &str, iterations: u32) {
        self.emit(Event::TaskCompleted {
            scope_id: self.scope_id.clone(),
            outcome: outcome.to_string(),
            iterations,
        });
    }

    pub fn node_started(&self, node_id: &str, label: &str) {
        self.emit(Event::NodeStarted {
            scope_id: self.scope_id.clone(),
            node_id: node_id.to_string(),
            label: label.to_string(),
        });
    }

    pub fn node_completed(&self, node_id: &str, label: &str, duration_ms: u64) {
        self.emit(Event::NodeCompleted {
            scope_id: self.scope_id.clone(),
            node_id: node_id.to_string(),
            label: label.to_string(),
            duration_ms,
        });
    }

    pub fn node_failed(&self, node_id: &str, label: &str, error: &str, duration_ms: u64) {
        self.emit(Event::NodeFailed {
            scope_id: self.scope_id.clone(),
            node_id: node_id.to_string(),
            label: label.to_string(),
            error: error.to_string(),
            duration_ms,
        });
    }

    pub fn action_skipped(&self, action_id: &str, fingerprint: &str, reason: &str) {
        self.emit(Event::ActionSkipped {
            scope_id: self.scope_id.clone(),
            action_id: action_id.to_string(),
            fingerprint: fingerprint.to_string(),
            reason: reason.to_string(),
        });
    }

    pub fn guard_aborted(&self, reason: &str) {
        self.emit(Event::GuardAborted {
            scope_id: self.scope_id.clone(),
            reason: reason.to_string(),
        });
    }

    pub fn workflow_started(&self, task_count: usize) {
        self.emit(Event::WorkflowStarted {
            scope_id: self.scope_id.clone(),
            task_count,
        });
    }

    pub fn workflow_completed(&self, success: bool, succeeded: usize, failed: usize, wall_time_ms: u64) {
        self.emit(Event::WorkflowCompleted {
            scope_id: self.scope_id.clone(),
            success,
            succeeded,
            failed,
            wall_time_ms,
        });
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_event_bus_subscribe() {
        let bus = EventBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers() {
        let bus = EventBus::new(16);
        bus.emit(Event::GuardAborted {
            scope_id: "t".to_string(),
            reason: "nobody listening".to_string(),
        });
    }

    #[tokio::test]
    async fn test_event_emitter_convenience_methods() {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter_for("task-1");

        emitter.task_started("Refactor parser");
        emitter.iteration_started(1);
        emitter.node_started("1-1", "read_file");
        emitter.node_completed("1-1", "read_file", 12);
        emitter.node_failed("1-2", "run_command", "exit 1", 40);
        emitter.action_skipped("2-1", "read_file{\"path\":\"a\"}", "already succeeded");
        emitter.guard_aborted("stuck");
        emitter.task_completed("aborted", 2);

        let mut types = Vec::new();
        for _ in 0..8 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.scope_id(), "task-1");
            types.push(event.event_type());
        }
        assert_eq!(types.first(), Some(&"TaskStarted"));
        assert_eq!(types.last(), Some(&"TaskCompleted"));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
