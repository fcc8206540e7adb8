//! Progress stream
//!
//! Every significant step of a task or workflow emits an event onto a
//! `tokio::sync::broadcast` channel. Consumers subscribe; emitting never
//! blocks and never fails.
//!
//! ```rust,ignore
//! let bus = Arc::new(EventBus::with_default_capacity());
//! let emitter = bus.emitter_for(task_id);
//! emitter.iteration_started(1);
//!
//! let mut rx = bus.subscribe();
//! while let Ok(event) = rx.recv().await {
//!     println!("{}", event.event_type());
//! }
//! ```

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter, create_event_bus};
pub use types::Event;
