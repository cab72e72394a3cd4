//! Dispatcher core: queue, registry, worker and lifecycle.
//!
//! The only public API from this module is [`Dispatcher`] (with its builder,
//! state and stats types).
//!
//! Internal modules:
//! - [`queue`]: unbounded MPSC queue with depth tracking and cancellable receive;
//! - [`registry`]: routing key → ordered `Weak` handler list with snapshot lookup;
//! - [`worker`]: single consumer loop, handler isolation, fatal detection;
//! - [`escalation`]: one-shot fatal-failure callback;
//! - [`stats`]: lock-free counters;
//! - [`dispatcher`]: public handle, lifecycle state machine, builder.
//!
//! ```text
//! producers ─► enqueue() ─► queue ─► worker ─► registry.lookup(key) ─► handlers
//!                                      │
//!                                      └─ fatal ─► escalation.fire()
//! ```

mod dispatcher;
mod escalation;
mod queue;
mod registry;
mod stats;
mod worker;

pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherState};
pub use escalation::FatalCallback;
pub use stats::DispatcherStats;
