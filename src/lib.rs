//! # keyed-dispatch
//!
//! **keyed-dispatch** is an in-process message dispatcher for Rust.
//!
//! Producers enqueue payloads tagged with a routing key; a single background
//! worker drains the queue in FIFO order and hands each payload to every
//! handler registered for its key, one handler at a time, in registration
//! order. It decouples producers from consumers inside one process; it is not
//! a network broker and keeps nothing across restarts.
//!
//! ## Architecture
//! ```text
//!   producer 1   producer 2   producer N
//!       │            │            │
//!       └─ enqueue(key, payload) ─┘
//!                    ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Dispatcher                                                   │
//! │  - DispatchQueue (unbounded mpsc, FIFO)                       │
//! │  - Registry (key → [Weak<Handler>], insertion ordered)        │
//! │  - Escalation (one-shot fatal callback)                       │
//! │  - CancellationToken (stop signal)                            │
//! └───────────────────────────┬───────────────────────────────────┘
//!                             ▼
//!                 ┌───────────────────────┐
//!                 │   Worker (one task)   │
//!                 │  recv ─► snapshot ─►  │
//!                 │  h1.handle(&payload)  │
//!                 │  h2.handle(&payload)  │
//!                 │  ...                  │
//!                 └───────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Dispatcher::new / builder().build()   ─► Created   (enqueue buffers)
//! start()                               ─► Running   (worker spawned)
//! wait_idle().await                     ─► Running   (queue drained)
//! stop().await                          ─► Stopped   (worker joined, enqueue fails)
//! fatal worker failure                  ─► Stopped + on_fatal(failure) once
//! runtime shut down under the worker    ─► Stopped + on_fatal(Aborted) once
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Dispatch**      | Keyed fan-out on a single worker task.                       | [`Dispatcher`], [`Envelope`]              |
//! | **Handlers**      | Async trait or closure callbacks, identified by `Arc`.       | [`Handler`], [`HandlerFn`], [`HandlerRef`]|
//! | **Lifecycle**     | Explicit start, joining stop, one-shot fatal escalation.     | [`DispatcherState`], [`WorkerFailure`]    |
//! | **Errors**        | Typed errors for handlers, producers and the worker.         | [`HandlerError`], [`EnqueueError`]        |
//! | **Configuration** | Instance name, auto-start, queue depth warnings.             | [`DispatcherConfig`]                      |
//! | **Stats**         | Lock-free counters for enqueue/dispatch/delivery/failures.   | [`DispatcherStats`]                       |
//!
//! ## Logging
//! All diagnostics go through [`tracing`]. The worker runs inside a
//! `dispatcher` span carrying the configured instance name; handler failures
//! are logged at `warn` with the routing key and message type, unmatched keys at
//! `debug`, fatal failures at `error`. Install any `tracing` subscriber to see them.
//!
//! ## Example
//! ```rust
//! use keyed_dispatch::{Dispatcher, DispatcherConfig, HandlerFn, HandlerRef};
//!
//! #[derive(Clone, Debug, PartialEq, Eq, Hash)]
//! enum Topic { Greeting, Birthday }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::<Topic, String>::builder(DispatcherConfig::named("demo")).build();
//!
//!     let hello: HandlerRef<String> = HandlerFn::arc("hello", |name: &String| {
//!         println!("hello, {name}");
//!         Ok(())
//!     });
//!     let cake: HandlerRef<String> = HandlerFn::arc("cake", |name: &String| {
//!         println!("happy birthday, {name}!");
//!         Ok(())
//!     });
//!
//!     dispatcher.subscribe(Topic::Greeting, &hello);
//!     dispatcher.subscribe(Topic::Birthday, &cake);
//!     dispatcher.start();
//!
//!     dispatcher.enqueue(Topic::Greeting, "world".into())?;
//!     dispatcher.enqueue(Topic::Birthday, "ferris".into())?;
//!
//!     dispatcher.wait_idle().await;
//!     dispatcher.stop().await;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod envelope;
mod error;
mod handlers;

// ---- Public re-exports ----

pub use config::DispatcherConfig;
pub use core::{Dispatcher, DispatcherBuilder, DispatcherState, DispatcherStats, FatalCallback};
pub use envelope::{Envelope, Message, RoutingKey};
pub use error::{EnqueueError, HandlerError, WorkerFailure};
pub use handlers::{Handler, HandlerFn, HandlerRef};
