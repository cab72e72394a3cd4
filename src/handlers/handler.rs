//! # Handler abstraction.
//!
//! A [`Handler`] is invoked once per matching envelope, always on the
//! dispatcher's worker task and never concurrently with another handler of the
//! same dispatcher. Handlers should be quick: a slow one delays every message
//! queued behind it.
//!
//! Handlers are identified by their `Arc` allocation. Registering the same
//! `Arc` twice for a key is a no-op, and unsubscribe removes by the same
//! identity. The registry keeps only a `Weak` reference, so the caller's
//! `Arc` is what keeps a handler subscribed.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{envelope::Message, error::HandlerError};

/// Shared handle to a handler.
pub type HandlerRef<M> = Arc<dyn Handler<M>>;

/// # Callback for one message type.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use keyed_dispatch::{Handler, HandlerError};
///
/// struct Greeter;
///
/// #[async_trait]
/// impl Handler<String> for Greeter {
///     fn name(&self) -> &str { "greeter" }
///
///     async fn handle(&self, payload: &String) -> Result<(), HandlerError> {
///         if payload.is_empty() {
///             return Err(HandlerError::fail("empty greeting"));
///         }
///         println!("hello, {payload}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<M: Message>: Send + Sync + 'static {
    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handles one payload.
    ///
    /// An `Err` (or a panic) is logged by the worker and does not affect other
    /// handlers or later messages.
    async fn handle(&self, payload: &M) -> Result<(), HandlerError>;
}
