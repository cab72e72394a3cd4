//! Error types used by the dispatcher and its handlers.
//!
//! This module defines three enums:
//!
//! - [`HandlerError`]: a single handler invocation failed (recovered locally).
//! - [`EnqueueError`]: a producer tried to submit to a closed dispatcher.
//! - [`WorkerFailure`]: the worker loop itself could not start or continue.
//!
//! Each type provides `as_label` for logs; only [`WorkerFailure`] ever reaches the
//! error-escalation callback.

use std::borrow::Cow;

use thiserror::Error;

/// # Errors produced by a handler invocation.
///
/// These never leave the worker: they are logged with the routing key and
/// message type, counted, and the loop moves on to the next handler.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler returned an error.
    #[error("handler failed: {reason}")]
    Fail {
        /// The underlying error message.
        reason: String,
    },

    /// Handler panicked; the panic was caught by the worker.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    ///
    /// # Example
    /// ```
    /// use keyed_dispatch::HandlerError;
    ///
    /// let err = HandlerError::fail("disk full");
    /// assert_eq!(err.to_string(), "handler failed: disk full");
    /// ```
    pub fn fail(reason: impl Into<String>) -> Self {
        HandlerError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
        }
    }
}

/// # Errors returned to producers by `enqueue`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnqueueError {
    /// The dispatcher was stopped (or failed) and no longer accepts messages.
    #[error("dispatcher '{dispatcher}' is closed")]
    Closed {
        /// Name of the rejecting dispatcher instance.
        dispatcher: Cow<'static, str>,
    },
}

impl EnqueueError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EnqueueError::Closed { .. } => "enqueue_closed",
        }
    }
}

/// # Fatal worker conditions.
///
/// Delivered at most once per dispatcher through the callback registered with
/// [`Dispatcher::on_fatal`](crate::Dispatcher::on_fatal).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerFailure {
    /// The worker task could not be spawned.
    #[error("worker failed to start: {reason}")]
    Spawn {
        /// Why spawning failed.
        reason: String,
    },

    /// The queue was closed while the worker was still draining it.
    #[error("dispatch queue closed unexpectedly")]
    QueueClosed,

    /// The runtime dropped the worker task mid-loop (e.g. runtime shutdown).
    #[error("worker task aborted by its runtime")]
    Aborted,

    /// A panic escaped the worker loop (outside of handler isolation).
    #[error("worker panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl WorkerFailure {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use keyed_dispatch::WorkerFailure;
    ///
    /// assert_eq!(WorkerFailure::QueueClosed.as_label(), "worker_queue_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerFailure::Spawn { .. } => "worker_spawn_failed",
            WorkerFailure::QueueClosed => "worker_queue_closed",
            WorkerFailure::Aborted => "worker_aborted",
            WorkerFailure::Panicked { .. } => "worker_panicked",
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(HandlerError::fail("x").as_label(), "handler_failed");
        assert_eq!(
            HandlerError::Panicked { info: "x".into() }.as_label(),
            "handler_panicked"
        );
        assert_eq!(
            EnqueueError::Closed { dispatcher: "d".into() }.as_label(),
            "enqueue_closed"
        );
        assert_eq!(
            WorkerFailure::Spawn { reason: "x".into() }.as_label(),
            "worker_spawn_failed"
        );
        assert_eq!(WorkerFailure::Aborted.as_label(), "worker_aborted");
    }

    #[test]
    fn closed_error_names_the_dispatcher() {
        let err = EnqueueError::Closed {
            dispatcher: "orders".into(),
        };
        assert_eq!(err.to_string(), "dispatcher 'orders' is closed");
    }

    #[test]
    fn panic_message_downcasts_common_payloads() {
        let s: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");

        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
