//! # Worker: the single consumer of a dispatcher's queue.
//!
//! Drains the queue one envelope at a time and fans each payload out to the
//! handlers registered for its key, in registration order.
//!
//! ## Architecture
//! ```text
//! Dispatcher::start() ──► Worker::new(shared, rx, &exited).run(token)
//!
//! loop {
//!   ├─► recv(token) ──► Cancelled ─► exit (clean)
//!   │               ──► Closed    ─► exit (fatal: QueueClosed, unless cancelled)
//!   │               ──► Item(env)
//!   ├─► snapshot = registry.lookup(key)
//!   │     └─► empty ─► debug log, unmatched += 1
//!   └─► for h in snapshot:
//!         └─► h.handle(&payload) (catch_unwind)
//!               ├─ Ok        ─► delivered += 1
//!               └─ Err/panic ─► warn log, handler_failures += 1, continue
//! }
//!
//! on exit (Drop, so it also runs when the runtime drops the task):
//!   ├─► release the in-flight message, discard whatever is still queued
//!   ├─► not a clean exit? ─► close queue
//!   ├─► wake idle waiters
//!   ├─► drop guard cancels `exited` (wakes every stop() caller)
//!   └─► not a clean exit? ─► escalation.fire(failure)
//!         never polled ─► Spawn, dropped mid-loop ─► Aborted
//! ```
//!
//! ## Rules
//! - Handlers run **sequentially**, never concurrently with each other.
//! - A message that started dispatching is finished even if cancellation
//!   arrives meanwhile; cancellation is observed between messages.
//! - Handler failures never end the loop; only queue faults and panics in the
//!   loop itself do.

use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{
    core::{
        dispatcher::Shared,
        queue::{Dequeued, QueueReceiver},
    },
    envelope::{Envelope, Message, RoutingKey},
    error::{panic_message, HandlerError, WorkerFailure},
    handlers::Handler,
};

pub(crate) struct Worker<K: RoutingKey, M: Message> {
    shared: Arc<Shared<K, M>>,
    rx: QueueReceiver<Envelope<K, M>>,
    in_flight: bool,
    polled: bool,
    outcome: Option<Result<(), WorkerFailure>>,
    exited: Option<DropGuard>,
}

impl<K: RoutingKey, M: Message> Worker<K, M> {
    /// `exited` is cancelled when the worker is dropped, polled or not.
    pub(crate) fn new(
        shared: Arc<Shared<K, M>>,
        rx: QueueReceiver<Envelope<K, M>>,
        exited: &CancellationToken,
    ) -> Self {
        Self {
            shared,
            rx,
            in_flight: false,
            polled: false,
            outcome: None,
            exited: Some(exited.clone().drop_guard()),
        }
    }

    /// Runs until `token` is cancelled or the loop fails fatally.
    ///
    /// Exit handling lives in `Drop`, so a future the runtime drops before or
    /// during the loop still releases the queue and escalates.
    pub(crate) async fn run(mut self, token: CancellationToken) {
        self.polled = true;
        tracing::info!("worker started");

        let outcome = match AssertUnwindSafe(self.drain(&token)).catch_unwind().await {
            Ok(res) => res,
            Err(panic) => Err(WorkerFailure::Panicked {
                info: panic_message(&*panic),
            }),
        };
        self.outcome = Some(outcome);
    }

    async fn drain(&mut self, token: &CancellationToken) -> Result<(), WorkerFailure> {
        loop {
            match self.rx.recv(token).await {
                Dequeued::Item(envelope) => {
                    self.in_flight = true;
                    self.dispatch(envelope).await;
                    self.in_flight = false;
                    if self.rx.complete() == 0 {
                        self.shared.idle.notify_waiters();
                    }
                }
                Dequeued::Cancelled => return Ok(()),
                // `stop()` cancels before closing; a close without cancel is a fault.
                Dequeued::Closed if token.is_cancelled() => return Ok(()),
                Dequeued::Closed => return Err(WorkerFailure::QueueClosed),
            }
        }
    }

    async fn dispatch(&self, envelope: Envelope<K, M>) {
        let (key, payload) = envelope.into_parts();
        let counters = &self.shared.counters;
        counters.dispatched();

        let handlers = self.shared.registry.lookup(&key);
        if handlers.is_empty() {
            counters.unmatched();
            tracing::debug!(
                key = ?key,
                message_type = std::any::type_name::<M>(),
                "no handlers registered for key"
            );
            return;
        }

        for handler in handlers {
            match invoke(handler.as_ref(), &payload).await {
                Ok(()) => counters.delivered(),
                Err(err) => {
                    counters.handler_failed();
                    tracing::warn!(
                        key = ?key,
                        message_type = std::any::type_name::<M>(),
                        handler = handler.name(),
                        reason = %err,
                        label = err.as_label(),
                        "handler failed"
                    );
                }
            }
        }
    }
}

impl<K: RoutingKey, M: Message> Drop for Worker<K, M> {
    fn drop(&mut self) {
        if self.in_flight {
            // Panicked or dropped mid-dispatch; that message is gone.
            self.rx.complete();
            self.in_flight = false;
        }
        let discarded = self.rx.discard_pending();
        if discarded > 0 {
            self.shared.counters.discarded(discarded);
            tracing::info!(discarded, "pending messages discarded");
        }

        let failure = match self.outcome.take() {
            Some(Ok(())) => None,
            Some(Err(failure)) => Some(failure),
            None if self.polled => Some(WorkerFailure::Aborted),
            None => Some(WorkerFailure::Spawn {
                reason: "runtime dropped the worker before it ran".into(),
            }),
        };
        if failure.is_some() {
            self.shared.queue.close();
        }
        self.shared.idle.notify_waiters();

        // Observers of the escalation must already see the worker as gone.
        drop(self.exited.take());

        match failure {
            None => tracing::info!("worker stopped"),
            Some(failure) => {
                tracing::error!(
                    dispatcher = %self.shared.name,
                    reason = %failure,
                    label = failure.as_label(),
                    "worker failed; escalating"
                );
                self.shared.escalation.fire(failure);
            }
        }
    }
}

/// Calls one handler, turning a panic into [`HandlerError::Panicked`].
async fn invoke<M: Message>(handler: &dyn Handler<M>, payload: &M) -> Result<(), HandlerError> {
    match AssertUnwindSafe(handler.handle(payload)).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(HandlerError::Panicked {
            info: panic_message(&*panic),
        }),
    }
}
