//! # Dispatch queue: unbounded multi-producer, single-consumer FIFO.
//!
//! Thin wrapper over [`tokio::sync::mpsc::unbounded_channel`] that adds a depth
//! counter, an explicit close, and a cancellable receive.
//!
//! ## Rules
//! - **Non-blocking push**: producers only contend on a short mutex that guards
//!   the sender; pushes are ordered by the order they acquire it.
//! - **Single consumer**: the [`QueueReceiver`] is moved into the worker.
//! - **Cancellable pop**: [`QueueReceiver::recv`] returns as soon as the token is
//!   cancelled, even if items are pending (cancellation is checked first).
//! - **Unbounded**: depth is only observed, never limited.
//! - **Depth includes the item in flight**: the worker calls
//!   [`QueueReceiver::complete`] once it has finished with an item.
//!
//! ```text
//! producer 1 ──┐
//! producer 2 ──┼─► push() ─► [mpsc unbounded] ─► recv(token) ─► worker
//! producer N ──┘                                      │
//!                                    Item / Cancelled / Closed
//! ```

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Outcome of a receive on the worker side.
#[derive(Debug)]
pub(crate) enum Dequeued<T> {
    /// Next item in FIFO order.
    Item(T),
    /// The cancellation token fired.
    Cancelled,
    /// All senders are gone and the buffer is empty.
    Closed,
}

/// Producer half.
pub(crate) struct DispatchQueue<T> {
    tx: Mutex<Option<mpsc::UnboundedSender<T>>>,
    depth: Arc<AtomicUsize>,
}

/// Consumer half, owned by the worker.
pub(crate) struct QueueReceiver<T> {
    rx: mpsc::UnboundedReceiver<T>,
    depth: Arc<AtomicUsize>,
}

/// Creates a connected queue pair.
pub(crate) fn channel<T>() -> (DispatchQueue<T>, QueueReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        DispatchQueue {
            tx: Mutex::new(Some(tx)),
            depth: Arc::clone(&depth),
        },
        QueueReceiver { rx, depth },
    )
}

impl<T> DispatchQueue<T> {
    /// Appends `item`; returns the depth including it.
    ///
    /// Gives the item back if the queue is closed.
    pub(crate) fn push(&self, item: T) -> Result<usize, T> {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            return Err(item);
        };

        let depth = self.depth.fetch_add(1, Ordering::AcqRel) + 1;
        match tx.send(item) {
            Ok(()) => Ok(depth),
            Err(mpsc::error::SendError(item)) => {
                self.depth.fetch_sub(1, Ordering::AcqRel);
                Err(item)
            }
        }
    }

    /// Drops the sender. Pending items stay readable; later pushes fail.
    ///
    /// Returns `false` if the queue was already closed.
    pub(crate) fn close(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// `true` once [`close`](Self::close) has been called.
    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Items pushed but not yet completed (queued plus in flight).
    pub(crate) fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }
}

impl<T> QueueReceiver<T> {
    /// Waits for the next item or cancellation, whichever comes first.
    pub(crate) async fn recv(&mut self, token: &CancellationToken) -> Dequeued<T> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Dequeued::Cancelled,
            item = self.rx.recv() => match item {
                Some(item) => Dequeued::Item(item),
                None => Dequeued::Closed,
            },
        }
    }

    /// Marks the last received item as done; returns the remaining depth.
    pub(crate) fn complete(&self) -> usize {
        self.depth.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// Closes the receiving side and drops everything still buffered.
    ///
    /// Returns how many items were discarded.
    pub(crate) fn discard_pending(&mut self) -> usize {
        self.rx.close();
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            discarded += 1;
        }
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_and_depth() {
        let (q, mut rx) = channel::<u32>();
        let token = CancellationToken::new();

        assert_eq!(q.push(1), Ok(1));
        assert_eq!(q.push(2), Ok(2));
        assert_eq!(q.depth(), 2);

        assert!(matches!(rx.recv(&token).await, Dequeued::Item(1)));
        assert_eq!(q.depth(), 2);
        assert_eq!(rx.complete(), 1);
        assert!(matches!(rx.recv(&token).await, Dequeued::Item(2)));
        assert_eq!(rx.complete(), 0);
        assert_eq!(q.depth(), 0);
    }

    #[tokio::test]
    async fn cancellation_wins_over_pending_items() {
        let (q, mut rx) = channel::<u32>();
        let token = CancellationToken::new();

        q.push(1).unwrap();
        token.cancel();
        assert!(matches!(rx.recv(&token).await, Dequeued::Cancelled));
        assert_eq!(rx.discard_pending(), 1);
        assert_eq!(q.depth(), 0);
    }

    #[tokio::test]
    async fn cancel_wakes_blocked_receiver() {
        let (_q, mut rx) = channel::<u32>();
        let token = CancellationToken::new();
        let trigger = token.clone();

        let waiter = tokio::spawn(async move { matches!(rx.recv(&token).await, Dequeued::Cancelled) });
        tokio::task::yield_now().await;
        trigger.cancel();

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn close_rejects_pushes_and_drains_to_closed() {
        let (q, mut rx) = channel::<u32>();
        let token = CancellationToken::new();

        q.push(7).unwrap();
        assert!(q.close());
        assert!(!q.close());
        assert!(q.is_closed());
        assert_eq!(q.push(8), Err(8));

        assert!(matches!(rx.recv(&token).await, Dequeued::Item(7)));
        rx.complete();
        assert!(matches!(rx.recv(&token).await, Dequeued::Closed));
    }
}
