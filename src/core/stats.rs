//! # Dispatcher counters.
//!
//! Lock-free counters updated by producers and the worker; read with
//! [`Counters::snapshot`] into a plain [`DispatcherStats`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of a dispatcher's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Messages accepted by `enqueue`.
    pub enqueued: u64,
    /// Messages taken off the queue by the worker (matched or not).
    pub dispatched: u64,
    /// Successful handler invocations.
    pub delivered: u64,
    /// Handler invocations that returned an error or panicked.
    pub handler_failures: u64,
    /// Dispatched messages whose key had no live handler.
    pub unmatched: u64,
    /// Messages still queued when the worker stopped (never delivered).
    pub discarded: u64,
}

#[derive(Default)]
pub(crate) struct Counters {
    enqueued: AtomicU64,
    dispatched: AtomicU64,
    delivered: AtomicU64,
    handler_failures: AtomicU64,
    unmatched: AtomicU64,
    discarded: AtomicU64,
}

impl Counters {
    pub(crate) fn enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn handler_failed(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn unmatched(&self) {
        self.unmatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn discarded(&self, n: usize) {
        self.discarded.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DispatcherStats {
        DispatcherStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}
