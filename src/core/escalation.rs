//! # One-shot error escalation.
//!
//! Holds at most one callback and fires it at most once. Firing consumes the
//! slot, so there is nothing left to detach and no second notification.
//!
//! ```text
//! Pending(None) ──register(cb)──► Pending(Some(cb)) ──fire(err)──► Fired
//!       │                                                            ▲
//!       └──────────────────────fire(err) (logged, no callback)───────┘
//! register(cb) while Fired ─► cb dropped, warn
//! ```

use std::sync::{Mutex, PoisonError};

use crate::error::WorkerFailure;

/// Callback invoked on fatal worker failure.
pub type FatalCallback = Box<dyn FnOnce(WorkerFailure) + Send + 'static>;

enum Slot {
    Pending(Option<FatalCallback>),
    Fired,
}

pub(crate) struct Escalation {
    slot: Mutex<Slot>,
}

impl Escalation {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending(None)),
        }
    }

    /// Installs (or replaces) the callback.
    ///
    /// Returns `false` if escalation already fired; the callback is dropped.
    pub(crate) fn register(&self, cb: FatalCallback) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *slot {
            Slot::Pending(current) => {
                *current = Some(cb);
                true
            }
            Slot::Fired => false,
        }
    }

    /// Consumes the slot and runs the callback outside the lock.
    ///
    /// Returns `false` if escalation already fired.
    pub(crate) fn fire(&self, failure: WorkerFailure) -> bool {
        let cb = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match std::mem::replace(&mut *slot, Slot::Fired) {
                Slot::Pending(cb) => cb,
                Slot::Fired => return false,
            }
        };

        match cb {
            Some(cb) => cb(failure),
            None => tracing::error!(
                reason = %failure,
                "no escalation callback registered; fatal worker failure dropped"
            ),
        }
        true
    }

    #[cfg(test)]
    pub(crate) fn has_fired(&self) -> bool {
        matches!(
            *self.slot.lock().unwrap_or_else(PoisonError::into_inner),
            Slot::Fired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn counting(counter: &Arc<AtomicUsize>) -> FatalCallback {
        let counter = Arc::clone(counter);
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn fires_at_most_once() {
        let esc = Escalation::new();
        let hits = Arc::new(AtomicUsize::new(0));

        assert!(esc.register(counting(&hits)));
        assert!(esc.fire(WorkerFailure::QueueClosed));
        assert!(!esc.fire(WorkerFailure::QueueClosed));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(esc.has_fired());
    }

    #[test]
    fn register_after_fire_is_rejected() {
        let esc = Escalation::new();
        let hits = Arc::new(AtomicUsize::new(0));

        assert!(esc.fire(WorkerFailure::QueueClosed));
        assert!(!esc.register(counting(&hits)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn latest_registration_wins() {
        let esc = Escalation::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        esc.register(counting(&first));
        esc.register(counting(&second));
        esc.fire(WorkerFailure::Spawn {
            reason: "no runtime".into(),
        });

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_receives_the_failure() {
        let esc = Escalation::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);

        esc.register(Box::new(move |f| {
            *sink.lock().unwrap() = Some(f);
        }));
        esc.fire(WorkerFailure::Panicked { info: "boom".into() });

        assert_eq!(
            *seen.lock().unwrap(),
            Some(WorkerFailure::Panicked { info: "boom".into() })
        );
    }
}
