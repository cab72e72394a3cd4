//! # Subscription registry: routing key → ordered handler list.
//!
//! ## Rules
//! - Insertion order is dispatch order.
//! - Identity is the handler's `Arc` allocation; re-subscribing is a no-op.
//! - Entries are `Weak`: the registry never keeps a handler alive. Dead entries
//!   are skipped by [`Registry::lookup`] and pruned on the next write.
//! - A key whose list becomes empty is removed.
//! - [`Registry::lookup`] returns an owned snapshot; no lock is held while the
//!   worker invokes handlers, so handlers may subscribe/unsubscribe freely.
//!
//! ```text
//! subscribe(K1, H1)   ─► { K1: [H1] }
//! subscribe(K1, H2)   ─► { K1: [H1, H2] }
//! subscribe(K1, H1)   ─► { K1: [H1, H2] }        (no-op)
//! unsubscribe(K1, H1) ─► { K1: [H2] }
//! unsubscribe(K1, H2) ─► { }                     (pruned)
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, Weak},
};

use crate::{
    envelope::{Message, RoutingKey},
    handlers::{Handler, HandlerRef},
};

type Entry<M> = Weak<dyn Handler<M>>;

/// Thread-safe map of routing keys to handler lists.
pub(crate) struct Registry<K, M: Message> {
    routes: RwLock<HashMap<K, Vec<Entry<M>>>>,
}

impl<K: RoutingKey, M: Message> Registry<K, M> {
    pub(crate) fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Appends `handler` to the list for `key` unless already present.
    ///
    /// Returns `true` if the handler was added.
    pub(crate) fn subscribe(&self, key: K, handler: &HandlerRef<M>) -> bool {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let list = routes.entry(key).or_default();

        // Drop dead entries first: a freed allocation may be reused by `handler`.
        list.retain(|w| w.strong_count() > 0);
        if list.iter().any(|w| same_handler(w, handler)) {
            return false;
        }
        list.push(Arc::downgrade(handler));
        true
    }

    /// Removes `handler` from the list for `key`.
    ///
    /// Returns `true` if something was removed; absent key or handler is a no-op.
    pub(crate) fn unsubscribe(&self, key: &K, handler: &HandlerRef<M>) -> bool {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = routes.get_mut(key) else {
            return false;
        };

        let before = list.len();
        list.retain(|w| w.strong_count() > 0 && !same_handler(w, handler));
        let removed = list.len() < before;

        if list.is_empty() {
            routes.remove(key);
        }
        removed
    }

    /// Returns the live handlers for `key`, in registration order.
    ///
    /// The result is an owned snapshot; later registry changes do not affect it.
    pub(crate) fn lookup(&self, key: &K) -> Vec<HandlerRef<M>> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes
            .get(key)
            .map(|list| list.iter().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    /// Number of live handlers for `key`.
    pub(crate) fn count(&self, key: &K) -> usize {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes
            .get(key)
            .map(|list| list.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Keys that currently have at least one live handler.
    pub(crate) fn keys(&self) -> Vec<K> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes
            .iter()
            .filter(|(_, list)| list.iter().any(|w| w.strong_count() > 0))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

fn same_handler<M: Message>(entry: &Entry<M>, handler: &HandlerRef<M>) -> bool {
    entry.as_ptr() as *const () == Arc::as_ptr(handler) as *const ()
}
