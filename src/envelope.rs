//! # Message envelope and the bounds on keys and payloads.
//!
//! An [`Envelope`] pairs a routing key with a payload. Keys decide which
//! handlers see the payload; equality and hashing are by value.
//!
//! ## Example
//! ```rust
//! use keyed_dispatch::Envelope;
//!
//! let env = Envelope::new("greeting", String::from("hello"));
//! assert_eq!(*env.key(), "greeting");
//! assert_eq!(env.payload(), "hello");
//! ```

use std::{fmt::Debug, hash::Hash};

/// Bounds for routing keys.
///
/// Blanket-implemented; any `Eq + Hash + Clone + Debug` value that can cross
/// threads qualifies (`&'static str`, enums, small structs, ...).
pub trait RoutingKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> RoutingKey for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// Bounds for payloads.
///
/// Use `Option<T>` as the message type when a payload may be absent.
pub trait Message: Send + Sync + 'static {}

impl<T> Message for T where T: Send + Sync + 'static {}

/// Immutable `(key, payload)` pair submitted to a dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope<K, M> {
    key: K,
    payload: M,
}

impl<K, M> Envelope<K, M> {
    /// Creates a new envelope.
    pub fn new(key: K, payload: M) -> Self {
        Self { key, payload }
    }

    /// Routing key.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Payload.
    #[inline]
    pub fn payload(&self) -> &M {
        &self.payload
    }

    /// Splits the envelope into its parts.
    pub fn into_parts(self) -> (K, M) {
        (self.key, self.payload)
    }
}

impl<K, M> From<(K, M)> for Envelope<K, M> {
    fn from((key, payload): (K, M)) -> Self {
        Self::new(key, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    enum Topic {
        Orders,
    }

    #[test]
    fn optional_payload_is_just_a_message_type() {
        let env: Envelope<Topic, Option<u32>> = Envelope::new(Topic::Orders, None);
        assert_eq!(env.key(), &Topic::Orders);
        assert!(env.payload().is_none());
    }

    #[test]
    fn from_tuple() {
        let env: Envelope<&str, i32> = ("k", 7).into();
        assert_eq!(env.into_parts(), ("k", 7));
    }
}
