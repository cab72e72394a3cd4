//! # Closure-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a synchronous closure `F: Fn(&M) -> Result<(), HandlerError>`.
//! Use it for the common case of a short callback; implement [`Handler`]
//! directly when the handler needs to await.
//!
//! ## Example
//! ```rust
//! use keyed_dispatch::{HandlerFn, HandlerRef};
//!
//! let h: HandlerRef<String> = HandlerFn::arc("printer", |msg: &String| {
//!     println!("{msg}");
//!     Ok(())
//! });
//!
//! assert_eq!(h.name(), "printer");
//! ```

use std::{borrow::Cow, sync::Arc};

use async_trait::async_trait;

use crate::{
    envelope::Message,
    error::HandlerError,
    handlers::handler::{Handler, HandlerRef},
};

/// Function-backed handler implementation.
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle (`Arc<dyn Handler<M>>`).
    ///
    /// Keep the returned handle: it is both what keeps the subscription alive
    /// and what [`Dispatcher::unsubscribe`](crate::Dispatcher::unsubscribe) matches on.
    pub fn arc<M>(name: impl Into<Cow<'static, str>>, f: F) -> HandlerRef<M>
    where
        M: Message,
        F: Fn(&M) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

impl<F> std::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFn").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<M, F> Handler<M> for HandlerFn<F>
where
    M: Message,
    F: Fn(&M) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, payload: &M) -> Result<(), HandlerError> {
        (self.f)(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn closure_sees_payload_and_result_is_forwarded() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let h: HandlerRef<usize> = HandlerFn::arc("adder", move |n: &usize| {
            counter.fetch_add(*n, Ordering::SeqCst);
            if *n > 10 {
                return Err(HandlerError::fail("too big"));
            }
            Ok(())
        });

        assert!(h.handle(&3).await.is_ok());
        assert_eq!(h.handle(&20).await, Err(HandlerError::fail("too big")));
        assert_eq!(seen.load(Ordering::SeqCst), 23);
    }

    #[test]
    fn name_is_kept() {
        let h: HandlerRef<()> = HandlerFn::arc("noop", |_: &()| Ok(()));
        assert_eq!(h.name(), "noop");
    }
}
