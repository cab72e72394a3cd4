//! # Dispatcher: keyed fan-out over a single worker task.
//!
//! The [`Dispatcher`] owns the dispatch queue and the subscription registry,
//! spawns one worker on start, and escalates fatal worker failures through a
//! one-shot callback.
//!
//! ## Lifecycle
//! ```text
//!            start()                    stop() / fatal worker exit
//! Created ───────────► Running ─────────────────────────────────► Stopped
//!    │                                                               ▲
//!    └── start() with no/dead runtime ─► escalation(Spawn) ──────────┘
//!
//! runtime drops a running worker ─► escalation(Aborted) ─► Stopped
//! start() on Running/Stopped  ─► no-op (logged)
//! stop()  on Created/Stopped  ─► no-op (logged)
//! ```
//!
//! ## Stop sequence
//! ```text
//! stop()
//!   ├─► token.cancel()     (worker exits at the next dequeue)
//!   ├─► queue.close()      (enqueue now fails with EnqueueError::Closed)
//!   └─► join worker        (concurrent stop() callers wait on `exited`)
//! ```
//!
//! ## Rules
//! - `subscribe`/`unsubscribe` work in every state and only touch the registry.
//! - `enqueue` before `start` buffers; after `stop` it fails fast.
//! - Messages still queued at stop are discarded (at-most-once delivery); call
//!   [`Dispatcher::wait_idle`] first to let the queue drain.
//! - When `stop()` returns the worker has exited; no handler starts afterwards.
//!
//! ## Example
//! ```rust
//! use keyed_dispatch::{Dispatcher, DispatcherConfig, HandlerFn, HandlerRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::<&str, String>::builder(DispatcherConfig::named("greetings"))
//!         .on_fatal(|failure| eprintln!("dispatcher died: {failure}"))
//!         .build();
//!
//!     let greeter: HandlerRef<String> = HandlerFn::arc("greeter", |msg: &String| {
//!         println!("hello, {msg}");
//!         Ok(())
//!     });
//!     dispatcher.subscribe("greet", &greeter);
//!
//!     dispatcher.start();
//!     dispatcher.enqueue("greet", "world".to_string())?;
//!     dispatcher.wait_idle().await;
//!     dispatcher.stop().await;
//!     Ok(())
//! }
//! ```

use std::{
    borrow::Cow,
    marker::PhantomData,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::{runtime::Handle, sync::Notify, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{
    config::DispatcherConfig,
    core::{
        escalation::{Escalation, FatalCallback},
        queue::{self, DispatchQueue, QueueReceiver},
        registry::Registry,
        stats::{Counters, DispatcherStats},
        worker::Worker,
    },
    envelope::{Envelope, Message, RoutingKey},
    error::{EnqueueError, WorkerFailure},
    handlers::HandlerRef,
};

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Built, worker not started. Messages are buffered.
    Created,
    /// Worker is draining the queue.
    Running,
    /// Worker has exited (stopped or failed). Terminal.
    Stopped,
}

/// State shared between the dispatcher handle and its worker.
pub(crate) struct Shared<K: RoutingKey, M: Message> {
    pub(crate) name: Cow<'static, str>,
    pub(crate) registry: Registry<K, M>,
    pub(crate) queue: DispatchQueue<Envelope<K, M>>,
    pub(crate) counters: Counters,
    pub(crate) escalation: Escalation,
    /// Signalled whenever the queue drains to zero or the worker exits.
    pub(crate) idle: Notify,
}

enum Lifecycle<K: RoutingKey, M: Message> {
    Created {
        rx: QueueReceiver<Envelope<K, M>>,
    },
    Running {
        /// `None` while `start()` is still spawning.
        join: Option<JoinHandle<()>>,
        exited: CancellationToken,
    },
    Stopping {
        exited: CancellationToken,
    },
    Stopped,
}

/// What a `stop()` caller does once the lifecycle lock is released.
enum StopAction {
    Join(JoinHandle<()>),
    Wait(CancellationToken),
    Nothing,
}

impl<K: RoutingKey, M: Message> Lifecycle<K, M> {
    fn state(&self) -> DispatcherState {
        match self {
            Lifecycle::Created { .. } => DispatcherState::Created,
            Lifecycle::Running { exited, .. } | Lifecycle::Stopping { exited } => {
                if exited.is_cancelled() {
                    DispatcherState::Stopped
                } else {
                    DispatcherState::Running
                }
            }
            Lifecycle::Stopped => DispatcherState::Stopped,
        }
    }
}

/// In-process keyed message dispatcher.
///
/// Generic over the routing key `K` and payload type `M`. See the
/// [module documentation](self) for lifecycle rules.
pub struct Dispatcher<K: RoutingKey, M: Message> {
    shared: Arc<Shared<K, M>>,
    lifecycle: Mutex<Lifecycle<K, M>>,
    token: CancellationToken,
    runtime: Option<Handle>,
    depth_warning: Option<usize>,
}

impl<K: RoutingKey, M: Message> Dispatcher<K, M> {
    /// Creates an inert dispatcher. `cfg.auto_start` is ignored here.
    pub fn new(cfg: DispatcherConfig) -> Self {
        let (queue, rx) = queue::channel();
        Self {
            depth_warning: cfg.depth_warning_threshold(),
            shared: Arc::new(Shared {
                name: cfg.name,
                registry: Registry::new(),
                queue,
                counters: Counters::default(),
                escalation: Escalation::new(),
                idle: Notify::new(),
            }),
            lifecycle: Mutex::new(Lifecycle::Created { rx }),
            token: CancellationToken::new(),
            runtime: None,
        }
    }

    /// Starts a builder.
    pub fn builder(cfg: DispatcherConfig) -> DispatcherBuilder<K, M> {
        DispatcherBuilder::new(cfg)
    }

    /// Instance name from the configuration.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Registers `handler` for `key`.
    ///
    /// Returns `false` if this exact handler was already registered for `key`.
    pub fn subscribe(&self, key: K, handler: &HandlerRef<M>) -> bool {
        let added = self.shared.registry.subscribe(key.clone(), handler);
        tracing::debug!(
            dispatcher = %self.shared.name,
            key = ?key,
            handler = handler.name(),
            added,
            "subscribe"
        );
        added
    }

    /// Removes `handler` from `key`.
    ///
    /// Returns `false` if it was not registered. Takes effect from the next
    /// dequeued message.
    pub fn unsubscribe(&self, key: &K, handler: &HandlerRef<M>) -> bool {
        let removed = self.shared.registry.unsubscribe(key, handler);
        tracing::debug!(
            dispatcher = %self.shared.name,
            key = ?key,
            handler = handler.name(),
            removed,
            "unsubscribe"
        );
        removed
    }

    /// Submits one message.
    ///
    /// Never blocks. Fails only once the dispatcher has been stopped or has failed.
    pub fn enqueue(&self, key: K, payload: M) -> Result<(), EnqueueError> {
        self.enqueue_envelope(Envelope::new(key, payload))
    }

    /// Submits a prebuilt envelope.
    pub fn enqueue_envelope(&self, envelope: Envelope<K, M>) -> Result<(), EnqueueError> {
        match self.shared.queue.push(envelope) {
            Ok(depth) => {
                self.shared.counters.enqueued();
                if let Some(step) = self.depth_warning {
                    if depth % step == 0 {
                        tracing::warn!(
                            dispatcher = %self.shared.name,
                            depth,
                            "dispatch queue depth reached warning step"
                        );
                    }
                }
                Ok(())
            }
            Err(rejected) => {
                tracing::debug!(
                    dispatcher = %self.shared.name,
                    key = ?rejected.key(),
                    "enqueue rejected: dispatcher closed"
                );
                Err(EnqueueError::Closed {
                    dispatcher: self.shared.name.clone(),
                })
            }
        }
    }

    /// Registers the error-escalation callback.
    ///
    /// The callback runs at most once per dispatcher, on the worker task (queue
    /// fault, loop panic) or synchronously inside [`start`](Self::start) (spawn
    /// failure). A later registration replaces an earlier one. Returns `false`
    /// (and drops `callback`) if escalation already happened.
    pub fn on_fatal<F>(&self, callback: F) -> bool
    where
        F: FnOnce(WorkerFailure) + Send + 'static,
    {
        let accepted = self.shared.escalation.register(Box::new(callback));
        if !accepted {
            tracing::warn!(
                dispatcher = %self.shared.name,
                "escalation already fired; callback dropped"
            );
        }
        accepted
    }

    /// Spawns the worker.
    ///
    /// Uses the runtime given to the builder, else the current one. Returns
    /// `true` if this call spawned a worker that is still alive.
    ///
    /// If the worker cannot run (no runtime, or a runtime that has already
    /// shut down) the escalation callback fires before this returns and the
    /// dispatcher becomes [`Stopped`](DispatcherState::Stopped).
    pub fn start(&self) -> bool {
        let exited = CancellationToken::new();
        let (handle, rx) = {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            let rx = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Created { rx } => rx,
                other => {
                    let state = other.state();
                    *lifecycle = other;
                    tracing::info!(
                        dispatcher = %self.shared.name,
                        ?state,
                        "start ignored: worker already started"
                    );
                    return false;
                }
            };

            let resolved = match self.runtime.clone() {
                Some(handle) => Ok(handle),
                None => Handle::try_current(),
            };
            match resolved {
                Ok(handle) => {
                    *lifecycle = Lifecycle::Running {
                        join: None,
                        exited: exited.clone(),
                    };
                    (handle, rx)
                }
                Err(err) => {
                    drop(lifecycle);
                    self.fail_to_start(rx, err.to_string());
                    return false;
                }
            }
        };

        // Spawned without the lifecycle lock: a runtime that is shutting down
        // drops the worker inside `spawn`, which runs its exit path here.
        let worker = Worker::new(Arc::clone(&self.shared), rx, &exited);
        let span = tracing::info_span!("dispatcher", name = %self.shared.name);
        let join = handle.spawn(worker.run(self.token.clone()).instrument(span));

        {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            if let Lifecycle::Running { join: slot @ None, .. } = &mut *lifecycle {
                *slot = Some(join);
            }
        }

        if exited.is_cancelled() {
            tracing::warn!(
                dispatcher = %self.shared.name,
                "worker exited before start returned"
            );
            return false;
        }
        true
    }

    /// No runtime to spawn on: close everything and escalate synchronously.
    fn fail_to_start(&self, mut rx: QueueReceiver<Envelope<K, M>>, reason: String) {
        self.token.cancel();
        self.shared.queue.close();

        let discarded = rx.discard_pending();
        if discarded > 0 {
            self.shared.counters.discarded(discarded);
        }
        self.shared.idle.notify_waiters();

        let failure = WorkerFailure::Spawn { reason };
        tracing::error!(
            dispatcher = %self.shared.name,
            reason = %failure,
            label = failure.as_label(),
            "worker failed to start; escalating"
        );
        self.shared.escalation.fire(failure);
    }

    /// Stops the worker and waits until it has exited.
    ///
    /// The message being dispatched (if any) is finished; messages still queued
    /// are discarded. Safe to call repeatedly and concurrently: every caller
    /// returns only after the worker is gone. No-op before `start`.
    pub async fn stop(&self) {
        let action = {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running { join, exited } => {
                    *lifecycle = Lifecycle::Stopping {
                        exited: exited.clone(),
                    };
                    self.token.cancel();
                    self.shared.queue.close();
                    match join {
                        Some(join) => StopAction::Join(join),
                        // `start()` is mid-spawn and will detach the handle.
                        None => StopAction::Wait(exited),
                    }
                }
                Lifecycle::Stopping { exited } => {
                    *lifecycle = Lifecycle::Stopping {
                        exited: exited.clone(),
                    };
                    StopAction::Wait(exited)
                }
                Lifecycle::Created { rx } => {
                    *lifecycle = Lifecycle::Created { rx };
                    tracing::info!(
                        dispatcher = %self.shared.name,
                        "stop ignored: dispatcher not started"
                    );
                    StopAction::Nothing
                }
                Lifecycle::Stopped => {
                    tracing::debug!(dispatcher = %self.shared.name, "stop ignored: already stopped");
                    StopAction::Nothing
                }
            }
        };

        match action {
            StopAction::Join(join) => {
                if let Err(err) = join.await {
                    tracing::error!(
                        dispatcher = %self.shared.name,
                        reason = %err,
                        "worker task did not complete cleanly"
                    );
                }
                *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner) =
                    Lifecycle::Stopped;
                tracing::info!(
                    dispatcher = %self.shared.name,
                    stats = ?self.stats(),
                    "dispatcher stopped"
                );
            }
            StopAction::Wait(exited) => exited.cancelled().await,
            StopAction::Nothing => {}
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DispatcherState {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
    }

    /// `true` while the worker is alive.
    pub fn is_running(&self) -> bool {
        self.state() == DispatcherState::Running
    }

    /// Messages accepted but not yet fully dispatched, including the one in
    /// flight.
    pub fn pending(&self) -> usize {
        self.shared.queue.depth()
    }

    /// Waits until every accepted message has been dispatched.
    ///
    /// Returns immediately when nothing is pending. Before `start` this waits
    /// for the worker to come up and drain the buffer; once the dispatcher is
    /// stopped nothing is pending, so it returns. Messages enqueued while
    /// waiting extend the wait.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.shared.queue.depth() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Counter snapshot.
    pub fn stats(&self) -> DispatcherStats {
        self.shared.counters.snapshot()
    }

    /// Live handlers registered for `key`.
    pub fn subscriber_count(&self, key: &K) -> usize {
        self.shared.registry.count(key)
    }

    /// Keys with at least one live handler (unordered).
    pub fn keys(&self) -> Vec<K> {
        self.shared.registry.keys()
    }
}

impl<K: RoutingKey, M: Message> Drop for Dispatcher<K, M> {
    fn drop(&mut self) {
        // Signal only; joining is `stop()`'s job.
        self.token.cancel();
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder<K: RoutingKey, M: Message> {
    cfg: DispatcherConfig,
    runtime: Option<Handle>,
    on_fatal: Option<FatalCallback>,
    _types: PhantomData<fn() -> (K, M)>,
}

impl<K: RoutingKey, M: Message> DispatcherBuilder<K, M> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: DispatcherConfig) -> Self {
        Self {
            cfg,
            runtime: None,
            on_fatal: None,
            _types: PhantomData,
        }
    }

    /// Spawns the worker on `handle` instead of the ambient runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Sets the error-escalation callback (see [`Dispatcher::on_fatal`]).
    pub fn on_fatal<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(WorkerFailure) + Send + 'static,
    {
        self.on_fatal = Some(Box::new(callback));
        self
    }

    /// Builds the dispatcher.
    ///
    /// If `cfg.auto_start` is set the worker is started here, after the
    /// escalation callback is in place.
    pub fn build(self) -> Arc<Dispatcher<K, M>> {
        let auto_start = self.cfg.auto_start;
        let mut dispatcher = Dispatcher::new(self.cfg);
        dispatcher.runtime = self.runtime;
        if let Some(cb) = self.on_fatal {
            dispatcher.shared.escalation.register(cb);
        }
        if auto_start {
            dispatcher.start();
        }
        Arc::new(dispatcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerFn;
    use std::{
        hash::{Hash, Hasher},
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use tokio::sync::oneshot;

    fn counter(name: &'static str, hits: &Arc<AtomicUsize>) -> HandlerRef<u32> {
        let hits = Arc::clone(hits);
        HandlerFn::arc(name, move |_: &u32| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn fatal_channel<K: RoutingKey, M: Message>(
        d: &Dispatcher<K, M>,
    ) -> oneshot::Receiver<WorkerFailure> {
        let (tx, rx) = oneshot::channel();
        d.on_fatal(move |f| {
            let _ = tx.send(f);
        });
        rx
    }

    #[test]
    fn start_without_runtime_escalates_and_closes() {
        let d: Dispatcher<&str, u32> = Dispatcher::new(DispatcherConfig::named("no-rt"));
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        d.on_fatal(move |f| *sink.lock().unwrap() = Some(f));

        assert!(!d.start());
        assert!(matches!(
            seen.lock().unwrap().as_ref(),
            Some(WorkerFailure::Spawn { .. })
        ));
        assert_eq!(d.state(), DispatcherState::Stopped);
        assert!(d.enqueue("k", 1).is_err());
        assert!(!d.on_fatal(|_| {}));
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let d: Dispatcher<&str, u32> = Dispatcher::new(DispatcherConfig::default());
        assert_eq!(d.state(), DispatcherState::Created);

        d.stop().await;
        assert_eq!(d.state(), DispatcherState::Created);

        assert!(d.start());
        assert!(!d.start());
        assert!(d.is_running());

        d.stop().await;
        assert_eq!(d.state(), DispatcherState::Stopped);
        d.stop().await;
        assert!(!d.start());
        assert_eq!(d.state(), DispatcherState::Stopped);
    }

    #[tokio::test]
    async fn messages_enqueued_before_start_are_buffered() {
        let d: Dispatcher<&str, u32> = Dispatcher::new(DispatcherConfig::default());
        let hits = Arc::new(AtomicUsize::new(0));
        let h = counter("h", &hits);
        d.subscribe("k", &h);

        d.enqueue("k", 1).unwrap();
        d.enqueue("k", 2).unwrap();
        assert_eq!(d.pending(), 2);

        d.start();
        tokio::time::timeout(Duration::from_secs(5), d.wait_idle())
            .await
            .expect("buffered messages delivered");
        d.stop().await;

        assert_eq!(d.pending(), 0);
        assert_eq!(d.stats().delivered, 2);
    }

    #[tokio::test]
    async fn enqueue_after_stop_fails_fast() {
        let d: Dispatcher<&str, u32> = Dispatcher::new(DispatcherConfig::named("closed"));
        d.start();
        d.stop().await;

        assert_eq!(
            d.enqueue("k", 1),
            Err(EnqueueError::Closed {
                dispatcher: "closed".into()
            })
        );
        assert_eq!(d.stats().enqueued, 0);
    }

    #[tokio::test]
    async fn queue_fault_escalates_once() {
        let d: Dispatcher<&str, u32> = Dispatcher::new(DispatcherConfig::default());
        let fatal = fatal_channel(&d);
        d.start();

        // Simulate a queue fault: sender gone while the worker still drains.
        d.shared.queue.close();

        let failure = tokio::time::timeout(Duration::from_secs(5), fatal)
            .await
            .expect("escalation in time")
            .expect("callback fired");
        assert_eq!(failure, WorkerFailure::QueueClosed);

        d.stop().await;
        assert_eq!(d.state(), DispatcherState::Stopped);
        assert!(d.shared.escalation.has_fired());
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Touchy(bool);

    impl Hash for Touchy {
        fn hash<H: Hasher>(&self, state: &mut H) {
            assert!(!self.0, "poisoned key hashed");
            0u8.hash(state);
        }
    }

    #[tokio::test]
    async fn panic_in_worker_loop_escalates() {
        let d: Dispatcher<Touchy, u32> = Dispatcher::new(DispatcherConfig::default());
        let hits = Arc::new(AtomicUsize::new(0));
        let h = counter("h", &hits);
        d.subscribe(Touchy(false), &h);
        let fatal = fatal_channel(&d);
        d.start();

        d.enqueue(Touchy(true), 1).unwrap();

        let failure = tokio::time::timeout(Duration::from_secs(5), fatal)
            .await
            .expect("escalation in time")
            .expect("callback fired");
        assert!(matches!(failure, WorkerFailure::Panicked { ref info } if info.contains("poisoned key")));
        assert!(d.enqueue(Touchy(false), 2).is_err());
        tokio::time::timeout(Duration::from_secs(5), d.wait_idle())
            .await
            .expect("in-flight message released after panic");

        d.stop().await;
        assert_eq!(d.state(), DispatcherState::Stopped);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_stops_all_wait_for_exit() {
        let d = Dispatcher::<&str, u32>::builder(DispatcherConfig::default()).build();
        let (entered_tx, entered_rx) = oneshot::channel::<()>();
        let entered_tx = Mutex::new(Some(entered_tx));
        let slow: HandlerRef<u32> = HandlerFn::arc("slow", move |_: &u32| {
            if let Some(tx) = entered_tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
            std::thread::sleep(Duration::from_millis(50));
            Ok(())
        });
        d.subscribe("k", &slow);
        d.start();
        d.enqueue("k", 1).unwrap();
        entered_rx.await.unwrap();

        let (a, b) = (Arc::clone(&d), Arc::clone(&d));
        let s1 = tokio::spawn(async move {
            a.stop().await;
            a.state()
        });
        let s2 = tokio::spawn(async move {
            b.stop().await;
            b.state()
        });

        assert_eq!(s1.await.unwrap(), DispatcherState::Stopped);
        assert_eq!(s2.await.unwrap(), DispatcherState::Stopped);
        assert_eq!(d.stats().delivered, 1);
    }

    #[tokio::test]
    async fn builder_auto_start_and_runtime() {
        let mut cfg = DispatcherConfig::named("auto");
        cfg.auto_start = true;
        let d = Dispatcher::<&str, u32>::builder(cfg)
            .runtime(Handle::current())
            .build();

        assert!(d.is_running());
        assert_eq!(d.name(), "auto");
        d.stop().await;
    }

    #[tokio::test]
    async fn depth_warning_does_not_affect_delivery() {
        let mut cfg = DispatcherConfig::default();
        cfg.depth_warning = 2;
        let d: Dispatcher<&str, u32> = Dispatcher::new(cfg);
        for i in 0..5 {
            d.enqueue("k", i).unwrap();
        }
        assert_eq!(d.pending(), 5);
        assert_eq!(d.stats().enqueued, 5);
    }

    #[test]
    fn spawn_failure_discards_buffered_messages() {
        let d: Dispatcher<&str, u32> = Dispatcher::new(DispatcherConfig::default());
        d.enqueue("k", 1).unwrap();
        d.enqueue("k", 2).unwrap();

        assert!(!d.start());
        assert_eq!(d.pending(), 0);
        assert_eq!(d.stats().discarded, 2);
    }

    #[tokio::test]
    async fn wait_idle_returns_once_drained() {
        let d: Dispatcher<&str, u32> = Dispatcher::new(DispatcherConfig::default());
        d.wait_idle().await;

        let hits = Arc::new(AtomicUsize::new(0));
        let h = counter("h", &hits);
        d.subscribe("k", &h);
        d.start();
        for i in 0..50 {
            d.enqueue("k", i).unwrap();
        }

        tokio::time::timeout(Duration::from_secs(5), d.wait_idle())
            .await
            .expect("queue drained");
        assert_eq!(hits.load(Ordering::SeqCst), 50);
        assert_eq!(d.pending(), 0);
        d.stop().await;
    }
}
