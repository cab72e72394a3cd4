//! # Example: escalation
//!
//! Shows the one-shot fatal callback and explicit runtime selection.
//!
//! 1. A dispatcher built outside any runtime cannot spawn its worker: `start()`
//!    fires the escalation callback synchronously and the dispatcher is stopped.
//! 2. The same setup with `.runtime(handle)` starts fine from plain sync code,
//!    and a failing handler is only logged, never escalated.
//!
//! ## Flow
//! ```text
//! build(auto_start) ─► start()
//!     ├─ no runtime ─► on_fatal(Spawn) ─► Stopped
//!     └─ runtime    ─► Running ─► handler Err ─► warn log, keep going
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example escalation
//! ```

use std::sync::mpsc;

use keyed_dispatch::{
    Dispatcher, DispatcherConfig, DispatcherState, HandlerError, HandlerFn, HandlerRef,
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. No runtime: escalation fires from inside build()
    let (fatal_tx, fatal_rx) = mpsc::channel();
    let mut cfg = DispatcherConfig::named("orphan");
    cfg.auto_start = true;
    let orphan = Dispatcher::<u8, String>::builder(cfg)
        .on_fatal(move |failure| {
            let _ = fatal_tx.send(failure);
        })
        .build();

    let failure = fatal_rx.recv()?;
    println!("orphan escalated: {failure} [{}]", failure.as_label());
    assert_eq!(orphan.state(), DispatcherState::Stopped);
    if let Err(err) = orphan.enqueue(1, "too late".into()) {
        println!("orphan rejects work: {err}");
    }

    // 2. Explicit runtime handle
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    let mut cfg = DispatcherConfig::named("hosted");
    cfg.auto_start = true;
    let hosted = Dispatcher::<u8, String>::builder(cfg)
        .runtime(rt.handle().clone())
        .on_fatal(|failure| eprintln!("unexpected escalation: {failure}"))
        .build();

    let picky: HandlerRef<String> = HandlerFn::arc("picky", |msg: &String| {
        if msg.is_empty() {
            return Err(HandlerError::fail("empty message"));
        }
        println!("picky got '{msg}'");
        Ok(())
    });
    hosted.subscribe(1, &picky);

    for msg in ["first", "", "third"] {
        hosted.enqueue(1, msg.to_string())?;
    }

    rt.block_on(async {
        hosted.wait_idle().await;
        hosted.stop().await;
    });
    println!("hosted stats: {:?}", hosted.stats());
    Ok(())
}
