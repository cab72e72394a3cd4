//! # Example: greetings
//!
//! One dispatcher serving two kinds of traffic: numbered loop messages and
//! birthday wishes. Two producer tasks feed it concurrently; one subscriber per
//! key records and prints what it receives.
//!
//! Demonstrates how to:
//! - Route two payload variants through a single [`Dispatcher`] by key.
//! - Implement [`Handler`] on a stateful struct.
//! - Drain with `wait_idle()`, then unsubscribe and `stop()`.
//!
//! ## Flow
//! ```text
//! loop producer ─────┐
//!                    ├─► enqueue(Event, Note) ─► worker ─┬─► LoopCounter
//! birthday producer ─┘                                   └─► BirthdayCard
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=keyed_dispatch=debug cargo run --example greetings
//! ```

use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use keyed_dispatch::{Dispatcher, DispatcherConfig, Handler, HandlerError, HandlerRef};
use tracing_subscriber::EnvFilter;

const PER_PRODUCER: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Event {
    ForLoop,
    HappyBirthday,
}

#[derive(Debug)]
enum Note {
    Test { text: String, entered: Instant },
    Birthday { name: String },
}

#[derive(Default)]
struct LoopCounter {
    received: Mutex<Vec<String>>,
}

#[async_trait]
impl Handler<Note> for LoopCounter {
    fn name(&self) -> &str {
        "loop-counter"
    }

    async fn handle(&self, note: &Note) -> Result<(), HandlerError> {
        let Note::Test { text, entered } = note else {
            return Err(HandlerError::fail("expected a loop message"));
        };
        println!("received '{text}' after {:?}", entered.elapsed());
        self.received
            .lock()
            .map_err(|_| HandlerError::fail("log poisoned"))?
            .push(text.clone());
        Ok(())
    }
}

#[derive(Default)]
struct BirthdayCard {
    received: Mutex<Vec<String>>,
}

#[async_trait]
impl Handler<Note> for BirthdayCard {
    fn name(&self) -> &str {
        "birthday-card"
    }

    async fn handle(&self, note: &Note) -> Result<(), HandlerError> {
        let Note::Birthday { name } = note else {
            return Err(HandlerError::fail("expected a birthday message"));
        };
        println!("happy birthday {name}!!");
        self.received
            .lock()
            .map_err(|_| HandlerError::fail("log poisoned"))?
            .push(name.clone());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Build an inert dispatcher and wire the subscribers
    let dispatcher = Dispatcher::<Event, Note>::builder(DispatcherConfig::named("greetings"))
        .on_fatal(|failure| eprintln!("dispatcher failed: {failure}"))
        .build();

    let counter = Arc::new(LoopCounter::default());
    let card = Arc::new(BirthdayCard::default());
    let counter_ref: HandlerRef<Note> = counter.clone();
    let card_ref: HandlerRef<Note> = card.clone();

    dispatcher.subscribe(Event::ForLoop, &counter_ref);
    dispatcher.subscribe(Event::HappyBirthday, &card_ref);

    // 2. Start the worker
    dispatcher.start();

    // 3. Two concurrent producers
    let loops = {
        let d = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            for i in 0..PER_PRODUCER {
                println!("adding test message {i}");
                d.enqueue(
                    Event::ForLoop,
                    Note::Test {
                        text: format!("message number {i}"),
                        entered: Instant::now(),
                    },
                )?;
            }
            anyhow::Ok(())
        })
    };
    let birthdays = {
        let d = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            for i in 0..PER_PRODUCER {
                println!("adding birthday message {i}");
                d.enqueue(
                    Event::HappyBirthday,
                    Note::Birthday {
                        name: format!("child number {i}"),
                    },
                )?;
            }
            anyhow::Ok(())
        })
    };
    loops.await??;
    birthdays.await??;

    // 4. Let the worker drain, then tear down
    dispatcher.wait_idle().await;
    dispatcher.unsubscribe(&Event::ForLoop, &counter_ref);
    dispatcher.unsubscribe(&Event::HappyBirthday, &card_ref);
    dispatcher.stop().await;

    let loops_seen = counter.received.lock().map(|v| v.len()).unwrap_or_default();
    let cards_seen = card.received.lock().map(|v| v.len()).unwrap_or_default();
    println!("loop messages: {loops_seen}, birthday messages: {cards_seen}");
    println!("stats: {:?}", dispatcher.stats());
    Ok(())
}
