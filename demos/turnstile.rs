//! Coin-Operated Turnstile
//!
//! This example drives a two-state turnstile whose states do their work in
//! background tasks and talk back to the driver through their controller.
//!
//! Key concepts:
//! - Declaring transitions with `Transit` and `State::transitions`
//! - Requesting transitions from spawned tasks
//! - Stopping background work in `dispose`
//! - Structured logs from the driver (set `RUST_LOG=debug` for more)
//!
//! Run with: cargo run --example turnstile

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use waymark::{Controller, DriverBuilder, State, StateError, Transit, Transitions};

const PASSES: usize = 3;

struct Locked {
    controller: Controller,
    passes: usize,
    work: CancellationToken,
}

struct Unlocked {
    controller: Controller,
    passes: usize,
    work: CancellationToken,
}

fn rejected(e: waymark::RequestError) -> StateError {
    StateError::with_source("request rejected", e)
}

#[async_trait]
impl State for Locked {
    fn name(&self) -> &str {
        "Locked"
    }

    fn transitions(table: &mut Transitions<Self>) {
        table.allow::<Unlocked>();
    }

    async fn enter(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
        if self.passes == PASSES {
            info!(passes = self.passes, "closing for the day");
            return self.controller.request_exit().map_err(rejected);
        }

        let controller = self.controller.clone();
        let work = self.work.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = work.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(200)) => {
                    info!("coin inserted");
                    let _ = controller.request_transit::<Unlocked>();
                }
            }
        });
        Ok(())
    }

    async fn dispose(&mut self) {
        self.work.cancel();
    }
}

#[async_trait]
impl Transit<Unlocked> for Locked {
    async fn create_next(&mut self, controller: Controller) -> Result<Unlocked, StateError> {
        Ok(Unlocked {
            controller,
            passes: self.passes,
            work: CancellationToken::new(),
        })
    }
}

#[async_trait]
impl State for Unlocked {
    fn name(&self) -> &str {
        "Unlocked"
    }

    fn transitions(table: &mut Transitions<Self>) {
        table.allow::<Locked>();
    }

    async fn enter(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
        let controller = self.controller.clone();
        let work = self.work.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = work.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(100)) => {
                    info!("arm pushed");
                    let _ = controller.request_transit::<Locked>();
                }
            }
        });
        Ok(())
    }

    async fn exit(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
        info!(passes = self.passes + 1, "visitor passed");
        Ok(())
    }

    async fn dispose(&mut self) {
        self.work.cancel();
    }
}

#[async_trait]
impl Transit<Locked> for Unlocked {
    async fn create_next(&mut self, controller: Controller) -> Result<Locked, StateError> {
        Ok(Locked {
            controller,
            passes: self.passes + 1,
            work: CancellationToken::new(),
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Turnstile ===\n");

    let driver = DriverBuilder::new()
        .name("turnstile")
        .history_capacity(16)
        .build()
        .expect("valid driver settings");

    let cancel = CancellationToken::new();
    let watchdog = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        watchdog.cancel();
    });

    let initial = Locked {
        controller: driver.controller(),
        passes: 0,
        work: CancellationToken::new(),
    };

    match driver.run(initial, cancel).await {
        Ok(termination) => println!("\nRun ended: {termination:?}"),
        Err(err) => println!("\nRun failed: {err}"),
    }

    if let Some(history) = driver.history() {
        println!("Path: {}", history.path().join(" -> "));
        if let Some(duration) = history.duration() {
            println!("First to last transition: {duration:?}");
        }
    }

    println!("\n=== Example Complete ===");
}
