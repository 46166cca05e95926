//! Scriptable fixture states shared by the integration tests.
//!
//! A run is described by a [`Plan`]: one [`Then`] per position in the chain
//! of states, plus at most one injected [`Fault`]. Every lifecycle call is
//! written to a shared journal as `"<event> <state>"`, where a state is named
//! by its type letter and its position, e.g. `A0`, `B1`.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use waymark::{
    Controller, Driver, RequestError, RunError, State, StateError, Termination, Transit,
    Transitions,
};

pub type Journal = Arc<Mutex<Vec<String>>>;

const LETTERS: [&str; 3] = ["A", "B", "C"];

/// What a state does once it has entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Then {
    /// Request a transition to `Node<n>`.
    Transit(usize),
    /// Request a transition to a type no state declares.
    Stray,
    Exit,
    /// Request an exit from a spawned task after a short delay.
    ExitLater,
    /// Request an exit twice, reporting the rejection as a failure.
    ExitTwice,
    /// Request a transition to `Node<n>` twice, ignoring the rejection.
    TransitTwice(usize),
    /// Cancel the run's token.
    Cancel,
    Wait,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hook {
    Enter,
    Exit,
    BeforeExit,
    CreateNext,
    Dispose,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Fail,
    Panic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fault {
    pub at: usize,
    pub hook: Hook,
    pub mode: Mode,
}

#[derive(Clone, Debug)]
pub struct Plan {
    pub steps: Vec<Then>,
    pub fault: Option<Fault>,
    pub cancel: CancellationToken,
}

impl Plan {
    pub fn new(steps: Vec<Then>) -> Self {
        Self {
            steps,
            fault: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn fault(mut self, at: usize, hook: Hook, mode: Mode) -> Self {
        self.fault = Some(Fault { at, hook, mode });
        self
    }
}

/// Fixture state. Each `N` is a distinct state type.
pub struct Node<const N: usize> {
    index: usize,
    name: String,
    controller: Controller,
    plan: Arc<Plan>,
    journal: Journal,
}

pub type A = Node<0>;
pub type B = Node<1>;
pub type C = Node<2>;

/// A state type nobody declares a transition to.
pub struct Stray;

#[async_trait]
impl State for Stray {}

impl<const N: usize> Node<N> {
    fn new(index: usize, controller: Controller, plan: Arc<Plan>, journal: Journal) -> Self {
        Self {
            index,
            name: format!("{}{}", LETTERS[N], index),
            controller,
            plan,
            journal,
        }
    }

    fn log(&self, event: String) {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn trip(&self, hook: Hook) -> Result<(), StateError> {
        match self.plan.fault {
            Some(fault) if fault.at == self.index && fault.hook == hook => match fault.mode {
                Mode::Fail => Err(StateError::new(format!("{hook:?} failed in {}", self.name))),
                Mode::Panic => panic!("{hook:?} panicked in {}", self.name),
            },
            _ => Ok(()),
        }
    }

    fn then(&self) -> Then {
        self.plan.steps.get(self.index).copied().unwrap_or(Then::Wait)
    }
}

fn request_node(controller: &Controller, n: usize) -> Result<(), RequestError> {
    match n {
        0 => controller.request_transit::<A>(),
        1 => controller.request_transit::<B>(),
        _ => controller.request_transit::<C>(),
    }
}

fn rejected(e: RequestError) -> StateError {
    StateError::with_source("request rejected", e)
}

#[async_trait]
impl<const N: usize> State for Node<N> {
    fn name(&self) -> &str {
        &self.name
    }

    fn transitions(table: &mut Transitions<Self>) {
        table.allow::<A>().allow::<B>().allow::<C>();
    }

    async fn enter(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
        self.log(format!("enter {}", self.name));
        self.trip(Hook::Enter)?;

        match self.then() {
            Then::Transit(n) => request_node(&self.controller, n).map_err(rejected),
            Then::Stray => self.controller.request_transit::<Stray>().map_err(rejected),
            Then::Exit => self.controller.request_exit().map_err(rejected),
            Then::ExitTwice => {
                self.controller.request_exit().map_err(rejected)?;
                self.controller.request_exit().map_err(rejected)
            }
            Then::TransitTwice(n) => {
                request_node(&self.controller, n).map_err(rejected)?;
                let _ = request_node(&self.controller, n);
                Ok(())
            }
            Then::ExitLater => {
                let controller = self.controller.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    controller.request_exit()
                });
                Ok(())
            }
            Then::Cancel => {
                self.plan.cancel.cancel();
                Ok(())
            }
            Then::Wait => Ok(()),
        }
    }

    async fn exit(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
        self.log(format!("exit {}", self.name));
        self.trip(Hook::Exit)
    }

    async fn dispose(&mut self) {
        self.log(format!("dispose {}", self.name));
        // Disposal cannot report a business failure; only panics apply.
        let _ = self.trip(Hook::Dispose);
    }
}

#[async_trait]
impl<const N: usize, const M: usize> Transit<Node<M>> for Node<N> {
    async fn before_exit(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
        self.log(format!("before_exit {}->{}", self.name, LETTERS[M]));
        self.trip(Hook::BeforeExit)
    }

    async fn create_next(&mut self, controller: Controller) -> Result<Node<M>, StateError> {
        self.log(format!("create {}->{}", self.name, LETTERS[M]));
        self.trip(Hook::CreateNext)?;
        Ok(Node::new(
            self.index + 1,
            controller,
            Arc::clone(&self.plan),
            Arc::clone(&self.journal),
        ))
    }
}

impl<const N: usize> Drop for Node<N> {
    fn drop(&mut self) {
        self.log(format!("drop {}", self.name));
    }
}

/// A driver plus the journal its fixture states write to.
pub struct Harness {
    pub driver: Driver,
    pub journal: Journal,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_driver(Driver::new())
    }

    pub fn with_driver(driver: Driver) -> Self {
        Self {
            driver,
            journal: Journal::default(),
        }
    }

    /// Build the initial `A0` state for `plan`.
    pub fn initial(&self, plan: &Plan) -> A {
        Node::new(
            0,
            self.driver.controller(),
            Arc::new(plan.clone()),
            Arc::clone(&self.journal),
        )
    }

    pub async fn run(&self, plan: &Plan) -> Result<Termination, RunError> {
        let initial = self.initial(plan);
        self.driver.run(initial, plan.cancel.clone()).await
    }

    /// Run `plan`, turning a resumed panic into `Err(message)`.
    pub async fn run_catching(
        &self,
        plan: &Plan,
    ) -> Result<Result<Termination, RunError>, String> {
        AssertUnwindSafe(self.run(plan))
            .catch_unwind()
            .await
            .map_err(|panic| {
                panic
                    .downcast_ref::<String>()
                    .cloned()
                    .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                    .unwrap_or_default()
            })
    }

    pub fn events(&self) -> Vec<String> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e.as_str() == event)
    }
}
