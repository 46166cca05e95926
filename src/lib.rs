//! Waymark: an async finite-state-machine driver
//!
//! Waymark sequences user-defined states, mediates the transitions they ask
//! for, and guarantees enter/exit/dispose ordering even when a run is
//! cancelled, fails, or panics.
//!
//! # Core Concepts
//!
//! - **State**: a unit of behavior implementing the [`State`] trait
//! - **Transit**: a declared capability of one state type to build another
//! - **Controller**: the handle a state uses to request a transition or exit
//! - **Driver**: the loop that owns the current state and reacts to requests
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use waymark::{Controller, Driver, State, StateError, Termination, Transit, Transitions};
//!
//! struct Boot {
//!     controller: Controller,
//! }
//!
//! struct Serve {
//!     controller: Controller,
//! }
//!
//! fn rejected(e: waymark::RequestError) -> StateError {
//!     StateError::with_source("request rejected", e)
//! }
//!
//! #[async_trait]
//! impl State for Boot {
//!     fn transitions(table: &mut Transitions<Self>) {
//!         table.allow::<Serve>();
//!     }
//!
//!     async fn enter(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
//!         self.controller.request_transit::<Serve>().map_err(rejected)
//!     }
//! }
//!
//! #[async_trait]
//! impl Transit<Serve> for Boot {
//!     async fn create_next(&mut self, controller: Controller) -> Result<Serve, StateError> {
//!         Ok(Serve { controller })
//!     }
//! }
//!
//! #[async_trait]
//! impl State for Serve {
//!     async fn enter(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
//!         self.controller.request_exit().map_err(rejected)
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let driver = Driver::new();
//! let boot = Boot { controller: driver.controller() };
//!
//! let outcome = driver.run(boot, CancellationToken::new()).await;
//! assert_eq!(outcome.unwrap(), Termination::Exited);
//! assert_eq!(driver.history().unwrap().transitions().len(), 1);
//! # }
//! ```

pub mod builder;
pub mod core;
pub mod driver;

// Re-export commonly used types
pub use crate::builder::{BuildError, DriverBuilder};
pub use crate::core::{RunHistory, State, StateError, Termination, Transit, Transitions};
pub use crate::driver::{Controller, Driver, RequestError, RunError, Stage};
