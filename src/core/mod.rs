//! Collaborator-facing contracts.
//!
//! This module holds what user code implements or inspects:
//! - The `State` trait with default enter/exit/dispose hooks
//! - `Transit` declarations and the per-type transition table
//! - Business failures (`StateError`) and per-run history
//!
//! Nothing here drives a machine; that is the job of [`crate::driver`].

mod error;
mod history;
mod state;
mod transition;

pub use error::{BoxError, StateError};
pub use history::{RunEnd, RunHistory, Termination, TransitionRecord};
pub use state::State;
pub use transition::{Target, Transit, Transitions};
