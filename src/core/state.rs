//! Core State trait for driven states.
//!
//! A state is a unit of behavior that lives for a single machine run. The
//! driver enters it exactly once, exits it at most once, and disposes it
//! exactly once, whatever way the run ends.

use super::error::StateError;
use super::transition::Transitions;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Trait for states run by a [`Driver`](crate::driver::Driver).
///
/// Every method has a default, so the smallest state is an empty impl.
/// States usually keep the [`Controller`](crate::driver::Controller) they
/// were built with, and call it from `enter` (or from work spawned there) to
/// ask the driver for a transition or an exit.
///
/// # Cleanup
///
/// Disposal happens in two phases with a fixed order: first the async
/// [`dispose`](State::dispose) hook, then the synchronous phase, which is the
/// type's own `Drop`. Both run exactly once for every state the driver ever
/// held, including a successor that was built but never entered.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use waymark::core::{State, StateError};
/// use waymark::driver::Controller;
///
/// struct Idle {
///     controller: Controller,
/// }
///
/// #[async_trait]
/// impl State for Idle {
///     fn name(&self) -> &str {
///         "Idle"
///     }
///
///     async fn enter(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
///         self.controller
///             .request_exit()
///             .map_err(|e| StateError::with_source("cannot stop", e))
///     }
/// }
/// ```
#[async_trait]
pub trait State: Send + 'static {
    /// Get the state's name for display/logging.
    ///
    /// Default implementation returns the Rust type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Declare the states this state may hand over to.
    ///
    /// Each target must be backed by a [`Transit`](super::Transit) impl.
    /// A request for any other target is rejected by the driver.
    ///
    /// Default implementation declares nothing, so the state can only exit.
    fn transitions(_table: &mut Transitions<Self>)
    where
        Self: Sized,
    {
    }

    /// Called once when the state becomes current.
    async fn enter(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
        Ok(())
    }

    /// Called once when the state is left through a transition or an exit
    /// request. Never called when the run is cancelled.
    async fn exit(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
        Ok(())
    }

    /// Async phase of cleanup. The state is dropped right after.
    async fn dispose(&mut self) {}
}
