//! Type-erased lifecycle calls and disposal.

use super::error::Stage;
use super::Controller;
use crate::core::{State, StateError, Transitions};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::any::{Any, TypeId};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Payload of a panic raised by collaborator code.
pub(crate) type Panic = Box<dyn Any + Send + 'static>;

/// Object-safe view of a [`State`] as held by the driver.
#[async_trait]
pub(crate) trait ErasedState: Send {
    fn label(&self) -> &str;

    async fn on_enter(&mut self, cancel: &CancellationToken) -> Result<(), StateError>;

    async fn on_exit(&mut self, cancel: &CancellationToken) -> Result<(), StateError>;

    async fn on_dispose(&mut self);

    /// Run `before_exit`, then `create_next`, for the route to `target`.
    ///
    /// `None` when the state declares no transition to `target`. A failure
    /// carries the stage it happened in.
    fn transit_to<'a>(
        &'a mut self,
        target: TypeId,
        controller: Controller,
        cancel: &'a CancellationToken,
    ) -> Option<BoxFuture<'a, Result<Box<dyn ErasedState>, (Stage, StateError)>>>;
}

#[async_trait]
impl<S: State> ErasedState for S {
    fn label(&self) -> &str {
        State::name(self)
    }

    async fn on_enter(&mut self, cancel: &CancellationToken) -> Result<(), StateError> {
        State::enter(self, cancel).await
    }

    async fn on_exit(&mut self, cancel: &CancellationToken) -> Result<(), StateError> {
        State::exit(self, cancel).await
    }

    async fn on_dispose(&mut self) {
        State::dispose(self).await
    }

    fn transit_to<'a>(
        &'a mut self,
        target: TypeId,
        controller: Controller,
        cancel: &'a CancellationToken,
    ) -> Option<BoxFuture<'a, Result<Box<dyn ErasedState>, (Stage, StateError)>>> {
        let route = Transitions::<S>::collect().route(target)?;
        Some(Box::pin(async move {
            if let Err(e) = (route.before_exit)(&mut *self, cancel).await {
                return Err((Stage::BeforeExit, e));
            }
            (route.create_next)(self, controller)
                .await
                .map_err(|e| (Stage::CreateNext, e))
        }))
    }
}

/// Await `future`, turning a panic into an `Err` so the caller can clean up
/// before resuming it.
pub(crate) async fn guarded<F: Future>(future: F) -> Result<F::Output, Panic> {
    AssertUnwindSafe(future).catch_unwind().await
}

/// Dispose a state: the async phase first, then the synchronous phase
/// (dropping it). Panics from either phase are logged and swallowed.
pub(crate) async fn dispose(mut state: Box<dyn ErasedState>) {
    let name = state.label().to_string();
    debug!(state = %name, "disposing");

    if let Err(panic) = guarded(state.on_dispose()).await {
        error!(state = %name, panic = panic_message(&panic), "dispose panicked");
    }
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(move || drop(state))) {
        error!(state = %name, panic = panic_message(&panic), "drop panicked");
    }
}

pub(crate) fn panic_message(panic: &Panic) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
