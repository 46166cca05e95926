//! Resolution of a single transition request.

use super::error::RunError;
use super::lifecycle::ErasedState;
use super::Controller;
use crate::core::Target;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Run the declared transition from `current` to `target` and build the
/// successor.
///
/// Steps, in order: look up the route (an undeclared target is a fault),
/// run the `before_exit` hook, then `create_next`. Any failure stops the
/// transition right there; `current` is left untouched and unexited.
pub(crate) async fn resolve(
    current: &mut dyn ErasedState,
    target: Target,
    controller: Controller,
    cancel: &CancellationToken,
) -> Result<Box<dyn ErasedState>, RunError> {
    let from = current.label().to_string();
    let Some(transit) = current.transit_to(target.id(), controller, cancel) else {
        return Err(RunError::UndeclaredTransition {
            from,
            to: target.name().to_string(),
        });
    };

    debug!(from = %from, to = target.name(), "resolving transition");
    transit
        .await
        .map_err(|(stage, e)| RunError::failed(from.as_str(), stage, e))
}
