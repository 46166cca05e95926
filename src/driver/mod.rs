//! The driver loop: the "imperative shell" around the state contracts.
//!
//! A [`Driver`] owns the current state of one run at a time. It enters the
//! initial state, then waits for whichever comes first of a transition
//! request, an exit request or cancellation, and reacts:
//!
//! - **Transition**: resolve the route, exit the current state, enter the
//!   successor, dispose the old state.
//! - **Exit**: exit the current state and finish with [`Termination::Exited`].
//! - **Cancellation**: finish with [`Termination::Cancelled`] without exiting.
//!
//! A second transition or exit request posted while one is pending aborts the
//! run with [`RunError::AlreadyRequested`].
//!
//! Whatever the outcome, every state the driver held is disposed exactly
//! once before `run` returns or a panic from collaborator code is resumed.

mod channel;
mod controller;
mod error;
pub(crate) mod lifecycle;
mod resolver;

pub use controller::{Controller, RequestError, RequestKind};
pub use error::{RunError, Stage};

use crate::core::{RunEnd, RunHistory, State, Termination, TransitionRecord};
use chrono::Utc;
use controller::Requests;
use lifecycle::{dispose, guarded, panic_message, ErasedState, Panic};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Default label of a driver built without a name.
pub const DEFAULT_NAME: &str = "driver";

/// Default number of transitions kept in a run history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

/// What the loop was woken by.
enum Wake {
    Fault,
    Cancelled,
    Transit,
    Exit,
}

/// Runs states one at a time.
///
/// A driver is reusable: once a run ends, however it ends, the next `run`
/// call is accepted. Only one run may be active at a time.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use waymark::core::{State, StateError, Termination};
/// use waymark::driver::{Controller, Driver};
///
/// struct Once {
///     controller: Controller,
/// }
///
/// #[async_trait]
/// impl State for Once {
///     async fn enter(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
///         self.controller
///             .request_exit()
///             .map_err(|e| StateError::with_source("cannot stop", e))
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let driver = Driver::new();
/// let state = Once { controller: driver.controller() };
///
/// let outcome = driver.run(state, CancellationToken::new()).await;
/// assert_eq!(outcome.unwrap(), Termination::Exited);
/// # }
/// ```
#[derive(Debug)]
pub struct Driver {
    name: String,
    history_capacity: usize,
    requests: Arc<Requests>,
    running: AtomicBool,
    history: Mutex<Option<RunHistory>>,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    /// Create a driver with the default name and history capacity.
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_NAME.to_string(), DEFAULT_HISTORY_CAPACITY)
    }

    pub(crate) fn with_settings(name: String, history_capacity: usize) -> Self {
        Self {
            name,
            history_capacity,
            requests: Arc::new(Requests::new()),
            running: AtomicBool::new(false),
            history: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    /// A handle bound to this driver, for building the initial state.
    pub fn controller(&self) -> Controller {
        Controller::new(Arc::clone(&self.requests))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Snapshot of the history of the most recent run.
    pub fn history(&self) -> Option<RunHistory> {
        self.lock_history().clone()
    }

    /// Run the machine from `initial` until it exits, fails or is cancelled.
    ///
    /// Returns `Ok` on an exit request or on cancellation, and
    /// `Err(RunError::Failed { .. })` when a hook reports a business failure.
    /// Calling `run` while another run is active returns
    /// `Err(RunError::AlreadyRunning)`; `initial` is then dropped without
    /// being entered or disposed. A double request from any state ends the
    /// run with `Err(RunError::AlreadyRequested { .. })` once the hook that
    /// posted it returns. A panic raised by a hook is resumed once every held
    /// state has been disposed.
    ///
    /// A transition from `A` to `B` calls `A::exit`, then `B::enter`, and
    /// only then disposes `A`. If either call fails or panics, `B` is disposed
    /// first and `A` right after it.
    pub async fn run<S: State>(
        &self,
        initial: S,
        cancel: CancellationToken,
    ) -> Result<Termination, RunError> {
        let Some(_running) = RunningGuard::acquire(&self.running) else {
            warn!(driver = %self.name, "run called while already running");
            return Err(RunError::AlreadyRunning);
        };

        let history = RunHistory::start(initial.name(), self.history_capacity);
        let span = info_span!("run", driver = %self.name, run_id = %history.run_id());
        *self.lock_history() = Some(history);

        self.drive(Box::new(initial), cancel).instrument(span).await
    }

    async fn drive(
        &self,
        mut current: Box<dyn ErasedState>,
        cancel: CancellationToken,
    ) -> Result<Termination, RunError> {
        self.requests.reset();
        info!(state = current.label(), "run started");

        let outcome = self.run_loop(&mut current, &cancel).await;

        // Final cleanup: the state held last is disposed on every path.
        dispose(current).await;

        match outcome {
            Ok(Ok(termination)) => {
                info!(?termination, "run finished");
                self.finish_history(termination.into());
                Ok(termination)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "run failed");
                self.finish_history(RunEnd::Failed {
                    reason: err.to_string(),
                });
                Err(err)
            }
            Err(panic) => {
                error!(panic = panic_message(&panic), "run panicked");
                self.finish_history(RunEnd::Panicked);
                std::panic::resume_unwind(panic)
            }
        }
    }

    /// The loop proper. The outer `Err` carries a panic from collaborator
    /// code; `current` always holds the state the caller must dispose.
    async fn run_loop(
        &self,
        current: &mut Box<dyn ErasedState>,
        cancel: &CancellationToken,
    ) -> Result<Result<Termination, RunError>, Panic> {
        debug!(state = current.label(), "entering");
        let entered = guarded(current.on_enter(cancel))
            .await?
            .map_err(|e| RunError::failed(current.label(), Stage::Enter, e));
        if let Err(err) = self.checked(entered) {
            return Ok(Err(err));
        }

        loop {
            let wake = tokio::select! {
                biased;
                _ = self.requests.fault.wait() => Wake::Fault,
                _ = cancel.cancelled() => Wake::Cancelled,
                _ = self.requests.transit.wait() => Wake::Transit,
                _ = self.requests.exit.wait() => Wake::Exit,
            };

            match wake {
                Wake::Fault => {
                    let Some(kind) = self.requests.fault.take() else {
                        continue;
                    };
                    warn!(state = current.label(), %kind, "aborting on double request");
                    return Ok(Err(RunError::AlreadyRequested { kind }));
                }
                Wake::Cancelled => {
                    debug!(state = current.label(), "cancelled while waiting");
                    return Ok(Ok(Termination::Cancelled));
                }
                Wake::Exit => {
                    self.requests.exit.take();
                    debug!(state = current.label(), "exiting");
                    let exited = guarded(current.on_exit(cancel))
                        .await?
                        .map_err(|e| RunError::failed(current.label(), Stage::Exit, e));
                    return Ok(self.checked(exited).map(|()| Termination::Exited));
                }
                Wake::Transit => {
                    let Some(target) = self.requests.transit.take() else {
                        continue;
                    };
                    debug!(state = current.label(), to = target.name(), "transition");

                    // Resolution failures leave `current` for the final cleanup.
                    let resolved = guarded(resolver::resolve(
                        &mut **current,
                        target,
                        self.controller(),
                        cancel,
                    ))
                    .await?;
                    let mut next = match resolved {
                        Ok(next) => next,
                        Err(err) => return Ok(self.checked(Err(err))),
                    };
                    if let Err(err) = self.checked(Ok(())) {
                        dispose(next).await;
                        return Ok(Err(err));
                    }

                    match guarded(self.hand_over(&mut **current, &mut *next, cancel)).await {
                        Ok(Ok(())) => {
                            let record = TransitionRecord {
                                from: current.label().to_string(),
                                to: next.label().to_string(),
                                timestamp: Utc::now(),
                            };
                            let previous = std::mem::replace(current, next);
                            dispose(previous).await;
                            self.record_transition(record);
                        }
                        Ok(Err(err)) => {
                            dispose(next).await;
                            return Ok(Err(err));
                        }
                        Err(panic) => {
                            dispose(next).await;
                            return Err(panic);
                        }
                    }
                }
            }
        }
    }

    /// Exit `current`, then enter `next`.
    async fn hand_over(
        &self,
        current: &mut dyn ErasedState,
        next: &mut dyn ErasedState,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        debug!(state = current.label(), "exiting");
        let exited = current
            .on_exit(cancel)
            .await
            .map_err(|e| RunError::failed(current.label(), Stage::Exit, e));
        self.checked(exited)?;

        debug!(state = next.label(), "entering");
        let entered = next
            .on_enter(cancel)
            .await
            .map_err(|e| RunError::failed(next.label(), Stage::Enter, e));
        self.checked(entered)
    }

    /// A double request posted while a hook ran takes precedence over the
    /// hook's own result.
    fn checked<T>(&self, result: Result<T, RunError>) -> Result<T, RunError> {
        match self.requests.fault.take() {
            Some(kind) => Err(RunError::AlreadyRequested { kind }),
            None => result,
        }
    }

    fn lock_history(&self) -> MutexGuard<'_, Option<RunHistory>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_transition(&self, record: TransitionRecord) {
        if let Some(history) = self.lock_history().as_mut() {
            history.record(record);
        }
    }

    fn finish_history(&self, end: RunEnd) {
        if let Some(history) = self.lock_history().as_mut() {
            history.finish(end);
        }
    }
}

/// Holds the running flag for the duration of a run, including when the run
/// future is dropped or unwinds.
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
