//! Handle through which a running state talks to its driver.

use super::channel::RequestSlot;
use crate::core::{State, Target};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Kind of request posted through a [`Controller`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Transit,
    Exit,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transit => f.write_str("transition"),
            Self::Exit => f.write_str("exit"),
        }
    }
}

/// Errors returned when posting a request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Request already pending: {kind}")]
    AlreadyRequested { kind: RequestKind },
}

#[derive(Debug)]
pub(crate) struct Requests {
    pub(crate) transit: RequestSlot<Target>,
    pub(crate) exit: RequestSlot<()>,
    /// First double request of the run, reported by the driver as a fault.
    pub(crate) fault: RequestSlot<RequestKind>,
}

impl Requests {
    pub(crate) fn new() -> Self {
        Self {
            transit: RequestSlot::new(),
            exit: RequestSlot::new(),
            fault: RequestSlot::new(),
        }
    }

    pub(crate) fn reset(&self) {
        self.transit.reset();
        self.exit.reset();
        self.fault.reset();
    }
}

/// Cloneable, thread-safe handle to a [`Driver`](super::Driver).
///
/// At most one transition request and one exit request may be pending at a
/// time. The driver drains a request before acting on it, so a state may post
/// its next request while the previous one is still being handled. A second
/// request while one is pending is rejected here and aborts the active run
/// with [`RunError::AlreadyRequested`](super::RunError::AlreadyRequested).
#[derive(Clone, Debug)]
pub struct Controller {
    requests: Arc<Requests>,
}

impl Controller {
    pub(crate) fn new(requests: Arc<Requests>) -> Self {
        Self { requests }
    }

    /// Ask the driver to move to state `To`.
    ///
    /// Whether the current state actually declares `To` is only checked when
    /// the driver resolves the request.
    pub fn request_transit<To: State>(&self) -> Result<(), RequestError> {
        let target = Target::of::<To>();
        match self.requests.transit.try_set(target) {
            Ok(()) => {
                debug!(to = target.name(), "transition requested");
                Ok(())
            }
            Err(_) => {
                warn!(to = target.name(), "transition already requested");
                Err(self.reject(RequestKind::Transit))
            }
        }
    }

    /// Ask the driver to exit the current state and end the run.
    pub fn request_exit(&self) -> Result<(), RequestError> {
        match self.requests.exit.try_set(()) {
            Ok(()) => {
                debug!("exit requested");
                Ok(())
            }
            Err(()) => {
                warn!("exit already requested");
                Err(self.reject(RequestKind::Exit))
            }
        }
    }

    fn reject(&self, kind: RequestKind) -> RequestError {
        // Only the first double request of a run is kept.
        let _ = self.requests.fault.try_set(kind);
        RequestError::AlreadyRequested { kind }
    }

    /// Check whether both handles point at the same driver.
    pub fn same_driver(&self, other: &Controller) -> bool {
        Arc::ptr_eq(&self.requests, &other.requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Next;

    #[async_trait]
    impl State for Next {}

    fn controller() -> Controller {
        Controller::new(Arc::new(Requests::new()))
    }

    #[test]
    fn double_transit_request_is_rejected() {
        let controller = controller();

        assert!(controller.request_transit::<Next>().is_ok());
        assert_eq!(
            controller.request_transit::<Next>(),
            Err(RequestError::AlreadyRequested {
                kind: RequestKind::Transit
            })
        );
    }

    #[test]
    fn double_exit_request_is_rejected() {
        let controller = controller();

        assert!(controller.request_exit().is_ok());
        assert_eq!(
            controller.request_exit(),
            Err(RequestError::AlreadyRequested {
                kind: RequestKind::Exit
            })
        );
    }

    #[test]
    fn transit_and_exit_are_independent() {
        let controller = controller();

        assert!(controller.request_transit::<Next>().is_ok());
        assert!(controller.request_exit().is_ok());
    }

    #[test]
    fn clones_share_pending_requests() {
        let controller = controller();
        let clone = controller.clone();

        controller.request_exit().unwrap();
        assert!(clone.request_exit().is_err());
        assert!(controller.same_driver(&clone));
    }

    #[test]
    fn reset_accepts_new_requests() {
        let requests = Arc::new(Requests::new());
        let controller = Controller::new(Arc::clone(&requests));

        controller.request_transit::<Next>().unwrap();
        controller.request_exit().unwrap();
        requests.reset();

        assert!(controller.request_transit::<Next>().is_ok());
        assert!(controller.request_exit().is_ok());
    }

    #[test]
    fn error_message_names_request_kind() {
        let err = RequestError::AlreadyRequested {
            kind: RequestKind::Exit,
        };
        assert_eq!(err.to_string(), "Request already pending: exit");
    }

    #[test]
    fn double_request_records_first_fault() {
        let requests = Arc::new(Requests::new());
        let controller = Controller::new(Arc::clone(&requests));

        controller.request_exit().unwrap();
        assert!(!requests.fault.is_pending());

        assert!(controller.request_exit().is_err());
        controller.request_transit::<Next>().unwrap();
        assert!(controller.request_transit::<Next>().is_err());

        assert_eq!(requests.fault.take(), Some(RequestKind::Exit));
        requests.reset();
        assert!(!requests.fault.is_pending());
    }
}
