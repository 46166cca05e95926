//! Single-slot request handoff between states and the driver loop.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Holds at most one pending request.
///
/// Any number of producers may call [`try_set`](RequestSlot::try_set); only
/// the driver loop waits on and drains the slot.
#[derive(Debug)]
pub(crate) struct RequestSlot<T> {
    value: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> RequestSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Post a value. Hands it back if one is already pending.
    pub(crate) fn try_set(&self, value: T) -> Result<(), T> {
        let mut slot = self.lock();
        if slot.is_some() {
            return Err(value);
        }
        *slot = Some(value);
        drop(slot);
        self.notify.notify_one();
        Ok(())
    }

    /// Wait until a value is pending. Does not consume it.
    pub(crate) async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_pending() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Consume the pending value, leaving the slot empty so new requests
    /// are accepted right away.
    pub(crate) fn take(&self) -> Option<T> {
        self.lock().take()
    }

    /// Discard anything pending.
    pub(crate) fn reset(&self) {
        self.lock().take();
    }
}
