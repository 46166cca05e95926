//! Per-run transition history.
//!
//! The driver keeps one [`RunHistory`] for the most recent run: which
//! transitions completed, when, and how the run ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use uuid::Uuid;

/// Record of a single completed transition.
///
/// Only transitions whose successor was entered successfully are recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Name of the state that was left
    pub from: String,
    /// Name of the state that was entered
    pub to: String,
    /// When the successor finished entering
    pub timestamp: DateTime<Utc>,
}

/// How a successful run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The current state requested an exit and exited cleanly.
    Exited,
    /// The cancellation token fired while waiting for a request.
    Cancelled,
}

/// Final outcome of a run as kept in its history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEnd {
    Finished(Termination),
    Failed { reason: String },
    Panicked,
}

/// History of a single run.
///
/// # Example
///
/// ```rust
/// use waymark::core::{RunHistory, Termination, TransitionRecord};
/// use chrono::Utc;
///
/// let mut history = RunHistory::start("Locked", 8);
/// history.record(TransitionRecord {
///     from: "Locked".to_string(),
///     to: "Unlocked".to_string(),
///     timestamp: Utc::now(),
/// });
/// history.finish(Termination::Exited.into());
///
/// assert_eq!(history.path(), vec!["Locked", "Unlocked"]);
/// assert!(history.is_finished());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunHistory {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    initial: String,
    capacity: usize,
    dropped: usize,
    transitions: VecDeque<TransitionRecord>,
    end: Option<RunEnd>,
}

impl From<Termination> for RunEnd {
    fn from(termination: Termination) -> Self {
        RunEnd::Finished(termination)
    }
}

impl RunHistory {
    /// Start a new history for a run beginning in `initial`.
    ///
    /// At most `capacity` transitions are kept; older ones are dropped first.
    pub fn start(initial: impl Into<String>, capacity: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            initial: initial.into(),
            capacity,
            dropped: 0,
            transitions: VecDeque::with_capacity(capacity.min(64)),
            end: None,
        }
    }

    /// Append a completed transition.
    pub fn record(&mut self, transition: TransitionRecord) {
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
            self.dropped += 1;
        }
        self.transitions.push_back(transition);
    }

    /// Mark the run as ended. Later calls are ignored.
    pub fn finish(&mut self, end: RunEnd) {
        if self.end.is_none() {
            self.end = Some(end);
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn initial(&self) -> &str {
        &self.initial
    }

    /// Kept transitions, oldest first.
    pub fn transitions(&self) -> impl ExactSizeIterator<Item = &TransitionRecord> {
        self.transitions.iter()
    }

    /// Number of transitions discarded because of the capacity limit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn end(&self) -> Option<&RunEnd> {
        self.end.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.end.is_some()
    }

    /// Names of the visited states in order.
    ///
    /// Starts with the initial state while no transition has been dropped,
    /// otherwise with the source of the oldest kept transition.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        match self.transitions.front() {
            Some(first) if self.dropped > 0 => path.push(first.from.as_str()),
            _ => path.push(self.initial.as_str()),
        }
        path.extend(self.transitions.iter().map(|t| t.to.as_str()));
        path
    }

    /// Time between the first and last kept transition.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.front()?, self.transitions.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }
}
