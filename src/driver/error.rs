//! Run errors.

use super::RequestKind;
use crate::core::StateError;
use std::fmt;
use thiserror::Error;

/// Lifecycle step at which a business failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Enter,
    Exit,
    BeforeExit,
    CreateNext,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Enter => "enter",
            Self::Exit => "exit",
            Self::BeforeExit => "before_exit",
            Self::CreateNext => "create_next",
        };
        f.write_str(name)
    }
}

/// Errors that end a run.
///
/// `Failed` carries a business failure from collaborator code. The other
/// variants are faults: they point at a bug in the code driving or
/// implementing the states and are never produced by a well-formed machine.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("State '{state}' failed in {stage}: {source}")]
    Failed {
        state: String,
        stage: Stage,
        #[source]
        source: StateError,
    },

    #[error("Driver is already running")]
    AlreadyRunning,

    #[error("State '{from}' declares no transition to '{to}'")]
    UndeclaredTransition { from: String, to: String },

    #[error("Second {kind} request posted while the first was pending")]
    AlreadyRequested { kind: RequestKind },
}

impl RunError {
    pub(crate) fn failed(state: impl Into<String>, stage: Stage, source: StateError) -> Self {
        Self::Failed {
            state: state.into(),
            stage,
            source,
        }
    }

    /// Check whether this error is a programmer fault rather than a
    /// business failure.
    pub fn is_fault(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// The stage of a business failure, if this is one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
