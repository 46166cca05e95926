//! Business failure type returned by state and transition hooks.

use thiserror::Error;

/// Boxed error used as the optional cause of a [`StateError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A business failure reported by collaborator code.
///
/// Returned from `enter`, `exit`, `before_exit` and `create_next` when the
/// operation semantically did not succeed. The driver never retries; the
/// failure ends the run and is handed back to the caller of
/// [`Driver::run`](crate::driver::Driver::run).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StateError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl StateError {
    /// Create a failure with a message and no underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a failure wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
