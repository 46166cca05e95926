//! Build errors for the driver builder.

use thiserror::Error;

/// Errors that can occur when building a driver.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Driver name is empty. Call .name(..) with a non-empty label or leave the default")]
    EmptyName,
}
