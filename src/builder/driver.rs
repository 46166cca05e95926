//! Builder for constructing drivers.

use crate::builder::error::BuildError;
use crate::driver::{Driver, DEFAULT_HISTORY_CAPACITY, DEFAULT_NAME};

/// Builder for configuring a [`Driver`] with a fluent API.
#[derive(Clone, Debug)]
pub struct DriverBuilder {
    name: String,
    history_capacity: usize,
}

impl DriverBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Set the label used in log spans.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set how many transitions the run history keeps. `0` disables it.
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Build the driver.
    /// Returns an error if the name is blank.
    pub fn build(self) -> Result<Driver, BuildError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(BuildError::EmptyName);
        }

        Ok(Driver::with_settings(name.to_string(), self.history_capacity))
    }
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}
