//! Builder API for configuring drivers.
//!
//! ```
//! use waymark::builder::DriverBuilder;
//!
//! let driver = DriverBuilder::new()
//!     .name("turnstile")
//!     .history_capacity(16)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(driver.name(), "turnstile");
//! assert_eq!(driver.history_capacity(), 16);
//! ```

pub mod driver;
pub mod error;

pub use driver::DriverBuilder;
pub use error::BuildError;
