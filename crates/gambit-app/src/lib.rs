//! Application layer for Gambit
//!
//! Generic runtime that pairs the pure [`gambit_client::Client`] with a
//! [`Driver`] performing the I/O, so the terminal frontend and deterministic
//! simulation run the same orchestration code.
//!
//! # Components
//!
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver
//! - [`TaskDriver`]: Driver running channels and fetches as tokio tasks
//! - [`View`]: Rendering seam used by [`TaskDriver`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod runtime;
mod task_driver;

pub use driver::Driver;
pub use runtime::Runtime;
pub use task_driver::{DriverConfig, DriverError, TaskDriver, View};
