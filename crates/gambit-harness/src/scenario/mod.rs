//! Scenario framework.
//!
//! Declarative multi-participant tests: build a [`Scenario`] out of clients
//! and steps, attach an oracle, run it. A scenario without an oracle cannot
//! be run.

mod builder;
pub mod oracle;
mod world;

pub use builder::{RunnableScenario, Scenario};
pub use world::{BACKEND, SimClient, World};

/// Final-state verification for a scenario.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;
