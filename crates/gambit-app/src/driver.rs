//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::future::Future;

use gambit_client::{Client, ClientAction, ClientEvent};
use gambit_core::{Environment, RulesEngine};

/// Abstracts I/O operations for the runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`crate::Runtime`] handles orchestration logic. This ensures the same
/// orchestration code runs in the terminal frontend and in simulation.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next event: user input, a timer tick or an I/O
    /// completion.
    ///
    /// Returns `None` once input is exhausted and the runtime should shut
    /// down.
    fn next_event(
        &mut self,
    ) -> impl Future<Output = Result<Option<ClientEvent>, Self::Error>> + Send;

    /// Start executing one client action.
    ///
    /// Completions are reported later through [`Driver::next_event`]; this
    /// call must not wait for the network.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures of the driver itself. Network
    /// failures are events.
    fn execute(
        &mut self,
        action: ClientAction,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Render the client state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render<E, R>(&mut self, client: &Client<E, R>) -> Result<(), Self::Error>
    where
        E: Environment,
        R: RulesEngine;

    /// Release every resource. Calling it twice is a no-op.
    fn stop(&mut self);
}
