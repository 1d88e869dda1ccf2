//! In-memory [`Driver`] for running the real [`Runtime`](gambit_app::Runtime)
//! without a network.
//!
//! Events come from the shared [`SimNetwork`] mailbox first and from a
//! scripted input queue second; when both are empty the driver reports end of
//! input and the runtime shuts down.

use std::{collections::VecDeque, convert::Infallible, sync::PoisonError};

use gambit_app::Driver;
use gambit_client::{Client, ClientAction, ClientEvent};
use gambit_core::{Environment, RulesEngine};

use crate::sim_network::SharedSimNetwork;

/// Scripted driver bound to one actor of a [`SimNetwork`](crate::SimNetwork).
pub struct SimDriver {
    actor: String,
    network: SharedSimNetwork,
    script: VecDeque<ClientEvent>,
    executed: Vec<ClientAction>,
    renders: usize,
    stops: usize,
}

impl SimDriver {
    /// Driver acting as `actor` on `network`.
    pub fn new(actor: impl Into<String>, network: SharedSimNetwork) -> Self {
        Self {
            actor: actor.into(),
            network,
            script: VecDeque::new(),
            executed: Vec::new(),
            renders: 0,
            stops: 0,
        }
    }

    /// Queue a user intent.
    pub fn push(&mut self, event: ClientEvent) {
        self.script.push_back(event);
    }

    /// Queue several user intents.
    pub fn script(mut self, events: impl IntoIterator<Item = ClientEvent>) -> Self {
        self.script.extend(events);
        self
    }

    /// Every action executed, in order.
    pub fn executed(&self) -> &[ClientAction] {
        &self.executed
    }

    /// Number of renders.
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Number of times the driver was stopped.
    pub fn stops(&self) -> usize {
        self.stops
    }

    /// Network this driver talks to.
    pub fn network(&self) -> &SharedSimNetwork {
        &self.network
    }
}

impl Driver for SimDriver {
    type Error = Infallible;

    async fn next_event(&mut self) -> Result<Option<ClientEvent>, Self::Error> {
        let delivered = self
            .network
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_event(&self.actor);
        Ok(delivered.or_else(|| self.script.pop_front()))
    }

    async fn execute(&mut self, action: ClientAction) -> Result<(), Self::Error> {
        self.executed.push(action.clone());
        self.network.lock().unwrap_or_else(PoisonError::into_inner).execute(&self.actor, action);
        Ok(())
    }

    fn render<E, R>(&mut self, _client: &Client<E, R>) -> Result<(), Self::Error>
    where
        E: Environment,
        R: RulesEngine,
    {
        self.renders += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}
