//! World state for scenario execution.
//!
//! The World owns every client taking part in a scenario, the simulated
//! network in front of the server, and the shared environment. Events are
//! delivered one at a time in actor-name order, so a run is reproducible
//! from its seed.

use std::{collections::BTreeMap, time::Duration};

use gambit_client::{Client, ClientConfig, ClientEvent, Endpoint};
use gambit_core::{ChessRules, Environment};
use gambit_proto::ClientId;
use tracing::debug;

use crate::{SimEnv, SimNetwork};

/// Backend every scenario client is configured with.
pub const BACKEND: &str = "http://localhost:8000";

/// Upper bound on events delivered by one [`World::settle`].
const MAX_SETTLE_EVENTS: usize = 10_000;

/// Client type used in scenarios.
pub type SimClient = Client<SimEnv, ChessRules>;

/// World state containing all actors.
pub struct World {
    env: SimEnv,
    network: SimNetwork,
    clients: BTreeMap<String, SimClient>,
    delivered: usize,
}

impl World {
    /// Empty world with a seeded environment and a fresh server.
    pub fn new(seed: u64) -> Self {
        Self::with_network(seed, SimNetwork::default())
    }

    /// Empty world in front of a prepared network.
    pub fn with_network(seed: u64, network: SimNetwork) -> Self {
        Self { env: SimEnv::with_seed(seed), network, clients: BTreeMap::new(), delivered: 0 }
    }

    /// Add a client with its own freshly generated identifier.
    pub fn add_client(
        &mut self,
        name: impl Into<String>,
        config: &ClientConfig,
    ) -> Result<(), String> {
        let name = name.into();
        let endpoint = Endpoint::parse(BACKEND).map_err(|e| e.to_string())?;
        let client_id = ClientId::new(self.env.fresh_token());
        let client = Client::new(self.env.clone(), ChessRules, endpoint, client_id, config);
        if self.clients.insert(name.clone(), client).is_some() {
            return Err(format!("client {name} added twice"));
        }
        Ok(())
    }

    /// Get a client by name.
    pub fn client(&self, name: &str) -> Option<&SimClient> {
        self.clients.get(name)
    }

    /// Every client, in name order.
    pub fn clients(&self) -> impl Iterator<Item = (&str, &SimClient)> {
        self.clients.iter().map(|(name, client)| (name.as_str(), client))
    }

    /// The network.
    pub fn network(&self) -> &SimNetwork {
        &self.network
    }

    /// Mutable network, for fault injection.
    pub fn network_mut(&mut self) -> &mut SimNetwork {
        &mut self.network
    }

    /// The shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Events delivered to clients so far.
    pub fn events_delivered(&self) -> usize {
        self.delivered
    }

    /// Hand `event` to a client and execute what it asks for, without
    /// delivering the consequences.
    pub fn deliver(&mut self, name: &str, event: ClientEvent) -> Result<(), String> {
        let client =
            self.clients.get_mut(name).ok_or_else(|| format!("client {name} not found"))?;
        let actions = client.handle(event);
        self.delivered += 1;
        for action in actions {
            self.network.execute(name, action);
        }
        Ok(())
    }

    /// Deliver `event` and then everything it causes.
    pub fn dispatch(&mut self, name: &str, event: ClientEvent) -> Result<(), String> {
        self.deliver(name, event)?;
        self.settle().map(|_| ())
    }

    /// Drain every mailbox until the network is quiet. Returns the number of
    /// events delivered.
    pub fn settle(&mut self) -> Result<usize, String> {
        let mut delivered = 0;
        while self.network.is_busy() {
            for actor in self.network.busy_actors() {
                if let Some(event) = self.network.next_event(&actor) {
                    self.deliver(&actor, event)?;
                    delivered += 1;
                }
            }
            if delivered > MAX_SETTLE_EVENTS {
                return Err(format!("network did not settle after {delivered} events"));
            }
        }
        debug!(delivered, "world settled");
        Ok(delivered)
    }

    /// Move the clock forward, tick every client and settle.
    pub fn advance(&mut self, by: Duration) -> Result<(), String> {
        self.env.advance(by);
        let names: Vec<String> = self.clients.keys().cloned().collect();
        for name in names {
            self.deliver(&name, ClientEvent::Tick)?;
        }
        self.settle().map(|_| ())
    }
}
