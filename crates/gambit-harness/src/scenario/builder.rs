//! Scenario builder API.
//!
//! Provides a declarative API for constructing scenario tests that enforce
//! the Oracle Pattern.

use std::time::Duration;

use gambit_client::{ClientConfig, ClientEvent};
use gambit_core::{MoveRequest, PlayMode};

use crate::scenario::{OracleFn, World};

enum Step {
    Event { actor: String, event: ClientEvent },
    Play { actor: String, coordinates: String },
    JoinPeer { actor: String, peer: String },
    Advance(Duration),
    DropChannel(String),
    Inject { actor: String, text: String },
    FailFetches(usize),
    MuteHandshakes(bool),
}

/// Scenario builder.
///
/// Construct a scenario by adding clients and steps. Must call `.oracle()`
/// to get a [`RunnableScenario`] that can be executed.
pub struct Scenario {
    name: String,
    seed: u64,
    clients: Vec<(String, ClientConfig)>,
    steps: Vec<Step>,
}

impl Scenario {
    /// Create a new scenario with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), seed: 0, clients: Vec::new(), steps: Vec::new() }
    }

    /// Seed for identifiers.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Add a client actor with default configuration.
    pub fn client(self, name: impl Into<String>) -> Self {
        self.client_with_config(name, ClientConfig::default())
    }

    /// Add a client actor with custom configuration.
    pub fn client_with_config(mut self, name: impl Into<String>, config: ClientConfig) -> Self {
        self.clients.push((name.into(), config));
        self
    }

    /// Switch every client added so far to networked mode.
    pub fn networked(mut self) -> Self {
        let names: Vec<String> = self.clients.iter().map(|(name, _)| name.clone()).collect();
        for actor in names {
            self.steps.push(Step::Event { actor, event: ClientEvent::SetMode(PlayMode::Networked) });
        }
        self
    }

    /// Deliver an event to a client.
    pub fn on(mut self, actor: impl Into<String>, event: ClientEvent) -> Self {
        self.steps.push(Step::Event { actor: actor.into(), event });
        self
    }

    /// Submit a move in coordinate notation (`e2e4`).
    pub fn play(mut self, actor: impl Into<String>, coordinates: impl Into<String>) -> Self {
        self.steps.push(Step::Play { actor: actor.into(), coordinates: coordinates.into() });
        self
    }

    /// Join whatever session `peer` is in.
    pub fn join_peer(mut self, actor: impl Into<String>, peer: impl Into<String>) -> Self {
        self.steps.push(Step::JoinPeer { actor: actor.into(), peer: peer.into() });
        self
    }

    /// Advance the clock and tick every client.
    pub fn advance(mut self, by: Duration) -> Self {
        self.steps.push(Step::Advance(by));
        self
    }

    /// Server drops a client's channel.
    pub fn drop_channel(mut self, actor: impl Into<String>) -> Self {
        self.steps.push(Step::DropChannel(actor.into()));
        self
    }

    /// Push raw text down a client's channel.
    pub fn inject(mut self, actor: impl Into<String>, text: impl Into<String>) -> Self {
        self.steps.push(Step::Inject { actor: actor.into(), text: text.into() });
        self
    }

    /// Fail the next `count` HTTP requests.
    pub fn fail_fetches(mut self, count: usize) -> Self {
        self.steps.push(Step::FailFetches(count));
        self
    }

    /// Accept channels without ever sending the handshake.
    pub fn mute_handshakes(mut self, mute: bool) -> Self {
        self.steps.push(Step::MuteHandshakes(mute));
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// Builds the world, applies every step in order (settling the network
    /// after each) and then runs the oracle.
    pub fn run(self) -> Result<(), String> {
        self.run_world().map(|_| ())
    }

    /// Execute the scenario and hand back the final world for further
    /// inspection.
    pub fn run_world(self) -> Result<World, String> {
        let name = self.scenario.name;
        let mut world = World::new(self.scenario.seed);
        for (client, config) in &self.scenario.clients {
            world
                .add_client(client.clone(), config)
                .map_err(|e| format!("Scenario '{name}': {e}"))?;
        }
        for (index, step) in self.scenario.steps.into_iter().enumerate() {
            apply(&mut world, step).map_err(|e| format!("Scenario '{name}' step {index}: {e}"))?;
        }
        (self.oracle)(&world).map_err(|e| format!("Scenario '{name}': {e}"))?;
        Ok(world)
    }
}

fn apply(world: &mut World, step: Step) -> Result<(), String> {
    match step {
        Step::Event { actor, event } => world.dispatch(&actor, event),
        Step::Play { actor, coordinates } => {
            let request = MoveRequest::from_coordinates(&coordinates).map_err(|e| e.to_string())?;
            world.dispatch(&actor, ClientEvent::Submit(request))
        },
        Step::JoinPeer { actor, peer } => {
            let session = world
                .client(&peer)
                .ok_or_else(|| format!("client {peer} not found"))?
                .session()
                .cloned()
                .ok_or_else(|| format!("{peer} is not in a session"))?;
            world.dispatch(&actor, ClientEvent::JoinSession(session))
        },
        Step::Advance(by) => world.advance(by),
        Step::DropChannel(actor) => {
            if !world.network_mut().drop_channel(&actor) {
                return Err(format!("{actor} has no channel to drop"));
            }
            world.settle().map(|_| ())
        },
        Step::Inject { actor, text } => {
            if !world.network_mut().inject(&actor, text) {
                return Err(format!("{actor} has no channel to inject into"));
            }
            world.settle().map(|_| ())
        },
        Step::FailFetches(count) => {
            world.network_mut().fail_fetches(count);
            Ok(())
        },
        Step::MuteHandshakes(mute) => {
            world.network_mut().mute_handshakes(mute);
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_requires_oracle() {
        // This should compile - oracle provided
        let _scenario = Scenario::new("test").client("alice").oracle(Box::new(|_world| Ok(())));

        // This should NOT compile - no oracle
        // let scenario = Scenario::new("test").client("alice");
        // scenario.run(); // ERROR: no method `run` on type `Scenario`
    }

    #[test]
    fn scenario_creates_actors() {
        let scenario =
            Scenario::new("test").client("alice").client("bob").oracle(Box::new(|world| {
                assert!(world.client("alice").is_some());
                assert!(world.client("bob").is_some());
                Ok(())
            }));

        scenario.run().expect("scenario should succeed");
    }

    #[test]
    fn unknown_peer_fails_the_step() {
        let result = Scenario::new("bad join")
            .client("alice")
            .networked()
            .join_peer("alice", "nobody")
            .oracle(Box::new(|_| Ok(())))
            .run();
        let error = result.unwrap_err();
        assert!(error.contains("step 1"), "{error}");
    }
}
