//! Simulated environment.
//!
//! Time is a [`Duration`] since the start of the simulation: turmoil's
//! simulated clock when running inside a turmoil host, plus whatever has been
//! added manually with [`SimEnv::advance`]. Randomness comes from a seeded
//! ChaCha RNG, so identical seeds produce identical client and session ids.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use gambit_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

struct SimState {
    offset: Duration,
    rng: ChaCha8Rng,
}

/// Deterministic [`Environment`] for tests.
///
/// Clones share the clock and the RNG.
#[derive(Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimState>>,
}

impl SimEnv {
    /// Environment seeded with zero.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment with a specific RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        let state = SimState { offset: Duration::ZERO, rng: ChaCha8Rng::seed_from_u64(seed) };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).offset += by;
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        let offset = self.state.lock().unwrap_or_else(PoisonError::into_inner).offset;
        offset + turmoil::sim_elapsed().unwrap_or_default()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).rng.fill_bytes(buffer);
    }
}
