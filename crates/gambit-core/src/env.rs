//! Environment abstraction.
//!
//! State machines read the clock and draw randomness only through
//! [`Environment`], so the same code runs against wall-clock time in
//! production and against a virtual clock with a seeded RNG in simulation.

use std::{
    fmt::Debug,
    ops::{Add, Sub},
    time::Duration,
};

use rand::RngCore;

/// Time and randomness provider.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type. Virtual in simulation.
    type Instant: Copy
        + Ord
        + Debug
        + Send
        + Sync
        + Sub<Output = Duration>
        + Add<Duration, Output = Self::Instant>;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// A fresh random UUID (v4) in hyphenated form. Used for client and
    /// session identifiers.
    fn fresh_token(&self) -> String {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid().hyphenated().to_string()
    }
}

/// Production environment backed by tokio time and the thread RNG.
///
/// Tokio's clock is used rather than `std::time` so the same environment
/// follows simulated time under turmoil.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        rand::thread_rng().fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tokens_are_uuid_v4() {
        let env = SystemEnv;
        let a = env.fresh_token();
        let b = env.fresh_token();
        assert_ne!(a, b);
        let parsed = uuid::Uuid::parse_str(&a).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }
}
