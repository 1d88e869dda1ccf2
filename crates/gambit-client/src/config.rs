//! Client configuration.

use std::time::Duration;

use gambit_core::ConnectionConfig;

/// Tunables for one [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How often the joinable-session listing is refreshed
    pub discovery_interval: Duration,
    /// Channel handshake settings
    pub connection: ConnectionConfig,
    /// Channel attempts allowed before the handshake is declared failed
    pub max_handshake_attempts: u32,
    /// Consecutive snapshot fetches allowed before the session is declared
    /// errored
    pub max_resync_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            discovery_interval: Duration::from_secs(10),
            connection: ConnectionConfig::default(),
            max_handshake_attempts: 3,
            max_resync_attempts: 3,
        }
    }
}
