//! Client error taxonomy.
//!
//! None of these escape [`Client::handle`](crate::Client::handle). Each is
//! turned into a session status or a notice at the point where it occurs;
//! the enum exists so the surrounding UI can tell the categories apart.

use gambit_core::{HttpError, RuleViolation};
use gambit_proto::ProtocolError;
use thiserror::Error;

/// Everything that can go wrong while keeping a session in sync.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Channel could not be opened, written or kept alive. The user can retry
    /// by selecting the session again.
    #[error("connection error: {0}")]
    Connection(String),

    /// Unparseable or out-of-sequence payload. Triggers a resync.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Rules engine rejected a remote move or a delivered position. Triggers
    /// a resync.
    #[error("rule violation: {0}")]
    Rule(#[from] RuleViolation),

    /// The session has no free seat. Terminal for this attempt.
    #[error("session is full: {0}")]
    Capacity(String),

    /// Any other refusal reported by the server.
    #[error("server refused: {0}")]
    Rejected(String),
}

impl ClientError {
    /// Classify a server `error` message.
    pub fn from_server(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_ascii_lowercase().contains("full") {
            Self::Capacity(message)
        } else {
            Self::Rejected(message)
        }
    }

    /// Errors after which the local mirror can no longer be trusted.
    pub fn requires_resync(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Rule(_))
    }
}

impl From<HttpError> for ClientError {
    fn from(error: HttpError) -> Self {
        Self::Connection(error.to_string())
    }
}
