//! Error types for the core state machines.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Invalid use of the channel [`Connection`](crate::Connection) state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Operation not allowed in the current state
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// State the connection was in
        state: ConnectionState,
        /// Operation that was attempted
        operation: &'static str,
    },
}

/// Rejection from the rules engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    /// Position encoding could not be parsed or describes an impossible
    /// position
    #[error("invalid position `{encoding}`: {reason}")]
    InvalidPosition {
        /// Encoding as received
        encoding: String,
        /// Parser complaint
        reason: String,
    },

    /// Square name outside the board
    #[error("invalid square `{0}`")]
    InvalidSquare(String),

    /// Promotion letter that names no promotable piece
    #[error("invalid promotion piece `{0}`")]
    InvalidPromotion(char),

    /// Well-formed but not legal in the current position
    #[error("illegal move {from}{to}")]
    IllegalMove {
        /// Origin square
        from: String,
        /// Target square
        to: String,
    },
}
