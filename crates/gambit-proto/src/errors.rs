//! Protocol error types.

use thiserror::Error;

/// Result alias for wire parsing.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Failure to interpret bytes received from the server.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Text is not JSON at all.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON object without a string `type` field.
    #[error("message has no `type` field")]
    MissingKind,

    /// Known kind whose payload does not have the expected shape.
    #[error("malformed `{kind}` message: {source}")]
    Malformed {
        /// Message kind as tagged on the wire
        kind: String,
        /// Underlying decode failure
        #[source]
        source: serde_json::Error,
    },

    /// Status string outside the vocabulary the client understands.
    #[error("unknown session status `{0}`")]
    UnknownStatus(String),

    /// Session identifiers must contain at least one visible character.
    #[error("empty session identifier")]
    EmptySessionId,

    /// Session identifier that would not stay a single URL path segment.
    #[error("invalid session identifier `{0}`")]
    InvalidSessionId(String),

    /// Move notation that is not `<square><square>[promotion]`.
    #[error("invalid move notation `{0}`")]
    InvalidMove(String),
}
