//! Request and response bodies for the auxiliary HTTP endpoints.
//!
//! These endpoints are plain request/response with no error taxonomy beyond
//! transport failure and shape mismatch, so every decoder returns
//! [`ProtocolError`](crate::ProtocolError) on a bad body.

use serde::{Deserialize, Serialize};

use crate::{Result, SessionId};

/// Joinable sessions advertised by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionListing {
    /// Session identifiers, in server order
    #[serde(default, alias = "games")]
    pub sessions: Vec<SessionId>,
}

impl SessionListing {
    /// Decode a listing body.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Authoritative state of one session, fetched outside the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Position encoding
    pub fen: String,
    /// Notation of every move since the session started
    #[serde(default)]
    pub move_history: Vec<String>,
    /// Status string; absent means `ongoing`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl SessionSnapshot {
    /// Decode a snapshot body.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Body of the suggestion and evaluation requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionBody {
    /// Position to analyse
    pub fen: String,
}

impl PositionBody {
    /// Encode as a request body.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Suggested move from the computation service, in coordinate notation
/// (`e2e4`, `e7e8q`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    /// Suggested move; `None` when the position has no legal moves
    #[serde(default)]
    pub best_move: Option<String>,
    /// Service-side complaint (e.g. unknown search mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuggestionResponse {
    /// Decode a suggestion body.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Scalar evaluation in centipawns from the first seat's point of view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    /// Evaluation; `None` when the service could not score the position
    #[serde(default)]
    pub evaluation: Option<i64>,
}

impl EvaluationResponse {
    /// Decode an evaluation body.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}
