//! Channel messages.
//!
//! Two directions, two types:
//! - [`ServerMessage`]: everything the server pushes down the channel. A closed
//!   union of the kinds the client acts on plus an explicit
//!   [`ServerMessage::Unrecognized`] arm.
//! - [`ClientMessage`]: what the client sends up. Today only moves.
//!
//! Parsing goes through [`serde_json::Value`] first so the `type` tag can be
//! inspected before committing to a payload shape. That is what lets a
//! malformed `init` be told apart from an unknown kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProtocolError, Result, Seat};

/// Handshake payload: the authoritative state of the session at join time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPayload {
    /// Position encoding (FEN for chess)
    pub fen: String,
    /// Notation of every move since the session started
    #[serde(default)]
    pub move_history: Vec<String>,
    /// Session status string; absent means `ongoing`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Seat assigned to this participant; absent for spectators
    #[serde(default)]
    pub color: Option<Seat>,
}

/// A move accepted by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePayload {
    /// Origin square, e.g. `e2`
    pub from: String,
    /// Target square, e.g. `e4`
    pub to: String,
    /// Promotion piece letter (`q`, `r`, `b`, `n`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
    /// Session status after the move, when the server reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Server-side refusal, e.g. a full session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human readable reason
    pub message: String,
}

/// Late seat assignment, sent by servers that assign seats after `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorAssignment {
    /// Assigned seat, `null` revokes the assignment
    pub color: Option<Seat>,
}

/// Status-only update (opponent resigned, draw agreed, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// New session status string
    pub status: String,
}

/// Messages the server sends down the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Handshake
    Init(InitPayload),
    /// A move to apply
    Move(MovePayload),
    /// Join refused or session failure
    Error(ErrorPayload),
    /// Seat assignment
    ColorAssignment(ColorAssignment),
    /// Status change without a move
    Status(StatusPayload),
    /// Any kind this client does not understand; ignored by callers
    Unrecognized {
        /// The `type` tag as received
        kind: String,
    },
}

/// Serialization shape for the known kinds. Kept private so the public enum
/// can carry the `Unrecognized` arm that serde cannot express with a payload.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Tagged<'a> {
    Init(&'a InitPayload),
    Move(&'a MovePayload),
    Error(&'a ErrorPayload),
    ColorAssignment(&'a ColorAssignment),
    Status(&'a StatusPayload),
}

impl ServerMessage {
    /// Parse one channel message.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Json`] if the text is not JSON
    /// - [`ProtocolError::MissingKind`] if there is no string `type` field
    /// - [`ProtocolError::Malformed`] if a known kind has the wrong shape
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingKind)?
            .to_string();

        let message = match kind.as_str() {
            "init" => Self::Init(decode(&kind, value)?),
            "move" => Self::Move(decode(&kind, value)?),
            "error" => Self::Error(decode(&kind, value)?),
            "color_assignment" => Self::ColorAssignment(decode(&kind, value)?),
            "status" => Self::Status(decode(&kind, value)?),
            _ => Self::Unrecognized { kind },
        };
        Ok(message)
    }

    /// Wire tag of this message.
    pub fn kind(&self) -> &str {
        match self {
            Self::Init(_) => "init",
            Self::Move(_) => "move",
            Self::Error(_) => "error",
            Self::ColorAssignment(_) => "color_assignment",
            Self::Status(_) => "status",
            Self::Unrecognized { kind } => kind,
        }
    }

    /// Encode for sending. Used by servers and test harnesses.
    pub fn to_json(&self) -> Result<String> {
        let tagged = match self {
            Self::Init(p) => Tagged::Init(p),
            Self::Move(p) => Tagged::Move(p),
            Self::Error(p) => Tagged::Error(p),
            Self::ColorAssignment(p) => Tagged::ColorAssignment(p),
            Self::Status(p) => Tagged::Status(p),
            Self::Unrecognized { kind } => {
                return Ok(serde_json::json!({ "type": kind }).to_string());
            },
        };
        Ok(serde_json::to_string(&tagged)?)
    }
}

fn decode<T: serde::de::DeserializeOwned>(kind: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|source| ProtocolError::Malformed { kind: kind.to_string(), source })
}

/// Messages the client sends up the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Propose a move in from/to/promotion form.
    Move {
        /// Origin square
        from: String,
        /// Target square
        to: String,
        /// Promotion piece letter
        #[serde(default, skip_serializing_if = "Option::is_none")]
        promotion: Option<String>,
    },
}

impl ClientMessage {
    /// Encode for sending.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a client message. The `type` tag is optional: some deployments
    /// send bare `{from, to}` objects.
    pub fn parse(text: &str) -> Result<Self> {
        let mut value: Value = serde_json::from_str(text)?;
        if let Value::Object(map) = &mut value {
            map.entry("type").or_insert_with(|| Value::String("move".to_string()));
        }
        decode("move", value)
    }
}
