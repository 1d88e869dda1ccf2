//! Identifier types shared by the wire messages and the client.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Opaque name of one game session.
///
/// Either typed by a participant, picked from the server listing, or
/// generated locally for a fresh session. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Validate and wrap a session name. Surrounding whitespace is dropped.
    ///
    /// The name becomes one URL path segment, so path separators, percent
    /// escapes and the dot segments `.` and `..` are refused.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ProtocolError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::EmptySessionId);
        }
        if matches!(trimmed, "." | "..") || trimmed.contains(['/', '\\', '%']) {
            return Err(ProtocolError::InvalidSessionId(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the session name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier the server uses to re-associate a reconnecting participant
/// with the seat it held before.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wrap an existing identifier (e.g. one loaded from storage).
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the two sides of a session.
///
/// `First` moves first (white in chess). The wire uses `first`/`second`;
/// `white`/`black` are accepted from older servers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    /// Side to move at the start of a game
    #[serde(rename = "first", alias = "white")]
    First,
    /// The other side
    #[serde(rename = "second", alias = "black")]
    Second,
}

impl Seat {
    /// The seat across the board.
    pub fn opponent(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::Second => f.write_str("second"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_trims_and_rejects_empty() {
        assert_eq!(SessionId::new("  g1 ").unwrap().as_str(), "g1");
        assert!(matches!(SessionId::new("   "), Err(ProtocolError::EmptySessionId)));
        assert!("".parse::<SessionId>().is_err());
    }

    #[test]
    fn session_id_is_a_single_path_segment() {
        for raw in ["..", ".", "a/b", "/g1", "a\\b", "%2e%2e"] {
            assert!(
                matches!(SessionId::new(raw), Err(ProtocolError::InvalidSessionId(_))),
                "{raw}"
            );
        }
        assert_eq!(SessionId::new("g.1").unwrap().as_str(), "g.1");
        assert!(serde_json::from_str::<SessionId>("\"..\"").is_err());
    }

    #[test]
    fn seat_accepts_color_aliases() {
        let seat: Seat = serde_json::from_str("\"white\"").unwrap();
        assert_eq!(seat, Seat::First);
        let seat: Seat = serde_json::from_str("\"black\"").unwrap();
        assert_eq!(seat, Seat::Second);
        assert_eq!(serde_json::to_string(&Seat::Second).unwrap(), "\"second\"");
    }

    #[test]
    fn opponent_is_involution() {
        assert_eq!(Seat::First.opponent(), Seat::Second);
        assert_eq!(Seat::First.opponent().opponent(), Seat::First);
    }
}
