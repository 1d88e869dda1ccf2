//! Session domain types.

use std::fmt;

use gambit_proto::{ClientMessage, MovePayload, ProtocolError};

/// Canonical encoding of a full game position.
///
/// Produced and consumed only by the rules engine and carried opaquely
/// everywhere else. Replaced on every accepted move, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position(String);

impl Position {
    /// Wrap an encoding without validating it. Validation is the rules
    /// engine's job.
    pub fn new(encoding: impl Into<String>) -> Self {
        Self(encoding.into())
    }

    /// Borrow the encoding.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A move in from/to/promotion form, as exchanged on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoveRequest {
    /// Origin square
    pub from: String,
    /// Target square
    pub to: String,
    /// Promotion piece letter, lowercase
    pub promotion: Option<char>,
}

impl MoveRequest {
    /// A move without promotion.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), promotion: None }
    }

    /// Same move with a promotion piece.
    #[must_use]
    pub fn with_promotion(mut self, piece: char) -> Self {
        self.promotion = Some(piece.to_ascii_lowercase());
        self
    }

    /// Parse coordinate notation: `e2e4`, `e7e8q`.
    pub fn from_coordinates(text: &str) -> Result<Self, ProtocolError> {
        let text = text.trim();
        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(ProtocolError::InvalidMove(text.to_string()));
        }
        let request = Self::new(&text[0..2], &text[2..4]);
        Ok(match text[4..].chars().next() {
            Some(piece) => request.with_promotion(piece),
            None => request,
        })
    }

    /// Read a server-delivered move.
    pub fn from_payload(payload: &MovePayload) -> Result<Self, ProtocolError> {
        let request = Self::new(payload.from.clone(), payload.to.clone());
        match payload.promotion.as_deref() {
            None | Some("") => Ok(request),
            Some(piece) => {
                let mut chars = piece.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(request.with_promotion(c)),
                    _ => Err(ProtocolError::InvalidMove(format!(
                        "{}{}{piece}",
                        payload.from, payload.to
                    ))),
                }
            },
        }
    }

    /// Outbound wire message for this move.
    pub fn to_message(&self) -> ClientMessage {
        ClientMessage::Move {
            from: self.from.clone(),
            to: self.to.clone(),
            promotion: self.promotion.map(String::from),
        }
    }
}

impl fmt::Display for MoveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(piece) = self.promotion {
            write!(f, "{piece}")?;
        }
        Ok(())
    }
}

/// Lifecycle status of a session as the client sees it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No session
    #[default]
    Absent,
    /// Seat filled on one side only; nobody may move yet
    Waiting,
    /// Moves are being accepted
    Ongoing,
    /// Ended without a winner
    Drawn,
    /// First seat won
    WonFirst,
    /// Second seat won
    WonSecond,
    /// Channel closed
    Disconnected,
    /// Session failed; text is shown to the user
    Errored(String),
}

impl SessionStatus {
    /// Parse a server status string.
    ///
    /// `None` (field absent) means `ongoing`.
    pub fn from_wire(raw: Option<&str>) -> Result<Self, ProtocolError> {
        let Some(raw) = raw else {
            return Ok(Self::Ongoing);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "ongoing" => Ok(Self::Ongoing),
            "waiting" => Ok(Self::Waiting),
            "draw" | "drawn" | "stalemate" => Ok(Self::Drawn),
            "won_first" | "white_wins" | "1-0" => Ok(Self::WonFirst),
            "won_second" | "black_wins" | "0-1" => Ok(Self::WonSecond),
            _ => Err(ProtocolError::UnknownStatus(raw.to_string())),
        }
    }

    /// The game is over; no further moves are accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Drawn | Self::WonFirst | Self::WonSecond)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("no session"),
            Self::Waiting => f.write_str("waiting for opponent"),
            Self::Ongoing => f.write_str("ongoing"),
            Self::Drawn => f.write_str("drawn"),
            Self::WonFirst => f.write_str("first seat won"),
            Self::WonSecond => f.write_str("second seat won"),
            Self::Disconnected => f.write_str("disconnected"),
            Self::Errored(reason) => f.write_str(reason),
        }
    }
}

/// Search flavour requested from the computation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Full engine search
    #[default]
    Engine,
    /// Shallow minimax
    Minimax,
}

impl SearchMode {
    /// Query parameter value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Minimax => "minimax",
        }
    }
}

/// How the local client is being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    /// Two players at one client
    #[default]
    Local,
    /// Local play with evaluation and move suggestions from the computation
    /// service
    Engine {
        /// Search flavour
        search: SearchMode,
    },
    /// Remote session through the server
    Networked,
}

impl PlayMode {
    /// Whether this mode talks to a session server.
    pub fn is_networked(self) -> bool {
        matches!(self, Self::Networked)
    }
}
