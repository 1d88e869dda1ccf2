//! Command parsing for the line-oriented interface.
//!
//! This module parses input lines into structured [`Command`] values.

use gambit_client::ClientEvent;
use gambit_core::{MoveRequest, PlayMode, SearchMode};
use gambit_proto::SessionId;

/// Parsed command from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch play mode.
    Mode {
        /// Requested mode.
        mode: PlayMode,
    },

    /// Join a session by id.
    Join {
        /// Session to join.
        session: SessionId,
    },

    /// Create a session with a fresh id and join it.
    Create,

    /// Leave the current session.
    Leave,

    /// Play a move.
    Move {
        /// Move in coordinate form.
        request: MoveRequest,
    },

    /// Take back the last move.
    Undo,

    /// Start over from the initial position.
    Reset,

    /// Ask the computation service for a move and play it.
    Hint,

    /// Draw the current state again.
    Redraw,

    /// Show the command list.
    Help,

    /// Quit the application.
    Quit,

    /// Unknown or invalid command.
    Unknown {
        /// The original input.
        input: String,
    },

    /// Command with missing or invalid arguments.
    InvalidArgs {
        /// Command name.
        command: String,
        /// Error message.
        error: String,
    },
}

impl Command {
    /// Client event this command stands for. Commands handled by the
    /// frontend itself map to `None`.
    pub fn into_event(self) -> Option<ClientEvent> {
        match self {
            Self::Mode { mode } => Some(ClientEvent::SetMode(mode)),
            Self::Join { session } => Some(ClientEvent::JoinSession(session)),
            Self::Create => Some(ClientEvent::CreateSession),
            Self::Leave => Some(ClientEvent::LeaveSession),
            Self::Move { request } => Some(ClientEvent::Submit(request)),
            Self::Undo => Some(ClientEvent::Undo),
            Self::Reset => Some(ClientEvent::Reset),
            Self::Hint => Some(ClientEvent::RequestSuggestion),
            Self::Quit => Some(ClientEvent::Shutdown),
            Self::Redraw | Self::Help | Self::Unknown { .. } | Self::InvalidArgs { .. } => None,
        }
    }
}

/// Command reference shown by `/help`.
pub const HELP: &str = "\
/mode local|engine [engine|minimax]|online   switch play mode
/create                                      start a new online session
/join <id>                                   join an online session
/leave                                       leave the session
/move <e2e4> (or just e2e4)                  play a move
/undo, /reset                                offline only
/hint                                        engine mode: play the suggested move
/quit                                        exit";

/// Parse a user input string into a command.
///
/// Commands start with `/`. Anything else is treated as a move.
pub fn parse(input: &str) -> Command {
    let input = input.trim();

    if input.is_empty() {
        return Command::Redraw;
    }

    let Some(cmd_str) = input.strip_prefix('/') else {
        return parse_move("move", input);
    };

    let parts: Vec<&str> = cmd_str.split_whitespace().collect();
    let command = parts.first().copied().unwrap_or("");

    match command {
        "mode" => parse_mode(parts.get(1).copied(), parts.get(2).copied()),

        "join" => match parts.get(1) {
            Some(raw) => match SessionId::new(raw) {
                Ok(session) => Command::Join { session },
                Err(e) => Command::InvalidArgs { command: "join".into(), error: e.to_string() },
            },
            None => Command::InvalidArgs {
                command: "join".into(),
                error: "Usage: /join <session_id>".into(),
            },
        },

        "create" | "new" => Command::Create,

        "leave" => Command::Leave,

        "move" | "m" => match parts.get(1) {
            Some(coordinates) => parse_move("move", coordinates),
            None => Command::InvalidArgs {
                command: "move".into(),
                error: "Usage: /move <from><to>[promotion]".into(),
            },
        },

        "undo" => Command::Undo,

        "reset" => Command::Reset,

        "hint" => Command::Hint,

        "help" | "h" | "?" => Command::Help,

        "quit" | "q" => Command::Quit,

        _ => Command::Unknown { input: input.to_string() },
    }
}

fn parse_move(command: &str, coordinates: &str) -> Command {
    match MoveRequest::from_coordinates(coordinates) {
        Ok(request) => Command::Move { request },
        Err(e) => Command::InvalidArgs { command: command.into(), error: e.to_string() },
    }
}

fn parse_mode(mode: Option<&str>, search: Option<&str>) -> Command {
    let invalid = |error: &str| Command::InvalidArgs { command: "mode".into(), error: error.into() };
    match mode {
        Some("local") => Command::Mode { mode: PlayMode::Local },
        Some("online" | "networked") => Command::Mode { mode: PlayMode::Networked },
        Some("engine") => match parse_search(search) {
            Some(search) => Command::Mode { mode: PlayMode::Engine { search } },
            None => invalid("Search must be engine or minimax"),
        },
        _ => invalid("Usage: /mode local|engine [engine|minimax]|online"),
    }
}

/// Parse a search flavour name. No name means the default.
pub fn parse_search(raw: Option<&str>) -> Option<SearchMode> {
    match raw {
        None | Some("engine") => Some(SearchMode::Engine),
        Some("minimax") => Some(SearchMode::Minimax),
        Some(_) => None,
    }
}
