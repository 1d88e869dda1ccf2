//! Client events (inputs to the state machine).

use gambit_core::{ChannelId, HttpError, MoveRequest, PlayMode, Position};
use gambit_proto::SessionId;

/// Which auxiliary request a fetch belongs to.
///
/// Echoed back unchanged in [`ClientEvent::Fetched`] so the client can drop
/// responses that no longer apply (another session selected, position moved
/// on).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchKind {
    /// Joinable session listing
    Listing,
    /// Authoritative snapshot of a session
    Snapshot(SessionId),
    /// Suggested move for a position
    Suggestion(Position),
    /// Scalar evaluation of a position
    Evaluation(Position),
}

/// Events that drive the client.
///
/// User intents, timer ticks and every I/O completion arrive here, one at a
/// time, in the order the driver observed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Switch play mode, tearing down any session
    SetMode(PlayMode),

    /// Join an existing session (picked from the listing or typed)
    JoinSession(SessionId),

    /// Start a new session under a freshly generated identifier
    CreateSession,

    /// Leave the current session and resume discovery
    LeaveSession,

    /// Local participant proposes a move
    Submit(MoveRequest),

    /// Take back the last move (offline modes)
    Undo,

    /// Start over from the initial position (offline modes)
    Reset,

    /// Ask the computation service for a move (engine mode)
    RequestSuggestion,

    /// Periodic timer
    Tick,

    /// Driver finished opening a channel
    ChannelOpened {
        /// Channel that opened
        channel: ChannelId,
    },

    /// Text message received on a channel
    ChannelMessage {
        /// Receiving channel
        channel: ChannelId,
        /// Raw message
        text: String,
    },

    /// Peer closed the channel
    ChannelClosed {
        /// Closed channel
        channel: ChannelId,
        /// Close reason, if the transport reported one
        reason: Option<String>,
    },

    /// Channel could not be opened or broke while reading
    ChannelFailed {
        /// Failed channel
        channel: ChannelId,
        /// Transport error
        error: String,
    },

    /// A send on the channel failed
    SendFailed {
        /// Channel the send was attempted on
        channel: ChannelId,
        /// Transport error
        error: String,
    },

    /// An auxiliary HTTP request completed
    Fetched {
        /// Request this answers
        request: FetchKind,
        /// Response body or failure
        result: Result<String, HttpError>,
    },

    /// Application is exiting
    Shutdown,
}
