//! Client actions (outputs of the state machine).

use gambit_core::{ChannelId, HttpRequest};
use url::Url;

use crate::FetchKind;

/// I/O the driver must perform on behalf of the client.
///
/// Returned in order; drivers execute them in that order. A `CloseChannel`
/// for the previous session always precedes the `OpenChannel` of the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open a channel. Completion is reported with
    /// [`ClientEvent::ChannelOpened`](crate::ClientEvent::ChannelOpened) or
    /// [`ClientEvent::ChannelFailed`](crate::ClientEvent::ChannelFailed).
    OpenChannel {
        /// Identifier to tag every event from this channel with
        channel: ChannelId,
        /// Address to connect to
        url: Url,
    },

    /// Close a channel. Closing an unknown or already closed channel is a
    /// no-op for the driver.
    CloseChannel {
        /// Channel to close
        channel: ChannelId,
    },

    /// Send a text message on an open channel
    Send {
        /// Target channel
        channel: ChannelId,
        /// Encoded message
        text: String,
    },

    /// Issue an HTTP request and report the result with
    /// [`ClientEvent::Fetched`](crate::ClientEvent::Fetched)
    Fetch {
        /// Echoed back with the result
        request: FetchKind,
        /// Request to execute
        http: HttpRequest,
    },
}
