//! Channel lifecycle state machine.
//!
//! One [`Connection`] tracks one channel attempt from the moment the client
//! asks a driver to open it until it is closed.
//!
//! # Architecture: Action-Based State Machine
//!
//! - Methods accept time as parameter (no stored Environment)
//! - Methods return actions or `Result<_, ConnectionError>`
//! - Driver code executes actions (close the channel, ...)
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐  open   ┌─────────┐   init    ┌─────────────┐
//! │ Init │────────>│ Pending │──────────>│ Established │
//! └──────┘         └─────────┘           └─────────────┘
//!                       │                       │
//!                       │ Timeout/Error/close   │ close / peer closed
//!                       ↓                       ↓
//!                  ┌────────┐              ┌────────┐
//!                  │ Closed │<─────────────│ Closed │
//!                  └────────┘              └────────┘
//! ```
//!
//! # Timeouts
//!
//! Only the handshake is timed: a channel that stays `Pending` longer than
//! [`ConnectionConfig::handshake_timeout`] is closed by [`Connection::tick`].
//! An established channel may stay silent indefinitely; turn-based games
//! routinely go minutes without traffic.

use std::{
    fmt,
    ops::{Add, Sub},
    time::Duration,
};

use crate::error::ConnectionError;

/// Identifies one channel attempt. Strictly increasing per client, so events
/// from an earlier channel can never be mistaken for the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Close the channel with this reason
    Close {
        /// Reason for closing the channel
        reason: String,
    },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, channel not requested yet
    Init,
    /// Channel requested, waiting for the server's `init`
    Pending,
    /// `init` received, session synchronised at least once
    Established,
    /// Channel closed (graceful or error)
    Closed,
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Time allowed between requesting the channel and receiving `init`
    pub handshake_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { handshake_timeout: Duration::from_secs(10) }
    }
}

/// Connection state machine for a single channel attempt.
///
/// This is a pure state machine - no I/O, no Environment storage.
/// Time is passed as parameters to methods that need it.
#[derive(Debug, Clone)]
pub struct Connection<I> {
    id: ChannelId,
    state: ConnectionState,
    config: ConnectionConfig,
    /// When the channel was requested (Pending) or last (re)synchronised
    since: I,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Create a new connection in Init state
    pub fn new(id: ChannelId, now: I, config: ConnectionConfig) -> Self {
        Self { id, state: ConnectionState::Init, config, since: now }
    }

    /// Channel this connection tracks.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Get current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Channel is requested or established.
    pub fn is_open(&self) -> bool {
        matches!(self.state, ConnectionState::Pending | ConnectionState::Established)
    }

    /// Transition to Pending (channel requested).
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if not in Init state
    pub fn open(&mut self, now: I) -> Result<(), ConnectionError> {
        if self.state != ConnectionState::Init {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "open" });
        }
        self.state = ConnectionState::Pending;
        self.since = now;
        Ok(())
    }

    /// Record an `init` handshake. Servers may re-send `init` on an
    /// established channel; that is accepted too.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless Pending or Established
    pub fn receive_init(&mut self, now: I) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::Pending | ConnectionState::Established => {
                self.state = ConnectionState::Established;
                self.since = now;
                Ok(())
            },
            state => Err(ConnectionError::InvalidState { state, operation: "receive init" }),
        }
    }

    /// Transition to Closed. Returns `false` if the connection was already
    /// closed (or never opened), in which case nothing changes.
    pub fn close(&mut self) -> bool {
        let was_open = self.is_open();
        self.state = ConnectionState::Closed;
        was_open
    }

    /// Check if the handshake has timed out
    ///
    /// # Returns
    /// `Some(elapsed)` if timed out, `None` otherwise
    pub fn check_timeout(&self, now: I) -> Option<Duration> {
        if self.state != ConnectionState::Pending || now < self.since {
            return None;
        }
        let elapsed = now - self.since;
        if elapsed > self.config.handshake_timeout { Some(elapsed) } else { None }
    }

    /// Tick the state machine - check for handshake timeout
    ///
    /// Call this periodically (e.g. every 250ms).
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.check_timeout(now) {
            Some(elapsed) => {
                self.close();
                vec![ConnectionAction::Close { reason: format!("handshake timeout after {elapsed:?}") }]
            },
            None => Vec::new(),
        }
    }
}
