//! Session connector.
//!
//! Maps the selected session to at most one live channel. Each channel
//! attempt gets a fresh [`ChannelId`] and its own [`Connection`] state
//! machine; events tagged with any other id are stale.
//!
//! The connector also keeps the two retry budgets: channel attempts per
//! handshake and consecutive snapshot fetches per resync.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

use gambit_core::{ChannelId, Connection, ConnectionAction, ConnectionConfig, ConnectionError};
use gambit_proto::SessionId;
use tracing::{debug, warn};
use url::Url;

use crate::{ClientAction, ClientConfig};

/// Result of checking the handshake timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeCheck {
    /// Nothing to do
    Idle,
    /// Timed out; channel closed and re-opened
    Retried(Vec<ClientAction>),
    /// Timed out with no attempts left; channel closed
    Exhausted(Vec<ClientAction>),
}

#[derive(Debug, Clone)]
struct Target {
    session: SessionId,
    url: Url,
}

/// Channel owner for the selected session.
#[derive(Debug, Clone)]
pub struct Connector<I> {
    config: ConnectionConfig,
    max_handshake_attempts: u32,
    max_resync_attempts: u32,
    next_channel: u64,
    target: Option<Target>,
    connection: Option<Connection<I>>,
    handshake_attempts: u32,
    resync_attempts: u32,
}

impl<I> Connector<I>
where
    I: Copy + Ord + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Connector with no session selected.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            config: config.connection.clone(),
            max_handshake_attempts: config.max_handshake_attempts.max(1),
            max_resync_attempts: config.max_resync_attempts,
            next_channel: 1,
            target: None,
            connection: None,
            handshake_attempts: 0,
            resync_attempts: 0,
        }
    }

    /// Selected session.
    pub fn session(&self) -> Option<&SessionId> {
        self.target.as_ref().map(|t| &t.session)
    }

    /// Currently open channel.
    pub fn channel(&self) -> Option<ChannelId> {
        self.connection.as_ref().filter(|c| c.is_open()).map(Connection::id)
    }

    /// Whether `channel` is the live channel. Anything else is stale.
    pub fn is_current(&self, channel: ChannelId) -> bool {
        self.channel() == Some(channel)
    }

    /// Select `session` and open a channel to `url`, closing any previous
    /// channel first.
    pub fn open(&mut self, session: SessionId, url: Url, now: I) -> Vec<ClientAction> {
        let mut actions = self.close();
        self.target = Some(Target { session, url });
        self.handshake_attempts = 0;
        self.resync_attempts = 0;
        actions.extend(self.dial(now));
        actions
    }

    fn dial(&mut self, now: I) -> Option<ClientAction> {
        let target = self.target.as_ref()?;
        let channel = ChannelId(self.next_channel);
        self.next_channel += 1;

        let mut connection = Connection::new(channel, now, self.config.clone());
        if let Err(error) = connection.open(now) {
            warn!(%error, %channel, "fresh connection refused to open");
            return None;
        }
        self.handshake_attempts += 1;
        debug!(%channel, session = %target.session, attempt = self.handshake_attempts, "opening channel");

        let url = target.url.clone();
        self.connection = Some(connection);
        Some(ClientAction::OpenChannel { channel, url })
    }

    /// Close the live channel, keeping the session selected. Idempotent.
    pub fn close(&mut self) -> Vec<ClientAction> {
        match self.connection.take() {
            Some(mut connection) => {
                if connection.close() {
                    vec![ClientAction::CloseChannel { channel: connection.id() }]
                } else {
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    }

    /// Close the live channel and deselect the session. Idempotent.
    pub fn leave(&mut self) -> Vec<ClientAction> {
        let actions = self.close();
        self.target = None;
        actions
    }

    /// Peer closed `channel`. Returns `false` for stale channels.
    pub fn on_closed(&mut self, channel: ChannelId) -> bool {
        if !self.is_current(channel) {
            return false;
        }
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
        true
    }

    /// Handshake received on the live channel. Refills both budgets.
    pub fn on_init(&mut self, now: I) -> Result<(), ConnectionError> {
        if let Some(connection) = self.connection.as_mut() {
            connection.receive_init(now)?;
        }
        self.handshake_attempts = 0;
        self.resync_attempts = 0;
        Ok(())
    }

    /// Check the handshake timer.
    pub fn tick(&mut self, now: I) -> HandshakeCheck {
        let Some(connection) = self.connection.as_mut() else {
            return HandshakeCheck::Idle;
        };
        let channel = connection.id();
        let timed_out = connection.tick(now);
        let Some(ConnectionAction::Close { reason }) = timed_out.into_iter().next() else {
            return HandshakeCheck::Idle;
        };

        warn!(%channel, %reason, attempt = self.handshake_attempts, "handshake timed out");
        self.connection = None;
        let mut actions = vec![ClientAction::CloseChannel { channel }];

        if self.handshake_attempts >= self.max_handshake_attempts {
            return HandshakeCheck::Exhausted(actions);
        }
        actions.extend(self.dial(now));
        HandshakeCheck::Retried(actions)
    }

    /// Spend one resync attempt. Returns `false` when the budget is gone.
    pub fn begin_resync(&mut self) -> bool {
        if self.resync_attempts >= self.max_resync_attempts {
            return false;
        }
        self.resync_attempts += 1;
        true
    }

    /// A snapshot brought the mirror back in step.
    pub fn resync_succeeded(&mut self) {
        self.resync_attempts = 0;
    }
}
