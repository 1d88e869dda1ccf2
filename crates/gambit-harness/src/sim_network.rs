//! In-memory network between clients and the simulated server.
//!
//! Executes [`ClientAction`]s on behalf of named actors and queues the
//! resulting completions as [`ClientEvent`]s in one mailbox per actor.
//! Delivery is instantaneous and ordered, so a test decides interleavings by
//! choosing which mailbox to drain next. Faults are injected explicitly.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use gambit_client::{ClientAction, ClientEvent, FetchKind};
use gambit_core::{ChannelId, HttpError, Position, RulesEngine};
use gambit_proto::{ClientId, SessionId};
use tracing::{debug, warn};
use url::Url;

use crate::sim_server::{ParticipantId, ServerOutput, SimServer};

/// Routes client actions to a [`SimServer`].
pub struct SimNetwork {
    server: SimServer,
    next_participant: ParticipantId,
    links: HashMap<ParticipantId, (String, ChannelId)>,
    by_channel: HashMap<(String, ChannelId), ParticipantId>,
    mailboxes: BTreeMap<String, VecDeque<ClientEvent>>,
    executed: usize,
    failing_fetches: usize,
    refuse_connections: bool,
    mute_handshakes: bool,
}

/// Network shared by several drivers.
pub type SharedSimNetwork = Arc<Mutex<SimNetwork>>;

impl SimNetwork {
    /// Network in front of `server`.
    pub fn new(server: SimServer) -> Self {
        Self {
            server,
            next_participant: 1,
            links: HashMap::new(),
            by_channel: HashMap::new(),
            mailboxes: BTreeMap::new(),
            executed: 0,
            failing_fetches: 0,
            refuse_connections: false,
            mute_handshakes: false,
        }
    }

    /// Wrap for sharing between drivers.
    pub fn shared(self) -> SharedSimNetwork {
        Arc::new(Mutex::new(self))
    }

    /// The server.
    pub fn server(&self) -> &SimServer {
        &self.server
    }

    /// Run `f` against the server and deliver whatever it emits.
    pub fn with_server(&mut self, f: impl FnOnce(&mut SimServer) -> Vec<ServerOutput>) {
        let outputs = f(&mut self.server);
        self.route(outputs);
    }

    /// Fail the next `count` fetches with HTTP 503.
    pub fn fail_fetches(&mut self, count: usize) {
        self.failing_fetches = count;
    }

    /// Make every channel open fail.
    pub fn refuse_connections(&mut self, refuse: bool) {
        self.refuse_connections = refuse;
    }

    /// Accept channels but never send the handshake.
    pub fn mute_handshakes(&mut self, mute: bool) {
        self.mute_handshakes = mute;
    }

    /// Actions executed so far.
    pub fn executed(&self) -> usize {
        self.executed
    }

    /// Live channels belonging to `actor`.
    pub fn live_channels(&self, actor: &str) -> usize {
        self.links.values().filter(|(owner, _)| owner == actor).count()
    }

    /// Server-side participant behind `actor`'s live channel.
    pub fn participant_of(&self, actor: &str) -> Option<ParticipantId> {
        self.links.iter().find(|(_, (owner, _))| owner == actor).map(|(&p, _)| p)
    }

    /// Whether any mailbox holds an event.
    pub fn is_busy(&self) -> bool {
        self.mailboxes.values().any(|m| !m.is_empty())
    }

    /// Actors with queued events, in name order.
    pub fn busy_actors(&self) -> Vec<String> {
        self.mailboxes.iter().filter(|(_, m)| !m.is_empty()).map(|(a, _)| a.clone()).collect()
    }

    /// Take the next event for `actor`.
    pub fn next_event(&mut self, actor: &str) -> Option<ClientEvent> {
        self.mailboxes.get_mut(actor)?.pop_front()
    }

    /// Server drops `actor`'s channel.
    pub fn drop_channel(&mut self, actor: &str) -> bool {
        let Some(participant) = self.participant_of(actor) else {
            return false;
        };
        self.server.disconnect(participant);
        self.unlink(participant, Some("connection reset".to_string()));
        true
    }

    /// Deliver arbitrary text on `actor`'s live channel.
    pub fn inject(&mut self, actor: &str, text: impl Into<String>) -> bool {
        let Some(participant) = self.participant_of(actor) else {
            return false;
        };
        self.route(vec![ServerOutput::Deliver { to: participant, text: text.into() }]);
        true
    }

    /// Execute one action for `actor`.
    pub fn execute(&mut self, actor: &str, action: ClientAction) {
        self.executed += 1;
        match action {
            ClientAction::OpenChannel { channel, url } => self.open(actor, channel, &url),
            ClientAction::CloseChannel { channel } => {
                if let Some(participant) = self.by_channel.remove(&(actor.to_string(), channel)) {
                    self.links.remove(&participant);
                    self.server.disconnect(participant);
                }
            },
            ClientAction::Send { channel, text } => {
                match self.by_channel.get(&(actor.to_string(), channel)).copied() {
                    Some(participant) => {
                        let outputs = self.server.receive(participant, &text);
                        self.route(outputs);
                    },
                    None => self.push(actor, ClientEvent::SendFailed {
                        channel,
                        error: "channel is not open".into(),
                    }),
                }
            },
            ClientAction::Fetch { request, .. } => {
                let result = self.fetch(&request);
                self.push(actor, ClientEvent::Fetched { request, result });
            },
        }
    }

    fn open(&mut self, actor: &str, channel: ChannelId, url: &Url) {
        if self.refuse_connections {
            self.push(actor, ClientEvent::ChannelFailed {
                channel,
                error: "connection refused".into(),
            });
            return;
        }
        let Some((session, client)) = parse_channel_url(url) else {
            warn!(%url, "unroutable channel address");
            self.push(actor, ClientEvent::ChannelFailed { channel, error: "bad address".into() });
            return;
        };
        let participant = self.next_participant;
        self.next_participant += 1;
        self.links.insert(participant, (actor.to_string(), channel));
        self.by_channel.insert((actor.to_string(), channel), participant);
        debug!(actor, %channel, participant, %session, "channel linked");
        self.push(actor, ClientEvent::ChannelOpened { channel });
        if !self.mute_handshakes {
            let outputs = self.server.connect(participant, session, &client);
            self.route(outputs);
        }
    }

    fn fetch(&mut self, request: &FetchKind) -> Result<String, HttpError> {
        if self.failing_fetches > 0 {
            self.failing_fetches -= 1;
            return Err(HttpError::Status(503));
        }
        match request {
            FetchKind::Listing => encode(&self.server.listing()),
            FetchKind::Snapshot(session) => {
                let snapshot = self.server.snapshot(session).ok_or(HttpError::Status(404))?;
                encode(&snapshot)
            },
            FetchKind::Suggestion(position) => Ok(suggest(&self.server, position)),
            FetchKind::Evaluation(_) => Ok(r#"{"evaluation":0}"#.to_string()),
        }
    }

    fn route(&mut self, outputs: Vec<ServerOutput>) {
        for output in outputs {
            match output {
                ServerOutput::Deliver { to, text } => {
                    if let Some((actor, channel)) = self.links.get(&to).cloned() {
                        self.push(&actor, ClientEvent::ChannelMessage { channel, text });
                    }
                },
                ServerOutput::Close { participant } => {
                    self.server.disconnect(participant);
                    self.unlink(participant, None);
                },
            }
        }
    }

    fn unlink(&mut self, participant: ParticipantId, reason: Option<String>) {
        if let Some((actor, channel)) = self.links.remove(&participant) {
            self.by_channel.remove(&(actor.clone(), channel));
            self.push(&actor, ClientEvent::ChannelClosed { channel, reason });
        }
    }

    fn push(&mut self, actor: &str, event: ClientEvent) {
        self.mailboxes.entry(actor.to_string()).or_default().push_back(event);
    }
}

impl Default for SimNetwork {
    fn default() -> Self {
        Self::new(SimServer::default())
    }
}

/// Session and client id encoded in a channel address
/// (`/ws/chess/{session}?client_id={id}`).
pub fn parse_channel_url(url: &Url) -> Option<(SessionId, ClientId)> {
    let session = url.path_segments()?.rfind(|s| !s.is_empty())?;
    let session = SessionId::new(session).ok()?;
    let client = url.query_pairs().find(|(key, _)| key == "client_id")?.1;
    Some((session, ClientId::new(client.into_owned())))
}

fn encode<T: serde::Serialize>(body: &T) -> Result<String, HttpError> {
    serde_json::to_string(body).map_err(|e| HttpError::Transport(e.to_string()))
}

/// First legal move, in coordinate notation.
fn suggest(server: &SimServer, position: &Position) -> String {
    let best = server
        .rules()
        .legal_moves(position)
        .ok()
        .and_then(|moves| moves.into_iter().next())
        .map(|m| m.to_string());
    serde_json::json!({ "best_move": best }).to_string()
}
