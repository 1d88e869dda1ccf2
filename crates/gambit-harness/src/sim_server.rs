//! Authoritative session server model.
//!
//! A small, synchronous stand-in for the real game server: it owns the
//! canonical position of every session, assigns seats, validates moves with
//! the same [`RulesEngine`] the client uses and broadcasts accepted moves to
//! every attached participant (the mover included, which is how clients see
//! their own echo). Transport is someone else's problem; inputs are
//! participant ids and raw text, outputs are [`ServerOutput`]s.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use gambit_core::{ChessRules, MoveRequest, Position, RulesEngine, SessionStatus};
use gambit_proto::{
    ClientId, ClientMessage, ColorAssignment, ErrorPayload, InitPayload, MovePayload, Seat,
    ServerMessage, SessionId, SessionListing, SessionSnapshot, StatusPayload,
};
use tracing::{debug, info, warn};

/// One end of a server connection.
pub type ParticipantId = u64;

/// Message the server reports when no seat is free.
pub const FULL_MESSAGE: &str = "Game is full";

/// Effect of feeding the server an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerOutput {
    /// Send `text` to a participant
    Deliver {
        /// Recipient
        to: ParticipantId,
        /// Encoded [`ServerMessage`]
        text: String,
    },
    /// Close a participant's connection
    Close {
        /// Participant to drop
        participant: ParticipantId,
    },
}

/// Server-side state of one session.
#[derive(Debug, Clone)]
pub struct SimSession {
    position: Position,
    history: Vec<String>,
    status: SessionStatus,
    seats: [Option<ClientId>; 2],
    attached: BTreeMap<ParticipantId, Seat>,
}

impl SimSession {
    fn new(position: Position) -> Self {
        Self {
            position,
            history: Vec::new(),
            status: SessionStatus::Waiting,
            seats: [None, None],
            attached: BTreeMap::new(),
        }
    }

    /// Canonical position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Accepted moves in notation.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Session status.
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Seat held by `client`, if any.
    pub fn seat_of(&self, client: &ClientId) -> Option<Seat> {
        [Seat::First, Seat::Second]
            .into_iter()
            .find(|&seat| self.seats[seat_index(seat)].as_ref() == Some(client))
    }

    /// Participants currently attached.
    pub fn attached(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.attached.keys().copied()
    }

    fn has_free_seat(&self) -> bool {
        self.seats.iter().any(Option::is_none)
    }

    fn claim_seat(&mut self, client: &ClientId) -> Option<Seat> {
        if let Some(seat) = self.seat_of(client) {
            return Some(seat);
        }
        let seat = [Seat::First, Seat::Second]
            .into_iter()
            .find(|&seat| self.seats[seat_index(seat)].is_none())?;
        self.seats[seat_index(seat)] = Some(client.clone());
        Some(seat)
    }

    fn init(&self, seat: Seat) -> ServerMessage {
        ServerMessage::Init(InitPayload {
            fen: self.position.as_str().to_string(),
            move_history: self.history.clone(),
            status: Some(wire_status(&self.status).to_string()),
            color: Some(seat),
        })
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            fen: self.position.as_str().to_string(),
            move_history: self.history.clone(),
            status: Some(wire_status(&self.status).to_string()),
        }
    }
}

/// Authoritative session server.
pub struct SimServer<R: RulesEngine = ChessRules> {
    rules: R,
    sessions: BTreeMap<SessionId, SimSession>,
    participants: HashMap<ParticipantId, SessionId>,
}

/// Server shared between simulated hosts.
pub type SharedSimServer = Arc<Mutex<SimServer>>;

/// Create a chess server behind a mutex.
pub fn create_shared_server() -> SharedSimServer {
    Arc::new(Mutex::new(SimServer::default()))
}

impl Default for SimServer {
    fn default() -> Self {
        Self::new(ChessRules)
    }
}

impl<R: RulesEngine> SimServer<R> {
    /// Empty server.
    pub fn new(rules: R) -> Self {
        Self { rules, sessions: BTreeMap::new(), participants: HashMap::new() }
    }

    /// Rules engine validating moves.
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Look up a session.
    pub fn session(&self, id: &SessionId) -> Option<&SimSession> {
        self.sessions.get(id)
    }

    /// Every session, ordered by id.
    pub fn sessions(&self) -> impl Iterator<Item = (&SessionId, &SimSession)> {
        self.sessions.iter()
    }

    /// Session a participant is attached to.
    pub fn session_of(&self, participant: ParticipantId) -> Option<&SessionId> {
        self.participants.get(&participant)
    }

    /// Sessions that still have a free seat and are not finished.
    pub fn listing(&self) -> SessionListing {
        let sessions = self
            .sessions
            .iter()
            .filter(|(_, s)| s.has_free_seat() && !s.status.is_terminal())
            .map(|(id, _)| id.clone())
            .collect();
        SessionListing { sessions }
    }

    /// Authoritative snapshot of a session.
    pub fn snapshot(&self, id: &SessionId) -> Option<SessionSnapshot> {
        self.sessions.get(id).map(SimSession::snapshot)
    }

    /// Open a session without attaching anyone. Returns `false` if it
    /// already exists.
    pub fn create(&mut self, id: SessionId) -> bool {
        if self.sessions.contains_key(&id) {
            return false;
        }
        self.sessions.insert(id, SimSession::new(self.rules.initial_position()));
        true
    }

    /// A participant connected to `session` as `client`.
    ///
    /// Unknown sessions are created on first join. Returning clients get
    /// their old seat back; everybody else gets the first free one or is
    /// turned away.
    pub fn connect(
        &mut self,
        participant: ParticipantId,
        session_id: SessionId,
        client: &ClientId,
    ) -> Vec<ServerOutput> {
        self.disconnect(participant);
        self.create(session_id.clone());
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return Vec::new();
        };

        let Some(seat) = session.claim_seat(client) else {
            info!(%session_id, %client, "rejecting join, session is full");
            let error = ServerMessage::Error(ErrorPayload { message: FULL_MESSAGE.to_string() });
            let mut outputs: Vec<ServerOutput> = deliver(participant, &error).into_iter().collect();
            outputs.push(ServerOutput::Close { participant });
            return outputs;
        };
        info!(%session_id, %client, ?seat, "participant joined");
        session.attached.insert(participant, seat);
        self.participants.insert(participant, session_id.clone());

        let mut outputs = Vec::new();
        let started = session.status == SessionStatus::Waiting && !session.has_free_seat();
        if started {
            session.status = SessionStatus::Ongoing;
        }
        outputs.extend(deliver(participant, &session.init(seat)));
        if started {
            let status = ServerMessage::Status(StatusPayload {
                status: wire_status(&session.status).to_string(),
            });
            outputs.extend(broadcast(session, &status, Some(participant)));
        }
        outputs
    }

    /// A participant's connection went away. Seats are kept for reconnects.
    pub fn disconnect(&mut self, participant: ParticipantId) {
        if let Some(id) = self.participants.remove(&participant) {
            if let Some(session) = self.sessions.get_mut(&id) {
                session.attached.remove(&participant);
            }
            debug!(session = %id, participant, "participant detached");
        }
    }

    /// Text received from a participant.
    ///
    /// Only moves are understood. Moves out of turn, from spectators, on
    /// finished sessions or rejected by the rules are dropped silently.
    pub fn receive(&mut self, participant: ParticipantId, text: &str) -> Vec<ServerOutput> {
        let Some(session_id) = self.participants.get(&participant) else {
            warn!(participant, "message from detached participant");
            return Vec::new();
        };
        let Some(session) = self.sessions.get_mut(session_id) else {
            return Vec::new();
        };
        let ClientMessage::Move { from, to, promotion } = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(error) => {
                warn!(participant, %error, "unparseable client message");
                return Vec::new();
            },
        };
        let Some(&seat) = session.attached.get(&participant) else {
            return Vec::new();
        };
        if session.status != SessionStatus::Ongoing {
            debug!(participant, status = %session.status, "move outside play dropped");
            return Vec::new();
        }
        if self.rules.side_to_move(&session.position).ok() != Some(seat) {
            debug!(participant, ?seat, "move out of turn dropped");
            return Vec::new();
        }

        let mut request = MoveRequest::new(from.clone(), to.clone());
        request.promotion = promotion.as_deref().and_then(|p| p.chars().next());
        let applied = match self.rules.apply(&session.position, &request) {
            Ok(applied) => applied,
            Err(violation) => {
                debug!(participant, %violation, "illegal move dropped");
                return Vec::new();
            },
        };
        session.position = applied.position;
        session.history.push(applied.notation);
        if let Some(outcome) = applied.outcome {
            session.status = outcome;
        }

        let message = ServerMessage::Move(MovePayload {
            from,
            to,
            promotion,
            status: Some(wire_status(&session.status).to_string()),
        });
        broadcast(session, &message, None)
    }

    /// Force a status change (resignation, agreed draw) and tell everyone.
    pub fn set_status(&mut self, id: &SessionId, status: SessionStatus) -> Vec<ServerOutput> {
        let Some(session) = self.sessions.get_mut(id) else {
            return Vec::new();
        };
        session.status = status;
        let message =
            ServerMessage::Status(StatusPayload { status: wire_status(&session.status).to_string() });
        broadcast(session, &message, None)
    }

    /// Reassign a participant's seat after the handshake.
    pub fn assign_seat(&mut self, participant: ParticipantId, seat: Option<Seat>) -> Vec<ServerOutput> {
        let Some(session) = self.participants.get(&participant).and_then(|id| self.sessions.get_mut(id))
        else {
            return Vec::new();
        };
        match seat {
            Some(seat) => {
                session.attached.insert(participant, seat);
            },
            None => {
                session.attached.remove(&participant);
            },
        }
        let message = ServerMessage::ColorAssignment(ColorAssignment { color: seat });
        deliver(participant, &message).into_iter().collect()
    }
}

fn seat_index(seat: Seat) -> usize {
    match seat {
        Seat::First => 0,
        Seat::Second => 1,
    }
}

/// Wire spelling of a status.
pub fn wire_status(status: &SessionStatus) -> &'static str {
    match status {
        SessionStatus::Waiting => "waiting",
        SessionStatus::Drawn => "draw",
        SessionStatus::WonFirst => "won_first",
        SessionStatus::WonSecond => "won_second",
        SessionStatus::Absent
        | SessionStatus::Ongoing
        | SessionStatus::Disconnected
        | SessionStatus::Errored(_) => "ongoing",
    }
}

fn deliver(to: ParticipantId, message: &ServerMessage) -> Option<ServerOutput> {
    match message.to_json() {
        Ok(text) => Some(ServerOutput::Deliver { to, text }),
        Err(error) => {
            warn!(%error, kind = message.kind(), "failed to encode server message");
            None
        },
    }
}

fn broadcast(
    session: &SimSession,
    message: &ServerMessage,
    except: Option<ParticipantId>,
) -> Vec<ServerOutput> {
    session
        .attached
        .keys()
        .filter(|&&p| Some(p) != except)
        .filter_map(|&p| deliver(p, message))
        .collect()
}
