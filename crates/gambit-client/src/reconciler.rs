//! Local mirror of the authoritative session.
//!
//! [`Reconciler`] owns the current position, the move record, the session
//! status and the assigned seat. It is only changed through the transition
//! functions below; the client decides which one an event maps to.
//!
//! Two invariants hold after every transition:
//! - the move record has exactly one entry per move applied since the
//!   position the record starts from;
//! - the position is replaced, never edited.
//!
//! Local networked moves are applied optimistically and remembered as
//! pending until the server's echo arrives. See [`Reconciler::apply_remote`]
//! for how an inbound move is classified.

use std::{collections::VecDeque, fmt};

use gambit_core::{AppliedMove, MoveRequest, Position, RulesEngine, RuleViolation, SessionStatus};
use gambit_proto::{MovePayload, Seat};
use tracing::{debug, trace};

use crate::ClientError;

/// Synchronisation phase of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// No session selected (or an offline mode)
    #[default]
    Idle,
    /// Channel requested, waiting for the handshake
    Joining,
    /// Mirror follows the server
    Synced,
    /// Mirror was found stale; a snapshot is in flight
    Reconciling,
    /// Channel closed; last state kept for display
    Disconnected,
    /// Session attempt failed for good
    Errored,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Joining => "joining",
            Self::Synced => "synced",
            Self::Reconciling => "reconciling",
            Self::Disconnected => "disconnected",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// How an inbound move was folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Opponent's move, applied with this notation
    Applied(String),
    /// Server echo of our oldest pending move
    Confirmed(MoveRequest),
}

/// Authoritative state delivered by `init` or a snapshot.
#[derive(Debug, Clone)]
pub struct Authoritative {
    /// Position encoding
    pub position: Position,
    /// Move record
    pub history: Vec<String>,
    /// Session status
    pub status: SessionStatus,
    /// Seat, when the source carries one. `None` keeps the current seat.
    pub seat: Option<Option<Seat>>,
}

/// The session mirror.
#[derive(Debug, Clone)]
pub struct Reconciler {
    position: Position,
    history: Vec<String>,
    status: SessionStatus,
    seat: Option<Seat>,
    previous: Vec<Position>,
    pending: VecDeque<MoveRequest>,
}

impl Reconciler {
    /// Fresh mirror at `position` with an empty record.
    pub fn new(position: Position, status: SessionStatus) -> Self {
        Self {
            position,
            history: Vec::new(),
            status,
            seat: None,
            previous: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Current position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Notation of every move since the record started.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Current status.
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Assigned seat.
    pub fn seat(&self) -> Option<Seat> {
        self.seat
    }

    /// Local moves sent but not yet echoed by the server.
    pub fn pending(&self) -> impl ExactSizeIterator<Item = &MoveRequest> {
        self.pending.iter()
    }

    /// Discard everything and start over at `position`.
    pub fn reset(&mut self, position: Position, status: SessionStatus) {
        *self = Self::new(position, status);
    }

    /// Replace the whole mirror with authoritative state.
    ///
    /// The position is validated first; on failure nothing changes.
    pub fn overwrite<R: RulesEngine>(
        &mut self,
        rules: &R,
        state: Authoritative,
    ) -> Result<(), RuleViolation> {
        rules.validate(&state.position)?;
        if !self.pending.is_empty() {
            debug!(dropped = self.pending.len(), "authoritative state replaces pending moves");
        }
        self.position = state.position;
        self.history = state.history;
        self.status = state.status;
        if let Some(seat) = state.seat {
            self.seat = seat;
        }
        self.previous.clear();
        self.pending.clear();
        Ok(())
    }

    /// Fold in a move the local participant made.
    ///
    /// With `confirm` set the move is remembered until the server echoes it
    /// and the status is left to the server. Offline, the rules engine's
    /// outcome becomes the status.
    pub fn apply_local(&mut self, applied: AppliedMove, request: MoveRequest, confirm: bool) {
        trace!(%request, notation = %applied.notation, "local move");
        let previous = std::mem::replace(&mut self.position, applied.position);
        self.previous.push(previous);
        self.history.push(applied.notation);
        if confirm {
            self.pending.push_back(request);
        } else if let Some(outcome) = applied.outcome {
            self.status = outcome;
        }
    }

    /// Fold in a move delivered by the server.
    ///
    /// 1. Legal here and it is the opponent's turn: a genuine remote move.
    ///    Applied; every pending local move counts as confirmed.
    /// 2. Otherwise, equal to the oldest pending move: the server's echo of
    ///    our own move. Popped.
    /// 3. Otherwise the mirror has drifted from the server.
    ///
    /// A status carried by the message replaces the current one; without it
    /// the status is kept. On error nothing changes.
    pub fn apply_remote<R: RulesEngine>(
        &mut self,
        rules: &R,
        payload: &MovePayload,
    ) -> Result<RemoteOutcome, ClientError> {
        let request = MoveRequest::from_payload(payload)?;
        let status = payload
            .status
            .as_deref()
            .map(|raw| SessionStatus::from_wire(Some(raw)))
            .transpose()?;

        let to_move = rules.side_to_move(&self.position)?;
        let opponents_turn = self.seat.is_none_or(|seat| seat != to_move);
        let applied = if opponents_turn { rules.apply(&self.position, &request).ok() } else { None };

        let outcome = if let Some(applied) = applied {
            self.position = applied.position;
            self.history.push(applied.notation.clone());
            self.previous.clear();
            self.pending.clear();
            RemoteOutcome::Applied(applied.notation)
        } else if self.pending.front().is_some_and(|pending| is_echo(pending, &request)) {
            self.pending.pop_front();
            RemoteOutcome::Confirmed(request)
        } else {
            return Err(ClientError::Rule(RuleViolation::IllegalMove {
                from: request.from,
                to: request.to,
            }));
        };

        if let Some(status) = status {
            self.status = status;
        }
        Ok(outcome)
    }

    /// Take back the last move. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.previous.pop() else {
            return false;
        };
        self.position = previous;
        self.history.pop();
        self.pending.pop_back();
        if self.status.is_terminal() {
            self.status = SessionStatus::Ongoing;
        }
        true
    }

    /// Server-delivered status change.
    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    /// Server-delivered seat assignment.
    pub fn set_seat(&mut self, seat: Option<Seat>) {
        self.seat = seat;
    }

    /// Channel went away: identity cleared, status `disconnected`, position
    /// and record kept for display.
    pub fn disconnect(&mut self) {
        self.seat = None;
        self.status = SessionStatus::Disconnected;
        self.pending.clear();
    }

    /// Session attempt failed: identity cleared, status carries the reason.
    pub fn fail(&mut self, reason: String) {
        self.seat = None;
        self.status = SessionStatus::Errored(reason);
        self.pending.clear();
    }
}

/// Servers fill in the default promotion piece when echoing, so a bare
/// `e7e8` and `e7e8q` are the same move.
fn is_echo(pending: &MoveRequest, echoed: &MoveRequest) -> bool {
    pending.from == echoed.from
        && pending.to == echoed.to
        && pending.promotion.unwrap_or('q') == echoed.promotion.unwrap_or('q')
}
