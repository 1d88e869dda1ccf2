//! Local action gate.
//!
//! Decides whether the local participant may move right now. The gate has no
//! side effects: on rejection the mirror is untouched, on acceptance the
//! caller receives the rules engine's result and applies it.

use gambit_core::{AppliedMove, MoveRequest, PlayMode, RuleViolation, RulesEngine, SessionStatus};
use gambit_proto::Seat;
use thiserror::Error;

use crate::Reconciler;

/// Why a submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Session is not accepting moves
    #[error("moves are not accepted while {0}")]
    NotOngoing(SessionStatus),

    /// No seat assigned yet (or spectating)
    #[error("no seat assigned")]
    Unassigned,

    /// The other seat is to move
    #[error("not your turn: {to_move} to move, you are {seat}")]
    NotYourTurn {
        /// Our seat
        seat: Seat,
        /// Seat to move
        to_move: Seat,
    },

    /// Rules engine refused the move
    #[error(transparent)]
    Illegal(#[from] RuleViolation),
}

/// Check a submission against the mirror and the rules.
///
/// Offline modes check only the status and the rules engine: both sides are
/// played from this client. Networked mode also requires an assigned seat
/// whose turn it is.
pub fn authorize<R: RulesEngine>(
    rules: &R,
    mode: PlayMode,
    mirror: &Reconciler,
    request: &MoveRequest,
) -> Result<AppliedMove, Rejection> {
    if mirror.status() != &SessionStatus::Ongoing {
        return Err(Rejection::NotOngoing(mirror.status().clone()));
    }
    if mode.is_networked() {
        let seat = mirror.seat().ok_or(Rejection::Unassigned)?;
        let to_move = rules.side_to_move(mirror.position())?;
        if to_move != seat {
            return Err(Rejection::NotYourTurn { seat, to_move });
        }
    }
    Ok(rules.apply(mirror.position(), request)?)
}

#[cfg(test)]
mod tests {
    use gambit_core::ChessRules;

    use super::*;
    use crate::reconciler::Authoritative;

    fn networked(seat: Option<Seat>, status: SessionStatus) -> Reconciler {
        let rules = ChessRules;
        let mut mirror = Reconciler::new(rules.initial_position(), SessionStatus::Absent);
        mirror
            .overwrite(&rules, Authoritative {
                position: rules.initial_position(),
                history: Vec::new(),
                status,
                seat: Some(seat),
            })
            .unwrap();
        mirror
    }

    #[test]
    fn accepts_own_turn() {
        let mirror = networked(Some(Seat::First), SessionStatus::Ongoing);
        let applied =
            authorize(&ChessRules, PlayMode::Networked, &mirror, &MoveRequest::new("e2", "e4"))
                .unwrap();
        assert_eq!(applied.notation, "e4");
    }

    #[test]
    fn rejects_when_not_ongoing() {
        for status in [
            SessionStatus::Absent,
            SessionStatus::Waiting,
            SessionStatus::Drawn,
            SessionStatus::Disconnected,
            SessionStatus::Errored("x".into()),
        ] {
            let mirror = networked(Some(Seat::First), status.clone());
            let result =
                authorize(&ChessRules, PlayMode::Networked, &mirror, &MoveRequest::new("e2", "e4"));
            assert_eq!(result, Err(Rejection::NotOngoing(status)));
        }
    }

    #[test]
    fn rejects_unassigned_and_wrong_turn() {
        let request = MoveRequest::new("e2", "e4");

        let mirror = networked(None, SessionStatus::Ongoing);
        assert_eq!(
            authorize(&ChessRules, PlayMode::Networked, &mirror, &request),
            Err(Rejection::Unassigned)
        );

        let mirror = networked(Some(Seat::Second), SessionStatus::Ongoing);
        assert_eq!(
            authorize(&ChessRules, PlayMode::Networked, &mirror, &request),
            Err(Rejection::NotYourTurn { seat: Seat::Second, to_move: Seat::First })
        );
    }

    #[test]
    fn offline_plays_both_sides() {
        let mirror = Reconciler::new(ChessRules.initial_position(), SessionStatus::Ongoing);
        assert!(authorize(&ChessRules, PlayMode::Local, &mirror, &MoveRequest::new("e2", "e4")).is_ok());
    }

    #[test]
    fn illegal_move_is_rejected() {
        let mirror = networked(Some(Seat::First), SessionStatus::Ongoing);
        assert!(matches!(
            authorize(&ChessRules, PlayMode::Networked, &mirror, &MoveRequest::new("e2", "e5")),
            Err(Rejection::Illegal(RuleViolation::IllegalMove { .. }))
        ));
    }
}
