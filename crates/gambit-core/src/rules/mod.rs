//! Rules engine seam.
//!
//! The session core never decides legality itself. It hands the current
//! [`Position`] and a [`MoveRequest`] to a [`RulesEngine`] and either gets back
//! the next position with its notation or a [`RuleViolation`].

mod chess;

pub use chess::ChessRules;
use gambit_proto::Seat;

use crate::{MoveRequest, Position, RuleViolation, SessionStatus};

/// Result of applying a legal move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    /// Position after the move
    pub position: Position,
    /// Human-readable notation of the move (SAN for chess)
    pub notation: String,
    /// Terminal status reached by this move, if any
    pub outcome: Option<SessionStatus>,
}

/// Validates and applies moves.
pub trait RulesEngine {
    /// Position every new game starts from.
    fn initial_position(&self) -> Position;

    /// Check that an encoding describes a playable position.
    fn validate(&self, position: &Position) -> Result<(), RuleViolation>;

    /// Seat whose turn it is in `position`.
    fn side_to_move(&self, position: &Position) -> Result<Seat, RuleViolation>;

    /// Every legal move in `position`, in engine order.
    fn legal_moves(&self, position: &Position) -> Result<Vec<MoveRequest>, RuleViolation>;

    /// Apply `request` to `position`.
    fn apply(&self, position: &Position, request: &MoveRequest)
    -> Result<AppliedMove, RuleViolation>;

    /// Play `moves` from the initial position, returning the final position
    /// and the notation of each move.
    fn replay<'a>(
        &self,
        moves: impl IntoIterator<Item = &'a MoveRequest>,
    ) -> Result<(Position, Vec<String>), RuleViolation> {
        let mut position = self.initial_position();
        let mut notation = Vec::new();
        for request in moves {
            let applied = self.apply(&position, request)?;
            position = applied.position;
            notation.push(applied.notation);
        }
        Ok((position, notation))
    }
}
