//! Standard chess through `shakmaty`.

use gambit_proto::Seat;
use shakmaty::{
    CastlingMode, Chess, Color, EnPassantMode, File, Move, Outcome, Position as _, Role, Square,
    fen::Fen, san::SanPlus,
};

use crate::{AppliedMove, MoveRequest, Position, RuleViolation, RulesEngine, SessionStatus};

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Chess rules. Positions are FEN strings; notation is SAN with check
/// suffixes.
///
/// A missing promotion piece on a promoting move means queen.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChessRules;

impl ChessRules {
    fn load(&self, position: &Position) -> Result<Chess, RuleViolation> {
        let invalid = |reason: String| RuleViolation::InvalidPosition {
            encoding: position.as_str().to_string(),
            reason,
        };
        let fen: Fen = position.as_str().parse().map_err(|e| invalid(format!("{e}")))?;
        fen.into_position(CastlingMode::Standard).map_err(|e| invalid(format!("{e}")))
    }
}

fn square(name: &str) -> Result<Square, RuleViolation> {
    name.parse().map_err(|_| RuleViolation::InvalidSquare(name.to_string()))
}

fn promotion_role(piece: Option<char>) -> Result<Option<Role>, RuleViolation> {
    let Some(piece) = piece else {
        return Ok(None);
    };
    match Role::from_char(piece.to_ascii_lowercase()) {
        Some(role @ (Role::Queen | Role::Rook | Role::Bishop | Role::Knight)) => Ok(Some(role)),
        _ => Err(RuleViolation::InvalidPromotion(piece)),
    }
}

/// Square the king lands on. Castling moves are encoded king-takes-rook
/// internally, but the wire speaks king-to-destination (`e1g1`).
fn landing_square(m: &Move) -> Square {
    match m {
        Move::Castle { king, rook } => {
            let file = if rook.file().char() > king.file().char() { File::G } else { File::C };
            Square::from_coords(file, king.rank())
        },
        _ => m.to(),
    }
}

fn seat(color: Color) -> Seat {
    match color {
        Color::White => Seat::First,
        Color::Black => Seat::Second,
    }
}

impl RulesEngine for ChessRules {
    fn initial_position(&self) -> Position {
        Position::new(STARTING_FEN)
    }

    fn validate(&self, position: &Position) -> Result<(), RuleViolation> {
        self.load(position).map(|_| ())
    }

    fn side_to_move(&self, position: &Position) -> Result<Seat, RuleViolation> {
        Ok(seat(self.load(position)?.turn()))
    }

    fn legal_moves(&self, position: &Position) -> Result<Vec<MoveRequest>, RuleViolation> {
        let board = self.load(position)?;
        Ok(board
            .legal_moves()
            .iter()
            .filter_map(|m| {
                let from = m.from()?;
                let request = MoveRequest::new(from.to_string(), landing_square(m).to_string());
                Some(match m.promotion() {
                    Some(role) => request.with_promotion(role.char()),
                    None => request,
                })
            })
            .collect())
    }

    fn apply(
        &self,
        position: &Position,
        request: &MoveRequest,
    ) -> Result<AppliedMove, RuleViolation> {
        let mut board = self.load(position)?;
        let from = square(&request.from)?;
        let to = square(&request.to)?;
        let promotion = promotion_role(request.promotion)?;

        let chosen = board
            .legal_moves()
            .iter()
            .find(|m| {
                m.from() == Some(from)
                    && landing_square(m) == to
                    && m.promotion().is_none_or(|role| role == promotion.unwrap_or(Role::Queen))
            })
            .cloned()
            .ok_or_else(|| RuleViolation::IllegalMove {
                from: request.from.clone(),
                to: request.to.clone(),
            })?;

        let notation = SanPlus::from_move_and_play_unchecked(&mut board, &chosen).to_string();
        let outcome = board.outcome().map(|outcome| match outcome {
            Outcome::Decisive { winner } => match seat(winner) {
                Seat::First => SessionStatus::WonFirst,
                Seat::Second => SessionStatus::WonSecond,
            },
            Outcome::Draw => SessionStatus::Drawn,
        });
        let fen = Fen::from_position(board, EnPassantMode::Legal);

        Ok(AppliedMove { position: Position::new(fen.to_string()), notation, outcome })
    }
}
