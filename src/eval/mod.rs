//! Move evaluators used as the best-move oracle.
//!
//! An evaluator scores the moves of a position from the side to move's point
//! of view; [`crate::compare::candidates`] turns those scores into the set of
//! moves a subject is allowed to pick.

pub mod material;
pub mod uci;

pub use self::material::MaterialEvaluator;
pub use self::uci::{EngineConfig, UciEvaluator};

use crate::board::Position;
use crate::error::Result;
use crate::moves::Move;

/// Centipawn value used for forced mates, as in `mate_score=10000`.
pub const MATE_SCORE: i32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredMove {
    pub mv: Move,
    /// Side-to-move relative, higher is better.
    pub score_cp: i32,
}

pub trait Evaluator {
    /// Scored moves in the evaluator's own order. Callers rank them; the
    /// order only matters for breaking ties.
    fn score_moves(&mut self, pos: &Position) -> Result<Vec<ScoredMove>>;
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn score_moves(&mut self, pos: &Position) -> Result<Vec<ScoredMove>> {
        (**self).score_moves(pos)
    }
}
