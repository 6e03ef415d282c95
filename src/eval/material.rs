//! One-ply material evaluator.
//!
//! Scores every legal move by the material balance it leaves behind. Weak
//! as chess, but deterministic and engine-free, which is what the reference
//! subject and the tests need.

use crate::board::{Color, PieceKind, Position};
use crate::error::Result;
use crate::eval::{Evaluator, ScoredMove, MATE_SCORE};
use crate::oracle::{GameState, RuleOracle, ShakmatyOracle};

// ============================================================================
// VALORI MATERIALI (in centipawn)
// ============================================================================
const PAWN_VALUE: i32 = 100;
const KNIGHT_VALUE: i32 = 320;
const BISHOP_VALUE: i32 = 330;
const ROOK_VALUE: i32 = 500;
const QUEEN_VALUE: i32 = 900;

fn piece_value(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Pawn => PAWN_VALUE,
        PieceKind::Knight => KNIGHT_VALUE,
        PieceKind::Bishop => BISHOP_VALUE,
        PieceKind::Rook => ROOK_VALUE,
        PieceKind::Queen => QUEEN_VALUE,
        PieceKind::King => 0,
    }
}

/// Material of `color` minus material of the opponent.
pub fn material_balance(pos: &Position, color: Color) -> i32 {
    pos.pieces()
        .map(|(_, p)| {
            let value = piece_value(p.kind);
            if p.color == color {
                value
            } else {
                -value
            }
        })
        .sum()
}

#[derive(Debug, Clone, Default)]
pub struct MaterialEvaluator<O = ShakmatyOracle> {
    oracle: O,
}

impl<O: RuleOracle> MaterialEvaluator<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }
}

impl<O: RuleOracle> Evaluator for MaterialEvaluator<O> {
    fn score_moves(&mut self, pos: &Position) -> Result<Vec<ScoredMove>> {
        let mover = pos.side;
        let mut work = pos.clone();
        let mut scored = Vec::new();
        for mv in self.oracle.legal_moves(pos)? {
            let undo = work.apply(&mv)?;
            let score_cp = match self.oracle.game_state(&work)? {
                GameState::Checkmate => MATE_SCORE,
                GameState::Stalemate => 0,
                GameState::InProgress => material_balance(&work, mover),
            };
            work.undo(undo);
            scored.push(ScoredMove { mv, score_cp });
        }
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_is_balanced() {
        assert_eq!(material_balance(&Position::startpos(), Color::White), 0);
    }

    #[test]
    fn prefers_the_free_queen() {
        // White rook on a1 can take the undefended queen on a8.
        let pos = Position::from_fen("q3k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let mut eval = MaterialEvaluator::new(ShakmatyOracle);
        let scored = eval.score_moves(&pos).unwrap();
        let best = scored.iter().max_by_key(|s| s.score_cp).unwrap();
        assert_eq!(best.mv.to_uci(), "a1a8");
        assert_eq!(best.score_cp, ROOK_VALUE);
    }

    #[test]
    fn mate_outscores_material() {
        // Back-rank mate: Ra8#.
        let pos = Position::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        let mut eval = MaterialEvaluator::new(ShakmatyOracle);
        let scored = eval.score_moves(&pos).unwrap();
        let best = scored.iter().max_by_key(|s| s.score_cp).unwrap();
        assert_eq!(best.mv.to_uci(), "a1a8");
        assert_eq!(best.score_cp, MATE_SCORE);
    }
}
