//! Differential comparator: reconciles oracle answers with subject answers.

use std::fmt;

use crate::eval::ScoredMove;
use crate::moves::{Move, MovePair, MoveSet};
use crate::oracle::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateVerdict {
    pub expected: GameState,
    pub actual: GameState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMoveVerdict {
    pub subject: MovePair,
    pub candidates: Vec<MovePair>,
    /// Zero-based rank of the subject move among the candidates.
    pub rank: Option<usize>,
}

/// Outcome of one comparison. `missing` holds what the oracle has and the
/// subject lacks, `extra` the reverse; both are always filled in together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonResult {
    pub matched: bool,
    pub missing: MoveSet,
    pub extra: MoveSet,
    pub state: Option<StateVerdict>,
    pub best: Option<BestMoveVerdict>,
}

impl ComparisonResult {
    fn scalar(matched: bool) -> Self {
        Self {
            matched,
            missing: MoveSet::new(),
            extra: MoveSet::new(),
            state: None,
            best: None,
        }
    }
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(state) = &self.state {
            return write!(f, "expected {}, subject said {}", state.expected, state.actual);
        }
        if let Some(best) = &self.best {
            let list: Vec<String> = best.candidates.iter().map(|c| c.to_string()).collect();
            return match best.rank {
                Some(rank) => write!(f, "subject move {} is candidate #{}", best.subject, rank + 1),
                None => write!(
                    f,
                    "subject move {} is outside candidates [{}]",
                    best.subject,
                    list.join(", ")
                ),
            };
        }
        if self.matched {
            return write!(f, "move sets match");
        }
        writeln!(f, "Missing: {}", self.missing)?;
        write!(f, "Extra: {}", self.extra)
    }
}

/// Oracle moves reduced to comparable pairs: promotions, castles and
/// en-passant captures are dropped.
pub fn oracle_move_set(moves: &[Move]) -> MoveSet {
    moves
        .iter()
        .filter(|m| !m.is_excluded())
        .map(Move::pair)
        .collect()
}

pub fn compare_moves(oracle: &MoveSet, subject: &MoveSet) -> ComparisonResult {
    let missing = oracle.difference(subject);
    let extra = subject.difference(oracle);
    ComparisonResult {
        matched: missing.is_empty() && extra.is_empty(),
        missing,
        extra,
        state: None,
        best: None,
    }
}

pub fn compare_state(expected: GameState, actual: GameState) -> ComparisonResult {
    ComparisonResult {
        state: Some(StateVerdict { expected, actual }),
        ..ComparisonResult::scalar(expected == actual)
    }
}

/// Passes when the subject's move is any of the candidates, not only the
/// first one.
pub fn compare_best(candidates: &[MovePair], subject: MovePair) -> ComparisonResult {
    let rank = candidates.iter().position(|c| *c == subject);
    ComparisonResult {
        best: Some(BestMoveVerdict {
            subject,
            candidates: candidates.to_vec(),
            rank,
        }),
        ..ComparisonResult::scalar(rank.is_some())
    }
}

/// How evaluator scores become the accepted best-move set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePolicy {
    /// The `k` best-scored moves.
    TopK { k: usize },
    /// Every move within `threshold_cp` of the best score, at most
    /// `max_candidates` of them.
    NearBest {
        threshold_cp: i32,
        max_candidates: usize,
    },
}

impl Default for CandidatePolicy {
    fn default() -> Self {
        CandidatePolicy::TopK { k: 5 }
    }
}

/// Best first. Ties keep the evaluator's order (the sort is stable).
pub fn candidates(scored: &[ScoredMove], policy: CandidatePolicy) -> Vec<MovePair> {
    let mut ranked: Vec<&ScoredMove> = scored.iter().filter(|s| !s.mv.is_excluded()).collect();
    ranked.sort_by(|a, b| b.score_cp.cmp(&a.score_cp));

    match policy {
        CandidatePolicy::TopK { k } => ranked.iter().take(k).map(|s| s.mv.pair()).collect(),
        CandidatePolicy::NearBest {
            threshold_cp,
            max_candidates,
        } => {
            let Some(best) = ranked.first().map(|s| s.score_cp) else {
                return Vec::new();
            };
            ranked
                .iter()
                .filter(|s| best - s.score_cp <= threshold_cp)
                .take(max_candidates)
                .map(|s| s.mv.pair())
                .collect()
        }
    }
}
