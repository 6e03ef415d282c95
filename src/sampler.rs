//! Random legal positions by bounded random walk from the initial position.
//!
//! Walks are rejected and restarted until the final position satisfies
//! [`SampleConstraints`]. The attempt budget is explicit, so a constraint set
//! that can never be met ends in [`SampleOutcome::Exhausted`] rather than an
//! endless loop.

use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use shakmaty::{Chess, Position as _};

use crate::board::Position;
use crate::oracle::{classify, from_chess, GameState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotStalemate,
    CastlingRights,
    PawnBeforePromotion,
}

/// Admissibility policy for sampled positions.
///
/// Castling rights and pawns one step from promotion are always rejected;
/// en passant is not rejected but the target is cleared on acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleConstraints {
    pub require_stalemate: bool,
}

impl SampleConstraints {
    pub const SAFE: SampleConstraints = SampleConstraints {
        require_stalemate: false,
    };
    pub const STALEMATE: SampleConstraints = SampleConstraints {
        require_stalemate: true,
    };

    /// Returns the cleaned-up position on acceptance.
    pub fn inspect(&self, chess: &Chess) -> Result<Position, Rejection> {
        if self.require_stalemate && classify(chess) != GameState::Stalemate {
            return Err(Rejection::NotStalemate);
        }
        let mut pos = from_chess(chess);
        if !pos.castling.is_empty() {
            return Err(Rejection::CastlingRights);
        }
        if pos.has_pawn_before_promotion() {
            return Err(Rejection::PawnBeforePromotion);
        }
        pos.clear_special_rights();
        Ok(pos)
    }

    /// Invariants every accepted position holds.
    pub fn admits(&self, pos: &Position) -> bool {
        pos.castling.is_empty() && pos.ep.is_none() && !pos.has_pawn_before_promotion()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub min_plies: usize,
    pub max_plies: usize,
    /// `None` retries forever.
    pub max_attempts: Option<u64>,
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            min_plies: 5,
            max_plies: 40,
            max_attempts: Some(100_000),
            seed: None,
        }
    }
}

impl SamplerConfig {
    pub fn plies(mut self, min: usize, max: usize) -> Self {
        self.min_plies = min.min(max);
        self.max_plies = min.max(max);
        self
    }

    pub fn max_attempts(mut self, attempts: Option<u64>) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    Found(Position),
    Exhausted { attempts: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub attempts: u64,
    pub accepted: u64,
    pub rejected_castling: u64,
    pub rejected_promotion: u64,
    pub rejected_not_stalemate: u64,
}

impl SamplerStats {
    fn reject(&mut self, reason: Rejection) {
        match reason {
            Rejection::NotStalemate => self.rejected_not_stalemate += 1,
            Rejection::CastlingRights => self.rejected_castling += 1,
            Rejection::PawnBeforePromotion => self.rejected_promotion += 1,
        }
    }
}

pub struct PositionSampler<R = StdRng> {
    rng: R,
    config: SamplerConfig,
    constraints: SampleConstraints,
    stats: SamplerStats,
}

impl PositionSampler<StdRng> {
    /// Seeded from `config.seed`, or from entropy when there is none.
    pub fn new(config: SamplerConfig, constraints: SampleConstraints) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(rng, config, constraints)
    }

    pub fn safe(config: SamplerConfig) -> Self {
        Self::new(config, SampleConstraints::SAFE)
    }

    /// Walks must end in stalemate to be accepted.
    pub fn random_stalemate(config: SamplerConfig) -> Self {
        Self::new(config, SampleConstraints::STALEMATE)
    }
}

impl<R: Rng> PositionSampler<R> {
    pub fn with_rng(rng: R, config: SamplerConfig, constraints: SampleConstraints) -> Self {
        let config = config.clone().plies(config.min_plies, config.max_plies);
        Self {
            rng,
            config,
            constraints,
            stats: SamplerStats::default(),
        }
    }

    pub fn constraints(&self) -> SampleConstraints {
        self.constraints
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    /// Plays a uniformly drawn number of random legal moves from the
    /// initial position, stopping early when the game is over.
    pub fn random_walk(&mut self) -> Chess {
        let mut chess = Chess::default();
        let plies = self
            .rng
            .gen_range(self.config.min_plies..=self.config.max_plies);
        for _ in 0..plies {
            if chess.is_game_over() {
                break;
            }
            let moves = chess.legal_moves();
            match moves.choose(&mut self.rng) {
                Some(mv) => chess.play_unchecked(mv),
                None => break,
            }
        }
        chess
    }

    pub fn sample(&mut self) -> SampleOutcome {
        let mut attempts = 0u64;
        loop {
            if let Some(max) = self.config.max_attempts {
                if attempts >= max {
                    warn!("sampler gave up after {} attempts", attempts);
                    return SampleOutcome::Exhausted { attempts };
                }
            }
            attempts += 1;
            self.stats.attempts += 1;

            let chess = self.random_walk();
            match self.constraints.inspect(&chess) {
                Ok(pos) => {
                    self.stats.accepted += 1;
                    debug!("sampled {} after {} attempts", pos.to_fen(), attempts);
                    return SampleOutcome::Found(pos);
                }
                Err(reason) => {
                    trace!("rejected walk: {:?}", reason);
                    self.stats.reject(reason);
                }
            }
        }
    }
}
