//! Differential testing for chess rule engines.
//!
//! Positions come from a seeded random walk ([`sampler`]) or a fixed list;
//! the reference engine ([`oracle`]) and the engine under test ([`subject`])
//! answer the same question about each one, and [`compare`] decides whether
//! they agree. [`perft`] counts game-tree leaves with either side as the
//! move source.

pub mod board;
pub mod compare;
pub mod config;
pub mod error;
pub mod eval;
pub mod harness;
pub mod moves;
pub mod oracle;
pub mod perft;
pub mod sampler;
pub mod subject;
pub mod suite;

pub use board::{Position, Square, START_FEN};
pub use compare::{CandidatePolicy, ComparisonResult};
pub use error::{Error, Result};
pub use harness::{Harness, Mode, RunConfig, RunReport, TrialOutcome};
pub use moves::{Move, MovePair, MoveSet};
pub use oracle::{GameState, RuleOracle, ShakmatyOracle};
