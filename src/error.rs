//! Error types for the harness.
//!
//! A disagreement between oracle and subject is not an error: it is reported
//! as a [`crate::harness::TrialOutcome::Mismatch`]. The types here cover the
//! cases where no comparison could be made at all.

use thiserror::Error;

use crate::board::Square;
use crate::subject::QueryKind;

pub type Result<T> = std::result::Result<T, Error>;

/// Problems found while reading a FEN record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("missing piece placement field")]
    MissingPlacement,
    #[error("expected 8 ranks in placement, found {0}")]
    RankCount(usize),
    #[error("rank {rank} does not describe exactly 8 files")]
    RankWidth { rank: usize },
    #[error("invalid piece char '{0}'")]
    PieceChar(char),
    #[error("invalid side to move '{0}'")]
    Side(String),
    #[error("invalid castling field '{0}'")]
    Castling(String),
    #[error("invalid en-passant field '{0}'")]
    EnPassant(String),
    #[error("invalid {field} '{value}'")]
    Counter { field: &'static str, value: String },
    #[error("expected exactly one king per side (white {white}, black {black})")]
    KingCount { white: usize, black: usize },
}

/// The subject could not be run, or ended badly.
#[derive(Debug, Error)]
pub enum SubjectError {
    #[error("failed to launch subject {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o with subject failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("subject exited with {code:?}; stderr: {stderr}")]
    Exit { code: Option<i32>, stderr: String },
}

/// Subject output that does not follow the reply grammar. This is a protocol
/// violation and is never folded into a move-set difference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {kind} reply at line {line}: {reason} (got {text:?})")]
pub struct MalformedOutput {
    pub kind: QueryKind,
    pub line: usize,
    pub text: String,
    pub reason: &'static str,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid FEN: {0}")]
    Fen(#[from] FenError),

    #[error("reference engine rejected {fen}: {reason}")]
    IllegalPosition { fen: String, reason: String },

    #[error("no piece on {0}")]
    EmptySquare(Square),

    #[error(transparent)]
    Subject(#[from] SubjectError),

    #[error(transparent)]
    Malformed(#[from] MalformedOutput),

    #[error("undo did not restore the position: before {before}, after {after}")]
    UndoMismatch { before: String, after: String },

    #[error("evaluator: {0}")]
    Evaluator(String),

    #[error("suite line {line}: {reason}")]
    Suite { line: usize, reason: String },

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
