//! The engine under test and its wire protocol.
//!
//! A request is the placement and side-to-move fields of the position, on a
//! single line without a newline. The reply depends on the query: one
//! `"<from> <to>"` line per move, a single game-state token, or a single
//! best-move line. Square indices are `rank * 8 + file`.

pub mod process;
pub mod reference;
pub mod reply;

pub use self::process::ProcessSubject;

use std::fmt;

use log::{debug, warn};

use crate::board::Position;
use crate::error::{Result, SubjectError};
use crate::moves::{MovePair, MoveSet};
use crate::oracle::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Moves,
    GameState,
    BestMove,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryKind::Moves => "moves",
            QueryKind::GameState => "game-state",
            QueryKind::BestMove => "best-move",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectReply {
    Moves(MoveSet),
    State(GameState),
    Best(MovePair),
}

/// Everything the subject produced for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReply {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl RawReply {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }
}

/// One synchronous request/response round with the engine under test.
pub trait SubjectEngine {
    fn exchange(&mut self, request: &str) -> std::result::Result<RawReply, SubjectError>;
}

impl<S: SubjectEngine + ?Sized> SubjectEngine for &mut S {
    fn exchange(&mut self, request: &str) -> std::result::Result<RawReply, SubjectError> {
        (**self).exchange(request)
    }
}

impl<S: SubjectEngine + ?Sized> SubjectEngine for Box<S> {
    fn exchange(&mut self, request: &str) -> std::result::Result<RawReply, SubjectError> {
        (**self).exchange(request)
    }
}

/// In-process subject: a closure from request text to stdout text.
pub struct FnSubject<F> {
    respond: F,
}

impl<F: FnMut(&str) -> String> FnSubject<F> {
    pub fn new(respond: F) -> Self {
        Self { respond }
    }
}

impl<F: FnMut(&str) -> String> SubjectEngine for FnSubject<F> {
    fn exchange(&mut self, request: &str) -> std::result::Result<RawReply, SubjectError> {
        Ok(RawReply::ok((self.respond)(request)))
    }
}

/// Sends `pos` to the subject and parses the reply as `kind`.
///
/// Stderr is logged and otherwise ignored; a non-zero exit is a
/// [`SubjectError::Exit`].
pub fn query<S: SubjectEngine + ?Sized>(
    engine: &mut S,
    pos: &Position,
    kind: QueryKind,
) -> Result<SubjectReply> {
    let request = pos.wire_fen();
    debug!("{} query: {}", kind, request);
    let raw = engine.exchange(&request)?;

    if !raw.stderr.trim().is_empty() {
        warn!("subject stderr on {}: {}", request, raw.stderr.trim_end());
    }
    if !raw.success {
        return Err(SubjectError::Exit {
            code: raw.code,
            stderr: raw.stderr,
        }
        .into());
    }
    Ok(reply::parse_reply(kind, &raw.stdout)?)
}

pub fn query_moves<S: SubjectEngine + ?Sized>(engine: &mut S, pos: &Position) -> Result<MoveSet> {
    match query(engine, pos, QueryKind::Moves)? {
        SubjectReply::Moves(set) => Ok(set),
        other => unreachable!("moves query produced {:?}", other),
    }
}

pub fn query_state<S: SubjectEngine + ?Sized>(engine: &mut S, pos: &Position) -> Result<GameState> {
    match query(engine, pos, QueryKind::GameState)? {
        SubjectReply::State(state) => Ok(state),
        other => unreachable!("state query produced {:?}", other),
    }
}

pub fn query_best<S: SubjectEngine + ?Sized>(engine: &mut S, pos: &Position) -> Result<MovePair> {
    match query(engine, pos, QueryKind::BestMove)? {
        SubjectReply::Best(pair) => Ok(pair),
        other => unreachable!("best-move query produced {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_the_wire_fen() {
        let mut seen = Vec::new();
        let mut subject = FnSubject::new(|req: &str| {
            seen.push(req.to_string());
            "IN_PROGRESS".to_string()
        });
        let state = query_state(&mut subject, &Position::startpos()).unwrap();
        assert_eq!(state, GameState::InProgress);
        drop(subject);
        assert_eq!(seen, vec!["rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w"]);
    }

    struct Crashing;

    impl SubjectEngine for Crashing {
        fn exchange(&mut self, _: &str) -> std::result::Result<RawReply, SubjectError> {
            Ok(RawReply {
                stdout: "12 28\n".to_string(),
                stderr: "segfault".to_string(),
                success: false,
                code: Some(139),
            })
        }
    }

    #[test]
    fn nonzero_exit_is_a_subject_error() {
        let err = query_moves(&mut Crashing, &Position::startpos()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Subject(SubjectError::Exit { code: Some(139), .. })
        ));
    }
}
