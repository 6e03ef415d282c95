//! Oracle-backed subject. Answers every query the way a correct engine
//! would, which makes it the known-good counterpart in tests and the
//! implementation behind the `ref_*` binaries.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use crate::board::Position;
use crate::compare::{candidates, CandidatePolicy};
use crate::error::Result;
use crate::eval::{Evaluator, MaterialEvaluator};
use crate::oracle::{RuleOracle, ShakmatyOracle};
use crate::subject::QueryKind;

/// Reply text for a wire request, newline-terminated lines.
pub fn respond(kind: QueryKind, request: &str) -> Result<String> {
    let pos = Position::from_fen(request.trim())?;
    let oracle = ShakmatyOracle;
    let mut out = String::new();
    match kind {
        QueryKind::Moves => {
            for pair in &oracle.filtered_moves(&pos)? {
                out.push_str(&pair.to_wire());
                out.push('\n');
            }
        }
        QueryKind::GameState => {
            out.push_str(oracle.game_state(&pos)?.token());
            out.push('\n');
        }
        QueryKind::BestMove => {
            let scored = MaterialEvaluator::new(oracle).score_moves(&pos)?;
            if let Some(best) = candidates(&scored, CandidatePolicy::TopK { k: 1 }).first() {
                out.push_str(&best.to_wire());
                out.push('\n');
            }
        }
    }
    Ok(out)
}

/// Stdin-to-stdout subject process. Errors go to stderr with a failing
/// exit status.
pub fn serve_stdio(kind: QueryKind) -> ExitCode {
    let mut request = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut request) {
        eprintln!("cannot read request: {}", e);
        return ExitCode::FAILURE;
    }
    match respond(kind, &request) {
        Ok(reply) => {
            let mut stdout = io::stdout().lock();
            if stdout.write_all(reply.as_bytes()).and_then(|_| stdout.flush()).is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::reply;

    #[test]
    fn startpos_moves() {
        let text = respond(QueryKind::Moves, "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w").unwrap();
        let set = reply::parse_moves(&text).unwrap();
        assert_eq!(set.len(), 20);
    }

    #[test]
    fn state_of_a_stalemate() {
        let text = respond(QueryKind::GameState, "7k/5Q2/6K1/8/8/8/8/8 b").unwrap();
        assert_eq!(text, "STALEMATE\n");
    }

    #[test]
    fn bad_request_is_an_error() {
        assert!(respond(QueryKind::Moves, "not a position").is_err());
    }
}
