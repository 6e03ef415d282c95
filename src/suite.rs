//! Best-move test suites in EPD form (STS style).
//!
//! Each line is a position followed by opcodes; the accepted moves are the
//! quoted list of the `c9` opcode, in UCI notation:
//!
//! ```text
//! 1kr5/3n4/q3p2p/p2n2p1/PppB1P2/5BP1/1P2Q2P/3R2K1 w - - bm f5; id "STS 1"; c9 "f4f5 e2d3";
//! ```
//!
//! Moves that are not plain four-character from/to moves are dropped, as
//! are lines without a `c9` list.

use std::fs;
use std::path::Path;

use log::debug;

use crate::board::{Position, Square};
use crate::error::{Error, Result};
use crate::moves::MovePair;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteEntry {
    pub position: Position,
    pub id: Option<String>,
    pub candidates: Vec<MovePair>,
}

// contents of `<opcode> "<text>"`, if present
fn quoted_operand<'a>(line: &'a str, opcode: &str) -> Option<&'a str> {
    let mut rest = line;
    while let Some(at) = rest.find(opcode) {
        let before_ok = at == 0 || rest[..at].ends_with(|c: char| c.is_whitespace() || c == ';');
        let after = rest[at + opcode.len()..].trim_start();
        if before_ok && after.starts_with('"') {
            let body = &after[1..];
            return body.find('"').map(|end| &body[..end]);
        }
        rest = &rest[at + opcode.len()..];
    }
    None
}

fn parse_candidate(token: &str) -> Option<std::result::Result<MovePair, &'static str>> {
    if token.len() != 4 || !token.is_ascii() {
        return None;
    }
    let parsed = token[0..2]
        .parse::<Square>()
        .and_then(|from| token[2..4].parse::<Square>().map(|to| MovePair::new(from, to)));
    Some(parsed)
}

pub fn parse_suite(text: &str) -> Result<Vec<SuiteEntry>> {
    let mut entries = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let Some(moves) = quoted_operand(line, "c9") else {
            debug!("suite line {} has no c9 list, skipped", i + 1);
            continue;
        };

        let fen = line.split(" bm ").next().unwrap_or(line).trim();
        let position = Position::from_fen(fen).map_err(|e| Error::Suite {
            line: i + 1,
            reason: e.to_string(),
        })?;

        let mut candidates = Vec::new();
        for token in moves.split_whitespace() {
            match parse_candidate(token) {
                Some(Ok(pair)) => candidates.push(pair),
                Some(Err(reason)) => {
                    return Err(Error::Suite {
                        line: i + 1,
                        reason: format!("{} in move {}", reason, token),
                    })
                }
                None => {}
            }
        }

        entries.push(SuiteEntry {
            position,
            id: quoted_operand(line, "id").map(str::to_string),
            candidates,
        });
    }
    Ok(entries)
}

pub fn load_suite(path: &Path) -> Result<Vec<SuiteEntry>> {
    parse_suite(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STS: &str = r#"
1kr5/3n4/q3p2p/p2n2p1/PppB1P2/5BP1/1P2Q2P/3R2K1 w - - bm f5; id "STS(v1.0) Undermine.001"; c0 "f5=10, Be5+=2"; c9 "f4f5 d4e5 e7e8q";
3r1k2/4npp1/1ppr3p/p6P/P2PPPP1/1NR5/5K2/2R5 w - - bm d5; id "STS(v1.0) Undermine.002";
"#;

    #[test]
    fn reads_fen_and_c9_moves() {
        let entries = parse_suite(STS).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.id.as_deref(), Some("STS(v1.0) Undermine.001"));
        assert_eq!(
            entry.position.to_fen(),
            "1kr5/3n4/q3p2p/p2n2p1/PppB1P2/5BP1/1P2Q2P/3R2K1 w - - 0 1"
        );
        // the promotion is five characters long and is dropped
        assert_eq!(
            entry.candidates,
            vec![
                MovePair::from_indices(29, 37).unwrap(),
                MovePair::from_indices(27, 36).unwrap(),
            ]
        );
    }

    #[test]
    fn bad_square_is_reported_with_its_line() {
        let err = parse_suite("8/8/8/8/8/8/8/K6k w - - bm Kb2; c9 \"a1z9\";").unwrap_err();
        assert!(matches!(err, Error::Suite { line: 1, .. }));
    }
}
