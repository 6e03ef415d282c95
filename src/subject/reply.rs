//! Reply grammar. Anything off-grammar is a [`MalformedOutput`], never an
//! empty or partial answer.

use crate::error::MalformedOutput;
use crate::moves::{MovePair, MoveSet};
use crate::oracle::GameState;
use crate::subject::{QueryKind, SubjectReply};

pub fn parse_reply(kind: QueryKind, text: &str) -> Result<SubjectReply, MalformedOutput> {
    match kind {
        QueryKind::Moves => parse_moves(text).map(SubjectReply::Moves),
        QueryKind::GameState => parse_state(text).map(SubjectReply::State),
        QueryKind::BestMove => parse_best(text).map(SubjectReply::Best),
    }
}

// (1-based line number, trimmed text) of every non-blank line
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn malformed(kind: QueryKind, line: usize, text: &str, reason: &'static str) -> MalformedOutput {
    MalformedOutput {
        kind,
        line,
        text: text.to_string(),
        reason,
    }
}

/// `"<from> <to>"`, both in `[0, 63]`.
pub fn parse_pair(line: &str) -> Result<MovePair, &'static str> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [from, to] = fields.as_slice() else {
        return Err("expected two square indices");
    };
    let from: u8 = from.parse().map_err(|_| "square index is not an integer")?;
    let to: u8 = to.parse().map_err(|_| "square index is not an integer")?;
    MovePair::from_indices(from, to).ok_or("square index out of range")
}

pub fn parse_moves(text: &str) -> Result<MoveSet, MalformedOutput> {
    let mut set = MoveSet::new();
    for (number, line) in content_lines(text) {
        let pair = parse_pair(line).map_err(|r| malformed(QueryKind::Moves, number, line, r))?;
        set.insert(pair);
    }
    Ok(set)
}

fn single_line(kind: QueryKind, text: &str) -> Result<(usize, &str), MalformedOutput> {
    let mut lines = content_lines(text);
    let first = lines
        .next()
        .ok_or_else(|| malformed(kind, 1, "", "empty reply"))?;
    if let Some((number, line)) = lines.next() {
        return Err(malformed(kind, number, line, "expected a single line"));
    }
    Ok(first)
}

pub fn parse_state(text: &str) -> Result<GameState, MalformedOutput> {
    let (number, line) = single_line(QueryKind::GameState, text)?;
    line.parse()
        .map_err(|_| malformed(QueryKind::GameState, number, line, "unknown game state token"))
}

pub fn parse_best(text: &str) -> Result<MovePair, MalformedOutput> {
    let (number, line) = single_line(QueryKind::BestMove, text)?;
    parse_pair(line).map_err(|r| malformed(QueryKind::BestMove, number, line, r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_lines_and_blanks() {
        let set = parse_moves("12 28\n\n  6 21 \n12 20\n").unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains(&MovePair::from_indices(6, 21).unwrap()));
        assert!(parse_moves("").unwrap().is_empty());
    }

    #[test]
    fn bad_move_line_reports_position() {
        let err = parse_moves("12 28\ne2e4\n").unwrap_err();
        assert_eq!(err.kind, QueryKind::Moves);
        assert_eq!(err.line, 2);
        assert_eq!(err.text, "e2e4");

        assert_eq!(parse_moves("12 64").unwrap_err().reason, "square index out of range");
        assert_eq!(parse_moves("12 28 0").unwrap_err().reason, "expected two square indices");
        assert_eq!(parse_moves("-1 3").unwrap_err().reason, "square index is not an integer");
    }

    #[test]
    fn state_tokens_are_exact() {
        assert_eq!(parse_state("STALEMATE\n").unwrap(), GameState::Stalemate);
        assert_eq!(parse_state("\nCHECKMATE").unwrap(), GameState::Checkmate);
        assert!(parse_state("stalemate").is_err());
        assert!(parse_state("").is_err());
        assert_eq!(parse_state("IN_PROGRESS\nIN_PROGRESS").unwrap_err().line, 2);
    }

    #[test]
    fn best_move_is_one_line() {
        assert_eq!(
            parse_best("12 28\n").unwrap(),
            MovePair::from_indices(12, 28).unwrap()
        );
        assert!(parse_best("12 28\n11 27").is_err());
        assert!(parse_best("").is_err());
    }
}
