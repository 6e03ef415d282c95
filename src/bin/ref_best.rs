//! Reference subject answering best-move queries.

use std::process::ExitCode;

use arbitro::subject::{reference, QueryKind};

fn main() -> ExitCode {
    reference::serve_stdio(QueryKind::BestMove)
}
