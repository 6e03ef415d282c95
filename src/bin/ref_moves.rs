//! Reference subject answering move-generation queries.

use std::process::ExitCode;

use arbitro::subject::{reference, QueryKind};

fn main() -> ExitCode {
    reference::serve_stdio(QueryKind::Moves)
}
