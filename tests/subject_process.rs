use arbitro::board::Position;
use arbitro::error::{Error, SubjectError};
use arbitro::oracle::{GameState, RuleOracle, ShakmatyOracle};
use arbitro::subject::{query_best, query_moves, query_state, ProcessSubject, SubjectEngine};

fn subject(bin: &str) -> ProcessSubject {
    ProcessSubject::new(bin)
}

fn cleared(fen: &str) -> Position {
    let mut pos = Position::from_fen(fen).unwrap();
    pos.clear_special_rights();
    pos
}

#[test]
fn move_sets_are_equal_on_the_sample_position() {
    let pos = cleared("rnb2b1r/pp2kp2/6p1/2p1p1Pp/2P1n3/2QPB2B/qP2KP1P/RN4NR b - - 2 13");
    let mut engine = subject(env!("CARGO_BIN_EXE_ref_moves"));
    let actual = query_moves(&mut engine, &pos).unwrap();
    let expected = ShakmatyOracle.filtered_moves(&pos).unwrap();
    assert!(!expected.is_empty());
    assert_eq!(actual, expected);
}

#[test]
fn stalemate_is_classified_on_both_sides() {
    let pos = cleared("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
    let mut engine = subject(env!("CARGO_BIN_EXE_ref_state"));
    assert_eq!(ShakmatyOracle.game_state(&pos).unwrap(), GameState::Stalemate);
    assert_eq!(query_state(&mut engine, &pos).unwrap(), GameState::Stalemate);
}

#[test]
fn checkmate_and_running_game() {
    let mut engine = subject(env!("CARGO_BIN_EXE_ref_state"));
    let mate = cleared("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
    assert_eq!(query_state(&mut engine, &mate).unwrap(), GameState::Checkmate);
    assert_eq!(
        query_state(&mut engine, &Position::startpos()).unwrap(),
        GameState::InProgress
    );
}

#[test]
fn best_move_takes_the_hanging_queen() {
    let pos = cleared("q3k3/8/8/8/8/8/8/R3K3 w - - 0 1");
    let mut engine = subject(env!("CARGO_BIN_EXE_ref_best"));
    let best = query_best(&mut engine, &pos).unwrap();
    assert_eq!(best.to_wire(), "0 56");
}

#[test]
fn wire_request_has_two_fields() {
    // the reference subject rejects anything it cannot parse, so a reply
    // proves the two-field request is understood
    let mut engine = subject(env!("CARGO_BIN_EXE_ref_moves"));
    let raw = engine.exchange("4k3/8/8/8/8/8/8/4K3 w").unwrap();
    assert!(raw.success);
    assert_eq!(raw.stdout.lines().count(), 5);

    let bad = engine.exchange("not a fen").unwrap();
    assert!(!bad.success);
    assert!(!bad.stderr.is_empty());
}

#[test]
fn failing_subject_is_a_subject_error() {
    let mut engine = subject(env!("CARGO_BIN_EXE_ref_moves"));
    // no kings: the subject cannot parse the request and exits non-zero
    let err = query_moves(&mut engine, &Position::empty()).unwrap_err();
    assert!(matches!(err, Error::Subject(SubjectError::Exit { .. })), "{:?}", err);
}

#[test]
fn missing_executable_is_a_spawn_error() {
    let mut engine = subject("/nonexistent/subject-binary");
    let err = query_moves(&mut engine, &Position::startpos()).unwrap_err();
    assert!(matches!(err, Error::Subject(SubjectError::Spawn { .. })), "{:?}", err);
}

#[cfg(unix)]
#[test]
fn subject_that_ignores_its_input_still_answers() {
    // larger than a pipe buffer, so the write fails once `true` has exited
    let request = "8/".repeat(200_000);
    let raw = subject("true").exchange(&request).unwrap();
    assert!(raw.success);
    assert!(raw.stdout.is_empty());
}
