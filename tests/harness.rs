use arbitro::board::Position;
use arbitro::compare::CandidatePolicy;
use arbitro::eval::{Evaluator, MaterialEvaluator, ScoredMove};
use arbitro::harness::{Harness, Mode, RunConfig, TrialOutcome, SKIPS_PER_TRIAL};
use arbitro::oracle::ShakmatyOracle;
use arbitro::sampler::SamplerConfig;
use arbitro::subject::{reference, FnSubject, QueryKind};
use arbitro::suite::parse_suite;

fn reference_subject(kind: QueryKind) -> FnSubject<impl FnMut(&str) -> String> {
    FnSubject::new(move |req: &str| reference::respond(kind, req).unwrap())
}

fn seeded(trials: usize) -> RunConfig {
    RunConfig::default()
        .trials(trials)
        .sampler(SamplerConfig::default().seed(Some(2024)))
}

fn fixed_positions() -> Vec<Position> {
    [
        "rnb2b1r/pp2kp2/6p1/2p1p1Pp/2P1n3/2QPB2B/qP2KP1P/RN4NR b - - 2 13",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    ]
    .iter()
    .map(|fen| Position::from_fen(fen).unwrap())
    .collect()
}

#[test]
fn correct_subject_passes_every_trial() {
    let mut harness = Harness::new(reference_subject(QueryKind::Moves), seeded(30));
    let report = harness.run_moves().unwrap();
    assert_eq!(report.trials, 30);
    assert_eq!(report.passed, 30);
    assert!(report.all_passed());
    assert_eq!(report.pass_percentage(), 100.0);
}

#[test]
fn strict_mode_stops_at_the_first_mismatch() {
    // drops the first move of every reply
    let lossy = FnSubject::new(|req: &str| {
        let full = reference::respond(QueryKind::Moves, req).unwrap();
        full.lines().skip(1).map(|l| format!("{}\n", l)).collect::<String>()
    });
    let config = RunConfig::default().fixed(fixed_positions());
    let report = Harness::new(lossy, config).run_moves().unwrap();

    assert_eq!(report.trials, 1);
    assert_eq!(report.mismatches, 1);
    let failure = report.first_failure().unwrap();
    assert_eq!(failure.fen, "rnb2b1r/pp2kp2/6p1/2p1p1Pp/2P1n3/2QPB2B/qP2KP1P/RN4NR b - - 2 13");
    match &failure.outcome {
        TrialOutcome::Mismatch(result) => {
            assert_eq!(result.missing.len(), 1);
            assert!(result.extra.is_empty());
        }
        other => panic!("expected a mismatch, got {:?}", other),
    }
}

#[test]
fn tolerant_mode_runs_every_trial() {
    // claims a1-h8 in every position
    let noisy = FnSubject::new(|req: &str| {
        let mut reply = reference::respond(QueryKind::Moves, req).unwrap();
        reply.push_str("0 63\n");
        reply
    });
    let config = RunConfig::default()
        .mode(Mode::Tolerant)
        .fixed(fixed_positions());
    let report = Harness::new(noisy, config).run_moves().unwrap();

    assert_eq!(report.trials, 3);
    assert_eq!(report.mismatches, 3);
    assert_eq!(report.pass_percentage(), 0.0);
    for failure in &report.failures {
        let TrialOutcome::Mismatch(result) = &failure.outcome else {
            panic!("expected a mismatch");
        };
        assert!(result.missing.is_empty());
        assert_eq!(result.extra.len(), 1);
    }
}

#[test]
fn malformed_output_is_counted_apart_from_mismatches() {
    let garbage = FnSubject::new(|_: &str| "e2e4\n".to_string());
    let config = RunConfig::default()
        .mode(Mode::Tolerant)
        .fixed(fixed_positions());
    let report = Harness::new(garbage, config).run_moves().unwrap();
    assert_eq!(report.malformed, 3);
    assert_eq!(report.mismatches, 0);
    assert!(matches!(
        report.first_failure().unwrap().outcome,
        TrialOutcome::Malformed(_)
    ));
}

#[test]
fn fixed_positions_lose_castling_and_en_passant() {
    let config = RunConfig::default().fixed(vec![Position::from_fen(
        "r3k2r/8/8/3pP3/8/8/8/R3K2R w KQkq d6 0 1",
    )
    .unwrap()]);
    assert!(config.fixed[0].castling.is_empty());
    assert!(config.fixed[0].ep.is_none());
    let report = Harness::new(reference_subject(QueryKind::Moves), config)
        .run_moves()
        .unwrap();
    assert!(report.all_passed());
}

#[test]
fn stalemate_runs_pass_with_a_correct_classifier() {
    let config = RunConfig::default()
        .stalemate(true)
        .fixed(vec![Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap()]);
    let report = Harness::new(reference_subject(QueryKind::GameState), config)
        .run_state()
        .unwrap();
    assert_eq!((report.trials, report.passed), (1, 1));
}

#[test]
fn wrong_state_token_is_a_mismatch() {
    let stuck = FnSubject::new(|_: &str| "IN_PROGRESS".to_string());
    let config = RunConfig::default().fixed(vec![Position::from_fen(
        "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w - - 1 3",
    )
    .unwrap()]);
    let report = Harness::new(stuck, config).run_state().unwrap();
    assert_eq!(report.mismatches, 1);
    assert!(report.first_failure().unwrap().to_string().contains("expected CHECKMATE"));
}

#[test]
fn best_move_from_the_same_evaluator_passes() {
    let config = seeded(10).policy(CandidatePolicy::TopK { k: 1 });
    let mut harness = Harness::new(reference_subject(QueryKind::BestMove), config);
    let mut evaluator = MaterialEvaluator::new(ShakmatyOracle);
    let report = harness.run_best(&mut evaluator).unwrap();
    assert_eq!(report.trials, 10);
    assert!(report.all_passed(), "{:?}", report.failures);
}

#[test]
fn suite_candidates_decide_best_move_trials() {
    let suite = parse_suite(concat!(
        "q3k3/8/8/8/8/8/8/R3K3 w - - bm Rxa8; id \"free queen\"; c9 \"a1a8\";\n",
        "q3k3/8/8/8/8/8/8/R3K3 w - - bm Ra2; id \"wrong answer on purpose\"; c9 \"a1a2\";\n",
    ))
    .unwrap();
    let config = RunConfig::default().mode(Mode::Tolerant);
    let report = Harness::new(reference_subject(QueryKind::BestMove), config)
        .run_suite(&suite)
        .unwrap();
    assert_eq!(report.trials, 2);
    assert_eq!(report.passed, 1);
    assert_eq!(report.mismatches, 1);
}

struct NoCandidates;

impl Evaluator for NoCandidates {
    fn score_moves(&mut self, _pos: &Position) -> arbitro::Result<Vec<ScoredMove>> {
        Ok(Vec::new())
    }
}

#[test]
fn endless_skipping_gives_up() {
    let config = seeded(2).mode(Mode::Tolerant);
    let mut harness = Harness::new(reference_subject(QueryKind::BestMove), config);
    let report = harness.run_best(&mut NoCandidates).unwrap();
    assert_eq!(report.trials, 0);
    assert_eq!(report.skipped, 2 * SKIPS_PER_TRIAL);
}
