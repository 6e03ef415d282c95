use arbitro::board::Position;
use arbitro::oracle::{to_chess, GameState, RuleOracle, ShakmatyOracle};
use arbitro::sampler::{PositionSampler, SampleConstraints, SampleOutcome, SamplerConfig};
use arbitro::subject::{query_moves, reference, FnSubject, QueryKind};

fn seeded(seed: u64) -> SamplerConfig {
    SamplerConfig::default().seed(Some(seed))
}

#[test]
fn accepted_positions_hold_the_constraints() {
    let mut sampler = PositionSampler::safe(seeded(11));
    for _ in 0..50 {
        let SampleOutcome::Found(pos) = sampler.sample() else {
            panic!("sampler exhausted");
        };
        assert!(pos.castling.is_empty(), "{}", pos.to_fen());
        assert!(pos.ep.is_none(), "{}", pos.to_fen());
        assert!(!pos.has_pawn_before_promotion(), "{}", pos.to_fen());
        assert!(SampleConstraints::SAFE.admits(&pos));
        to_chess(&pos).expect("sampled position is legal");
    }
    let stats = sampler.stats();
    assert_eq!(stats.accepted, 50);
    assert_eq!(
        stats.attempts,
        stats.accepted + stats.rejected_castling + stats.rejected_promotion
    );
}

#[test]
fn same_seed_same_positions() {
    let mut a = PositionSampler::safe(seeded(42));
    let mut b = PositionSampler::safe(seeded(42));
    for _ in 0..10 {
        assert_eq!(a.sample(), b.sample());
    }
}

#[test]
fn impossible_constraints_exhaust_the_budget() {
    // no stalemate is reachable in six plies
    let config = seeded(3).plies(5, 6).max_attempts(Some(25));
    let mut sampler = PositionSampler::random_stalemate(config);
    assert_eq!(sampler.sample(), SampleOutcome::Exhausted { attempts: 25 });
    assert_eq!(sampler.stats().rejected_not_stalemate, 25);

    let mut none = PositionSampler::safe(seeded(3).max_attempts(Some(0)));
    assert_eq!(none.sample(), SampleOutcome::Exhausted { attempts: 0 });
}

#[test]
fn stalemate_walks_are_found_and_cleaned() {
    // walks long enough to play most random games out
    let config = seeded(9).plies(200, 2000).max_attempts(Some(20_000));
    let mut sampler = PositionSampler::random_stalemate(config);
    let SampleOutcome::Found(pos) = sampler.sample() else {
        panic!("no stalemate within the budget");
    };
    assert!(SampleConstraints::STALEMATE.admits(&pos), "{}", pos.to_fen());
    assert_eq!(ShakmatyOracle.game_state(&pos).unwrap(), GameState::Stalemate);
    let reply = reference::respond(QueryKind::GameState, &pos.wire_fen()).unwrap();
    assert_eq!(reply.trim(), "STALEMATE");

    let stats = sampler.stats();
    assert_eq!(stats.accepted, 1);
    assert_eq!(
        stats.attempts,
        1 + stats.rejected_not_stalemate + stats.rejected_castling + stats.rejected_promotion
    );
}

#[test]
fn stalemate_constraint_accepts_a_stalemate() {
    let pos = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    let chess = to_chess(&pos).unwrap();
    let accepted = SampleConstraints::STALEMATE.inspect(&chess).unwrap();
    assert!(SampleConstraints::STALEMATE.admits(&accepted));
    assert_eq!(accepted.to_fen(), pos.to_fen());

    let start = to_chess(&Position::startpos()).unwrap();
    assert!(SampleConstraints::STALEMATE.inspect(&start).is_err());
}

#[test]
fn plies_are_normalised() {
    let config = SamplerConfig::default().plies(30, 10);
    assert_eq!((config.min_plies, config.max_plies), (10, 30));
}

#[test]
fn sampled_positions_agree_with_reference_subject() {
    let mut subject = FnSubject::new(|req: &str| reference::respond(QueryKind::Moves, req).unwrap());
    let mut sampler = PositionSampler::safe(seeded(5));
    for _ in 0..20 {
        let SampleOutcome::Found(pos) = sampler.sample() else {
            panic!("sampler exhausted");
        };
        let expected = ShakmatyOracle.filtered_moves(&pos).unwrap();
        let actual = query_moves(&mut subject, &pos).unwrap();
        assert_eq!(expected, actual, "{}", pos.to_fen());
    }
}
