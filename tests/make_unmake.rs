use arbitro::board::Position;
use arbitro::oracle::{from_chess, to_chess, RuleOracle, ShakmatyOracle};
use proptest::prelude::*;
use shakmaty::{Chess, Position as _};

const FENS: [&str; 4] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
];

// Fields our apply and shakmaty's play must agree on. The en-passant
// target is left out: shakmaty only keeps it when a capture is legal.
fn comparable(pos: &Position) -> (String, String) {
    let fen = pos.to_fen();
    let fields: Vec<&str> = fen.split(' ').collect();
    (
        format!("{} {} {}", fields[0], fields[1], fields[2]),
        format!("{} {}", fields[4], fields[5]),
    )
}

#[test]
fn every_move_undoes_exactly() {
    for fen in FENS {
        let mut pos = Position::from_fen(fen).unwrap();
        let snapshot = pos.clone();
        for mv in ShakmatyOracle.legal_moves(&pos).unwrap() {
            let undo = pos.apply(&mv).unwrap();
            pos.undo(undo);
            assert_eq!(pos, snapshot, "undo of {} in {} changed the position", mv, fen);
        }
    }
}

#[test]
fn apply_agrees_with_shakmaty() {
    for fen in FENS {
        let pos = Position::from_fen(fen).unwrap();
        let chess = to_chess(&pos).unwrap();
        for m in chess.legal_moves() {
            let mv = arbitro::oracle::from_shakmaty_move(&m).unwrap();
            let mut ours = pos.clone();
            ours.apply(&mv).unwrap();

            let mut theirs = chess.clone();
            theirs.play_unchecked(&m);
            assert_eq!(
                comparable(&ours),
                comparable(&from_chess(&theirs)),
                "{} after {}",
                fen,
                mv
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_walks_round_trip(choices in proptest::collection::vec(any::<u16>(), 1..60)) {
        let mut chess = Chess::default();
        let mut pos = Position::startpos();
        for choice in choices {
            let moves = chess.legal_moves();
            if moves.is_empty() {
                break;
            }
            let m = &moves[choice as usize % moves.len()];
            let mv = arbitro::oracle::from_shakmaty_move(m).unwrap();

            let snapshot = pos.clone();
            let undo = pos.apply(&mv).unwrap();
            pos.undo(undo);
            prop_assert_eq!(&pos, &snapshot);

            pos.apply(&mv).unwrap();
            chess.play_unchecked(m);
            prop_assert_eq!(comparable(&pos), comparable(&from_chess(&chess)));
        }
    }
}
