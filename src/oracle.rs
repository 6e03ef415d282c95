//! Reference rule engine.
//!
//! The harness never generates moves itself: ground truth comes from
//! `shakmaty`, behind the [`RuleOracle`] trait so a different trusted
//! implementation can be dropped in.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use shakmaty::{Bitboard, CastlingMode, Chess, EnPassantMode, FromSetup, Position as _, Setup};

use crate::board::{CastlingRights, Color, Piece, PieceKind, Position, Square};
use crate::compare::oracle_move_set;
use crate::error::{Error, Result};
use crate::moves::{Move, MoveSet, MoveTag};

/// Game-state classification. Exactly one variant holds for any position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    InProgress,
    Checkmate,
    Stalemate,
}

impl GameState {
    pub const ALL: [GameState; 3] = [
        GameState::InProgress,
        GameState::Checkmate,
        GameState::Stalemate,
    ];

    pub fn token(self) -> &'static str {
        match self {
            GameState::InProgress => "IN_PROGRESS",
            GameState::Checkmate => "CHECKMATE",
            GameState::Stalemate => "STALEMATE",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for GameState {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        GameState::ALL
            .into_iter()
            .find(|state| state.token() == s)
            .ok_or(())
    }
}

pub trait RuleOracle {
    /// Every legal move, special moves included.
    fn legal_moves(&self, pos: &Position) -> Result<Vec<Move>>;

    fn game_state(&self, pos: &Position) -> Result<GameState>;

    /// Legal moves reduced to the pairs a subject is expected to report.
    fn filtered_moves(&self, pos: &Position) -> Result<MoveSet> {
        Ok(oracle_move_set(&self.legal_moves(pos)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShakmatyOracle;

impl RuleOracle for ShakmatyOracle {
    fn legal_moves(&self, pos: &Position) -> Result<Vec<Move>> {
        let chess = to_chess(pos)?;
        Ok(chess.legal_moves().iter().filter_map(from_shakmaty_move).collect())
    }

    fn game_state(&self, pos: &Position) -> Result<GameState> {
        Ok(classify(&to_chess(pos)?))
    }
}

pub fn classify(chess: &Chess) -> GameState {
    if chess.is_checkmate() {
        GameState::Checkmate
    } else if chess.is_stalemate() {
        GameState::Stalemate
    } else {
        GameState::InProgress
    }
}

fn to_shakmaty_square(sq: Square) -> shakmaty::Square {
    shakmaty::Square::new(u32::from(u8::from(sq)))
}

fn from_shakmaty_square(sq: shakmaty::Square) -> Square {
    // shakmaty squares use the same a1 = 0 .. h8 = 63 layout
    Square::new(sq as u8).unwrap_or(Square::A1)
}

fn to_role(kind: PieceKind) -> shakmaty::Role {
    match kind {
        PieceKind::Pawn => shakmaty::Role::Pawn,
        PieceKind::Knight => shakmaty::Role::Knight,
        PieceKind::Bishop => shakmaty::Role::Bishop,
        PieceKind::Rook => shakmaty::Role::Rook,
        PieceKind::Queen => shakmaty::Role::Queen,
        PieceKind::King => shakmaty::Role::King,
    }
}

fn from_role(role: shakmaty::Role) -> PieceKind {
    match role {
        shakmaty::Role::Pawn => PieceKind::Pawn,
        shakmaty::Role::Knight => PieceKind::Knight,
        shakmaty::Role::Bishop => PieceKind::Bishop,
        shakmaty::Role::Rook => PieceKind::Rook,
        shakmaty::Role::Queen => PieceKind::Queen,
        shakmaty::Role::King => PieceKind::King,
    }
}

fn to_color(color: Color) -> shakmaty::Color {
    match color {
        Color::White => shakmaty::Color::White,
        Color::Black => shakmaty::Color::Black,
    }
}

fn from_color(color: shakmaty::Color) -> Color {
    match color {
        shakmaty::Color::White => Color::White,
        shakmaty::Color::Black => Color::Black,
    }
}

// Standard castling: rights are stored as the rook's home square.
const CASTLING_ROOKS: [(u8, shakmaty::Square); 4] = [
    (CastlingRights::WHITE_KING, shakmaty::Square::H1),
    (CastlingRights::WHITE_QUEEN, shakmaty::Square::A1),
    (CastlingRights::BLACK_KING, shakmaty::Square::H8),
    (CastlingRights::BLACK_QUEEN, shakmaty::Square::A8),
];

pub fn to_setup(pos: &Position) -> Setup {
    let mut setup = Setup::empty();
    for (sq, piece) in pos.pieces() {
        setup.board.set_piece_at(
            to_shakmaty_square(sq),
            shakmaty::Piece {
                color: to_color(piece.color),
                role: to_role(piece.kind),
            },
        );
    }
    setup.turn = to_color(pos.side);
    let mut rights = Bitboard::EMPTY;
    for (flag, rook) in CASTLING_ROOKS {
        if pos.castling.has(flag) {
            rights |= Bitboard::from(rook);
        }
    }
    setup.castling_rights = rights;
    setup.ep_square = pos.ep.map(to_shakmaty_square);
    setup.halfmoves = pos.halfmove;
    setup.fullmoves = NonZeroU32::new(pos.fullmove).unwrap_or(NonZeroU32::MIN);
    setup
}

pub fn from_setup(setup: &Setup) -> Position {
    let mut pos = Position::empty();
    for sq in Square::all() {
        let piece = setup
            .board
            .piece_at(to_shakmaty_square(sq))
            .map(|p| Piece::new(from_role(p.role), from_color(p.color)));
        pos.set_piece(sq, piece);
    }
    pos.side = from_color(setup.turn);
    for (flag, rook) in CASTLING_ROOKS {
        if setup.castling_rights.contains(rook) {
            pos.castling.insert(flag);
        }
    }
    pos.ep = setup.ep_square.map(from_shakmaty_square);
    pos.halfmove = setup.halfmoves;
    pos.fullmove = setup.fullmoves.get();
    pos
}

/// Validates `pos` with the reference engine.
pub fn to_chess(pos: &Position) -> Result<Chess> {
    Chess::from_setup(to_setup(pos), CastlingMode::Standard).map_err(|e| Error::IllegalPosition {
        fen: pos.to_fen(),
        reason: e.to_string(),
    })
}

pub fn from_chess(chess: &Chess) -> Position {
    from_setup(&chess.clone().into_setup(EnPassantMode::Legal))
}

/// `None` for drops, which standard chess never produces.
pub fn from_shakmaty_move(m: &shakmaty::Move) -> Option<Move> {
    match *m {
        shakmaty::Move::Normal {
            from, to, promotion, ..
        } => Some(Move {
            from: from_shakmaty_square(from),
            to: from_shakmaty_square(to),
            promotion: promotion.map(from_role),
            tag: None,
        }),
        shakmaty::Move::EnPassant { from, to } => Some(Move {
            from: from_shakmaty_square(from),
            to: from_shakmaty_square(to),
            promotion: None,
            tag: Some(MoveTag::EnPassant),
        }),
        shakmaty::Move::Castle { king, rook } => {
            let king = from_shakmaty_square(king);
            let rook = from_shakmaty_square(rook);
            let file = if rook.file() > king.file() { 6 } else { 2 };
            let to = Square::from_coords(file, king.rank())?;
            Some(Move {
                from: king,
                to,
                promotion: None,
                tag: Some(MoveTag::Castle),
            })
        }
        shakmaty::Move::Put { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::START_FEN;

    #[test]
    fn tokens_round_trip() {
        for state in GameState::ALL {
            assert_eq!(state.token().parse::<GameState>(), Ok(state));
        }
        assert!("in_progress".parse::<GameState>().is_err());
    }

    #[test]
    fn setup_conversion_keeps_every_field() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 3 17";
        let pos = Position::from_fen(fen).unwrap();
        let chess = to_chess(&pos).unwrap();
        assert_eq!(from_chess(&chess).to_fen(), fen);
    }

    #[test]
    fn startpos_has_twenty_moves() {
        let pos = Position::from_fen(START_FEN).unwrap();
        let moves = ShakmatyOracle.legal_moves(&pos).unwrap();
        assert_eq!(moves.len(), 20);
        assert_eq!(ShakmatyOracle.game_state(&pos).unwrap(), GameState::InProgress);
    }

    #[test]
    fn castles_use_king_destination() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let castles: Vec<String> = ShakmatyOracle
            .legal_moves(&pos)
            .unwrap()
            .into_iter()
            .filter(|m| m.tag == Some(MoveTag::Castle))
            .map(|m| m.to_uci())
            .collect();
        assert_eq!(castles.len(), 2);
        assert!(castles.contains(&"e1g1".to_string()));
        assert!(castles.contains(&"e1c1".to_string()));
    }
}
