// Mapping di quadrati: A1=0, B1=1, ..., H8=63
// The same mapping is used on the wire, so every integer a subject prints
// is `rank * 8 + file`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, FenError, Result};
use crate::moves::{Move, MoveTag};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank index a pawn of this colour promotes on.
    pub fn promotion_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    fn fen_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    pub fn from_char(ch: char) -> Option<PieceKind> {
        match ch.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Lowercase letter, as used for UCI promotion suffixes.
    pub fn to_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    pub fn from_fen_char(ch: char) -> Option<Piece> {
        let kind = PieceKind::from_char(ch)?;
        let color = if ch.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece::new(kind, color))
    }

    pub fn to_fen_char(self) -> char {
        let ch = self.kind.to_char();
        match self.color {
            Color::White => ch.to_ascii_uppercase(),
            Color::Black => ch,
        }
    }
}

/// Board square, `rank * 8 + file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    pub const A1: Square = Square(0);
    pub const C1: Square = Square(2);
    pub const E1: Square = Square(4);
    pub const G1: Square = Square(6);
    pub const H1: Square = Square(7);
    pub const A8: Square = Square(56);
    pub const C8: Square = Square(58);
    pub const E8: Square = Square(60);
    pub const G8: Square = Square(62);
    pub const H8: Square = Square(63);

    pub fn new(index: u8) -> Option<Square> {
        (index < 64).then_some(Square(index))
    }

    pub fn from_coords(file: u8, rank: u8) -> Option<Square> {
        (file < 8 && rank < 8).then(|| Square(rank * 8 + file))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn file(self) -> u8 {
        self.0 % 8
    }

    pub fn rank(self) -> u8 {
        self.0 / 8
    }

    /// Vertical step by whole ranks; `None` when it leaves the board.
    pub fn offset_ranks(self, ranks: i8) -> Option<Square> {
        let rank = self.rank() as i8 + ranks;
        (0..8)
            .contains(&rank)
            .then(|| Square(rank as u8 * 8 + self.file()))
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).map(Square)
    }
}

impl From<Square> for u8 {
    fn from(sq: Square) -> u8 {
        sq.0
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file_char = (b'a' + self.file()) as char;
        let rank_char = (b'1' + self.rank()) as char;
        write!(f, "{}{}", file_char, rank_char)
    }
}

impl FromStr for Square {
    type Err = &'static str;

    /// Convert UCI notation to a square (e.g., "e2" -> 12, "a1" -> 0)
    fn from_str(uci: &str) -> std::result::Result<Square, Self::Err> {
        let bytes = uci.as_bytes();
        if bytes.len() != 2 {
            return Err("Invalid square notation");
        }
        let (file, rank) = (bytes[0], bytes[1]);
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err("Invalid square notation");
        }
        Ok(Square((rank - b'1') * 8 + (file - b'a')))
    }
}

/// 4 LSB: white kingside, white queenside, black kingside, black queenside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const WHITE_KING: u8 = 0b1000;
    pub const WHITE_QUEEN: u8 = 0b0100;
    pub const BLACK_KING: u8 = 0b0010;
    pub const BLACK_QUEEN: u8 = 0b0001;
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn insert(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn remove(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Rights lost when a piece leaves or lands on `sq`.
    fn touched_by(sq: Square) -> u8 {
        match sq {
            Square::E1 => Self::WHITE_KING | Self::WHITE_QUEEN,
            Square::H1 => Self::WHITE_KING,
            Square::A1 => Self::WHITE_QUEEN,
            Square::E8 => Self::BLACK_KING | Self::BLACK_QUEEN,
            Square::H8 => Self::BLACK_KING,
            Square::A8 => Self::BLACK_QUEEN,
            _ => 0,
        }
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        for (flag, ch) in [
            (Self::WHITE_KING, 'K'),
            (Self::WHITE_QUEEN, 'Q'),
            (Self::BLACK_KING, 'k'),
            (Self::BLACK_QUEEN, 'q'),
        ] {
            if self.has(flag) {
                write!(f, "{}", ch)?;
            }
        }
        Ok(())
    }
}

// Undo entry per rollback
#[derive(Debug, Clone)]
pub struct Undo {
    pub mv: Move,
    pub moved: Piece,
    pub captured: Option<(Square, Piece)>,
    pub prev_castling: CastlingRights,
    pub prev_ep: Option<Square>,
    pub prev_halfmove: u32,
    pub prev_fullmove: u32,
}

/// Full position record: placement, side to move, castling rights,
/// en-passant target and move counters.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Position {
    squares: [Option<Piece>; 64],
    pub side: Color,
    pub castling: CastlingRights,
    pub ep: Option<Square>,
    pub halfmove: u32,
    pub fullmove: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl Position {
    // Board vuota da popolare via FEN
    pub fn empty() -> Self {
        Self {
            squares: [None; 64],
            side: Color::White,
            castling: CastlingRights::NONE,
            ep: None,
            halfmove: 0,
            fullmove: 1,
        }
    }

    pub fn startpos() -> Self {
        let mut pos = Self::empty();
        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for (file, kind) in back.into_iter().enumerate() {
            pos.squares[file] = Some(Piece::new(kind, Color::White));
            pos.squares[8 + file] = Some(Piece::new(PieceKind::Pawn, Color::White));
            pos.squares[48 + file] = Some(Piece::new(PieceKind::Pawn, Color::Black));
            pos.squares[56 + file] = Some(Piece::new(kind, Color::Black));
        }
        pos.castling = CastlingRights::ALL;
        pos
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    pub fn set_piece(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.index()] = piece;
    }

    /// Occupied squares in index order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.kind == PieceKind::King && p.color == color)
            .map(|(sq, _)| sq)
    }

    /// Drops castling rights and the en-passant target, leaving placement,
    /// side to move and counters untouched.
    pub fn clear_special_rights(&mut self) {
        self.castling = CastlingRights::NONE;
        self.ep = None;
    }

    /// True when a pawn of either colour stands one step from promotion.
    pub fn has_pawn_before_promotion(&self) -> bool {
        self.pieces().any(|(sq, p)| {
            p.kind == PieceKind::Pawn
                && match p.color {
                    Color::White => sq.rank() == 6,
                    Color::Black => sq.rank() == 1,
                }
        })
    }

    pub fn from_fen(fen: &str) -> std::result::Result<Self, FenError> {
        let mut parts = fen.split_whitespace();
        let piece_part = parts.next().ok_or(FenError::MissingPlacement)?;

        let mut pos = Self::empty();

        // Parse pieces: rank8 .. rank1
        let ranks: Vec<&str> = piece_part.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::RankCount(ranks.len()));
        }
        for (i, rank_part) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for ch in rank_part.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(FenError::RankWidth { rank: rank as usize + 1 });
                    }
                    file += skip as u8;
                } else {
                    let piece = Piece::from_fen_char(ch).ok_or(FenError::PieceChar(ch))?;
                    let sq = Square::from_coords(file, rank)
                        .ok_or(FenError::RankWidth { rank: rank as usize + 1 })?;
                    pos.set_piece(sq, Some(piece));
                    file += 1;
                }
                if file > 8 {
                    return Err(FenError::RankWidth { rank: rank as usize + 1 });
                }
            }
            if file != 8 {
                return Err(FenError::RankWidth { rank: rank as usize + 1 });
            }
        }

        let count_kings = |color| {
            pos.pieces()
                .filter(|(_, p)| p.kind == PieceKind::King && p.color == color)
                .count()
        };
        let (white, black) = (count_kings(Color::White), count_kings(Color::Black));
        if white != 1 || black != 1 {
            return Err(FenError::KingCount { white, black });
        }

        // The wire form stops after the side to move, EPD after the ep field.
        pos.side = match parts.next() {
            None | Some("w") => Color::White,
            Some("b") => Color::Black,
            Some(other) => return Err(FenError::Side(other.to_string())),
        };

        if let Some(castle_part) = parts.next() {
            for ch in castle_part.chars() {
                match ch {
                    'K' => pos.castling.insert(CastlingRights::WHITE_KING),
                    'Q' => pos.castling.insert(CastlingRights::WHITE_QUEEN),
                    'k' => pos.castling.insert(CastlingRights::BLACK_KING),
                    'q' => pos.castling.insert(CastlingRights::BLACK_QUEEN),
                    '-' if castle_part.len() == 1 => {}
                    _ => return Err(FenError::Castling(castle_part.to_string())),
                }
            }
        }

        pos.ep = match parts.next() {
            None | Some("-") => None,
            Some(s) => {
                let sq: Square = s.parse().map_err(|_| FenError::EnPassant(s.to_string()))?;
                if sq.rank() != 2 && sq.rank() != 5 {
                    return Err(FenError::EnPassant(s.to_string()));
                }
                Some(sq)
            }
        };

        if let Some(halfmove_part) = parts.next() {
            pos.halfmove = halfmove_part.parse().map_err(|_| FenError::Counter {
                field: "halfmove clock",
                value: halfmove_part.to_string(),
            })?;
        }
        if let Some(fullmove_part) = parts.next() {
            pos.fullmove = fullmove_part.parse().map_err(|_| FenError::Counter {
                field: "fullmove number",
                value: fullmove_part.to_string(),
            })?;
        }

        Ok(pos)
    }

    /// First FEN field only.
    pub fn placement(&self) -> String {
        let mut out = String::with_capacity(71);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match self.squares[(rank * 8 + file) as usize] {
                    Some(piece) => {
                        if empty > 0 {
                            out.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        out.push(piece.to_fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }

    /// The subject request line: placement and side to move, nothing else.
    pub fn wire_fen(&self) -> String {
        format!("{} {}", self.placement(), self.side.fen_char())
    }

    pub fn to_fen(&self) -> String {
        let ep = self.ep.map_or_else(|| "-".to_string(), |sq| sq.to_string());
        format!(
            "{} {} {} {} {} {}",
            self.placement(),
            self.side.fen_char(),
            self.castling,
            ep,
            self.halfmove,
            self.fullmove
        )
    }

    /// Builds the full move for a bare `from`/`to` pair, inferring the
    /// castle and en-passant tags from the position. Pawn moves to the last
    /// rank promote to `promotion`, or to a queen when none is given.
    pub fn resolve(&self, from: Square, to: Square, promotion: Option<PieceKind>) -> Result<Move> {
        let piece = self.piece_at(from).ok_or(Error::EmptySquare(from))?;
        let mut mv = Move::normal(from, to);
        match piece.kind {
            PieceKind::King if from.file().abs_diff(to.file()) == 2 => {
                mv.tag = Some(MoveTag::Castle);
            }
            PieceKind::Pawn => {
                if from.file() != to.file() && self.piece_at(to).is_none() && self.ep == Some(to) {
                    mv.tag = Some(MoveTag::EnPassant);
                }
                if to.rank() == piece.color.promotion_rank() {
                    mv.promotion = Some(promotion.unwrap_or(PieceKind::Queen));
                }
            }
            _ => {}
        }
        Ok(mv)
    }

    /// Parse a UCI move string ("e2e4", "e7e8q") against this position.
    pub fn parse_uci_move(&self, uci: &str) -> std::result::Result<Move, &'static str> {
        if uci.len() < 4 || uci.len() > 5 || !uci.is_ascii() {
            return Err("UCI move has the wrong length");
        }
        let from: Square = uci[0..2].parse()?;
        let to: Square = uci[2..4].parse()?;
        let promotion = match uci.chars().nth(4) {
            None => None,
            Some(ch @ ('q' | 'r' | 'b' | 'n')) => PieceKind::from_char(ch),
            Some(_) => return Err("Invalid promotion piece"),
        };
        self.resolve(from, to, promotion)
            .map_err(|_| "No piece on the origin square")
    }

    fn castle_rook_squares(king_to: Square) -> (Square, Square) {
        // (rook_from, rook_to) on the king's rank
        let rank = king_to.rank() * 8;
        if king_to.file() == 6 {
            (Square(rank + 7), Square(rank + 5))
        } else {
            (Square(rank), Square(rank + 3))
        }
    }

    /// Plays `mv` without any legality check. The returned [`Undo`] restores
    /// the position exactly when passed to [`Position::undo`].
    pub fn apply(&mut self, mv: &Move) -> Result<Undo> {
        let moved = self.piece_at(mv.from).ok_or(Error::EmptySquare(mv.from))?;
        let color = moved.color;

        let captured_sq = if mv.tag == Some(MoveTag::EnPassant) {
            let back = if color == Color::White { -1 } else { 1 };
            mv.to.offset_ranks(back).ok_or(Error::EmptySquare(mv.to))?
        } else {
            mv.to
        };
        let captured = self.piece_at(captured_sq).map(|p| (captured_sq, p));

        let undo = Undo {
            mv: *mv,
            moved,
            captured,
            prev_castling: self.castling,
            prev_ep: self.ep,
            prev_halfmove: self.halfmove,
            prev_fullmove: self.fullmove,
        };

        self.set_piece(mv.from, None);
        if let Some((sq, _)) = captured {
            self.set_piece(sq, None);
        }
        let placed = match mv.promotion {
            Some(kind) => Piece::new(kind, color),
            None => moved,
        };
        self.set_piece(mv.to, Some(placed));

        // Handle castling: move the rook as well
        if mv.tag == Some(MoveTag::Castle) {
            let (rook_from, rook_to) = Self::castle_rook_squares(mv.to);
            let rook = self.piece_at(rook_from);
            self.set_piece(rook_from, None);
            self.set_piece(rook_to, rook);
        }

        self.castling
            .remove(CastlingRights::touched_by(mv.from) | CastlingRights::touched_by(mv.to));

        self.ep = if moved.kind == PieceKind::Pawn && mv.from.rank().abs_diff(mv.to.rank()) == 2 {
            Square::new((mv.from.0 + mv.to.0) / 2)
        } else {
            None
        };

        self.halfmove += 1;
        if moved.kind == PieceKind::Pawn || captured.is_some() {
            self.halfmove = 0;
        }
        if color == Color::Black {
            self.fullmove += 1;
        }
        self.side = color.opposite();

        Ok(undo)
    }

    pub fn undo(&mut self, undo: Undo) {
        let mv = undo.mv;
        self.set_piece(mv.to, None);
        if mv.tag == Some(MoveTag::Castle) {
            let (rook_from, rook_to) = Self::castle_rook_squares(mv.to);
            let rook = self.piece_at(rook_to);
            self.set_piece(rook_to, None);
            self.set_piece(rook_from, rook);
        }
        self.set_piece(mv.from, Some(undo.moved));
        if let Some((sq, piece)) = undo.captured {
            self.set_piece(sq, Some(piece));
        }

        self.side = undo.moved.color;
        self.castling = undo.prev_castling;
        self.ep = undo.prev_ep;
        self.halfmove = undo.prev_halfmove;
        self.fullmove = undo.prev_fullmove;
    }
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Position::from_fen(s)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({})", self.to_fen())
    }
}

// Simple display (grid)
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8u8 {
                match self.squares[(rank * 8 + file) as usize] {
                    Some(piece) => write!(f, "{} ", piece.to_fen_char())?,
                    None => write!(f, ". ")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "  a b c d e f g h")
    }
}
