//! Move encoding shared by the oracle, the subject adapter and perft.
//!
//! A [`Move`] carries everything needed to apply it to a
//! [`Position`](crate::board::Position). Comparisons only ever look at the
//! bare [`MovePair`]: promotions, castles and en-passant captures are outside
//! the contract the subject is tested against.

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

use crate::board::{PieceKind, Square};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveTag {
    Castle,
    EnPassant,
}

/// `from`/`to` for a castle are the king's squares (e1g1, not e1h1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
    pub tag: Option<MoveTag>,
}

impl Move {
    pub fn normal(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
            tag: None,
        }
    }

    pub fn pair(&self) -> MovePair {
        MovePair {
            from: self.from,
            to: self.to,
        }
    }

    /// Promotions, castles and en-passant captures.
    pub fn is_excluded(&self) -> bool {
        self.promotion.is_some() || self.tag.is_some()
    }

    /// Convert to UCI notation (e.g., "e2e4" or "e7e8q")
    pub fn to_uci(&self) -> String {
        let mut uci = format!("{}{}", self.from, self.to);
        if let Some(promo) = self.promotion {
            uci.push(promo.to_char());
        }
        uci
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

/// Canonical move identity for comparisons. Ordered by `from` then `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MovePair {
    pub from: Square,
    pub to: Square,
}

impl MovePair {
    pub fn new(from: Square, to: Square) -> Self {
        Self { from, to }
    }

    pub fn from_indices(from: u8, to: u8) -> Option<Self> {
        Some(Self::new(Square::new(from)?, Square::new(to)?))
    }

    /// `"<from-index> <to-index>"`, as written by subjects.
    pub fn to_wire(&self) -> String {
        format!("{} {}", u8::from(self.from), u8::from(self.to))
    }
}

impl fmt::Display for MovePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} ({} {})",
            self.from,
            self.to,
            u8::from(self.from),
            u8::from(self.to)
        )
    }
}

impl From<&Move> for MovePair {
    fn from(mv: &Move) -> Self {
        mv.pair()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveSet(BTreeSet<MovePair>);

impl MoveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the pair was already present.
    pub fn insert(&mut self, pair: MovePair) -> bool {
        self.0.insert(pair)
    }

    pub fn contains(&self, pair: &MovePair) -> bool {
        self.0.contains(pair)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, MovePair> {
        self.0.iter()
    }

    /// Pairs in `self` that are absent from `other`.
    pub fn difference(&self, other: &MoveSet) -> MoveSet {
        MoveSet(self.0.difference(&other.0).copied().collect())
    }
}

impl FromIterator<MovePair> for MoveSet {
    fn from_iter<I: IntoIterator<Item = MovePair>>(iter: I) -> Self {
        MoveSet(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MoveSet {
    type Item = &'a MovePair;
    type IntoIter = btree_set::Iter<'a, MovePair>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for MoveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, pair) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", pair)?;
        }
        write!(f, "}}")
    }
}
