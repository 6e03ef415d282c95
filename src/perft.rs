//! Perft: leaf counting over the game tree.
//!
//! The traversal is iterative. Each frame keeps a snapshot of its position,
//! the moves still to try and the nodes counted so far; every undo is
//! checked against the snapshot, so a broken apply/undo pair surfaces as
//! [`Error::UndoMismatch`] instead of a silently wrong count.

use std::vec;

use log::debug;
use serde::Deserialize;

use crate::board::{Position, Undo};
use crate::compare::{candidates, CandidatePolicy};
use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::moves::Move;
use crate::oracle::{RuleOracle, ShakmatyOracle};
use crate::subject::{query_moves, SubjectEngine};

/// Where the traversal gets the moves of each node from. `ply` is the depth
/// of `pos` in the traversal, so sources can vary with depth.
pub trait MoveSource {
    fn moves(&mut self, pos: &Position, ply: usize) -> Result<Vec<Move>>;
}

impl<M: MoveSource + ?Sized> MoveSource for &mut M {
    fn moves(&mut self, pos: &Position, ply: usize) -> Result<Vec<Move>> {
        (**self).moves(pos, ply)
    }
}

impl<M: MoveSource + ?Sized> MoveSource for Box<M> {
    fn moves(&mut self, pos: &Position, ply: usize) -> Result<Vec<Move>> {
        (**self).moves(pos, ply)
    }
}

/// Every legal move, special moves included.
#[derive(Debug, Clone, Default)]
pub struct AllMoves<O = ShakmatyOracle> {
    oracle: O,
}

impl<O: RuleOracle> AllMoves<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }
}

impl<O: RuleOracle> MoveSource for AllMoves<O> {
    fn moves(&mut self, pos: &Position, _ply: usize) -> Result<Vec<Move>> {
        self.oracle.legal_moves(pos)
    }
}

/// The subject's move list, one subject query per node.
pub struct SubjectMoves<S> {
    subject: S,
}

impl<S: SubjectEngine> SubjectMoves<S> {
    pub fn new(subject: S) -> Self {
        Self { subject }
    }
}

impl<S: SubjectEngine> MoveSource for SubjectMoves<S> {
    fn moves(&mut self, pos: &Position, _ply: usize) -> Result<Vec<Move>> {
        query_moves(&mut self.subject, pos)?
            .iter()
            .map(|pair| pos.resolve(pair.from, pair.to, None))
            .collect()
    }
}

/// Candidate moves of an evaluator, best first.
pub struct RankedMoves<E> {
    evaluator: E,
    policy: CandidatePolicy,
}

impl<E: Evaluator> RankedMoves<E> {
    pub fn new(evaluator: E, policy: CandidatePolicy) -> Self {
        Self { evaluator, policy }
    }
}

impl<E: Evaluator> MoveSource for RankedMoves<E> {
    fn moves(&mut self, pos: &Position, _ply: usize) -> Result<Vec<Move>> {
        let scored = self.evaluator.score_moves(pos)?;
        Ok(candidates(&scored, self.policy)
            .into_iter()
            .filter_map(|pair| scored.iter().find(|s| s.mv.pair() == pair).map(|s| s.mv))
            .collect())
    }
}

/// Branching limit per ply: deeper plies get fewer branches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BranchCap {
    #[serde(rename = "branch_caps")]
    pub table: Vec<usize>,
    #[serde(rename = "fallback_cap")]
    pub fallback: usize,
}

impl Default for BranchCap {
    fn default() -> Self {
        Self {
            table: vec![5, 5, 5, 5, 4, 3, 2],
            fallback: 2,
        }
    }
}

impl BranchCap {
    pub fn new(table: Vec<usize>, fallback: usize) -> Self {
        Self { table, fallback }
    }

    /// Same cap at every ply.
    pub fn uniform(cap: usize) -> Self {
        Self::new(Vec::new(), cap)
    }

    /// Table from a command-line list; the last value applies deeper.
    pub fn from_list(caps: &[usize]) -> Option<Self> {
        let fallback = *caps.last()?;
        Some(Self::new(caps.to_vec(), fallback))
    }

    pub fn at(&self, ply: usize) -> usize {
        self.table.get(ply).copied().unwrap_or(self.fallback)
    }
}

/// Truncates another source's move list to [`BranchCap::at`] the ply.
pub struct Capped<M> {
    inner: M,
    caps: BranchCap,
}

impl<M: MoveSource> Capped<M> {
    pub fn new(inner: M, caps: BranchCap) -> Self {
        Self { inner, caps }
    }
}

impl<M: MoveSource> MoveSource for Capped<M> {
    fn moves(&mut self, pos: &Position, ply: usize) -> Result<Vec<Move>> {
        let mut moves = self.inner.moves(pos, ply)?;
        moves.truncate(self.caps.at(ply));
        Ok(moves)
    }
}

struct Frame {
    snapshot: Position,
    moves: vec::IntoIter<Move>,
    nodes: u64,
    // undo of the move leading into the child frame above this one
    pending: Option<Undo>,
}

impl Frame {
    fn new(snapshot: Position, moves: Vec<Move>) -> Self {
        Self {
            snapshot,
            moves: moves.into_iter(),
            nodes: 0,
            pending: None,
        }
    }
}

fn undo_checked(work: &mut Position, undo: Undo, snapshot: &Position) -> Result<()> {
    work.undo(undo);
    if *work != *snapshot {
        return Err(Error::UndoMismatch {
            before: snapshot.to_fen(),
            after: work.to_fen(),
        });
    }
    Ok(())
}

/// Leaf count of the tree below `pos`, which sits at `depth`, down to
/// `max_depth`. A position at `max_depth`, or one without moves, counts as
/// a single node.
pub fn perft<M: MoveSource + ?Sized>(
    pos: &Position,
    depth: usize,
    max_depth: usize,
    source: &mut M,
) -> Result<u64> {
    if depth >= max_depth {
        return Ok(1);
    }
    let mut work = pos.clone();
    let root_moves = source.moves(&work, depth)?;
    if root_moves.is_empty() {
        return Ok(1);
    }

    let mut stack = vec![Frame::new(work.clone(), root_moves)];
    loop {
        let ply = depth + stack.len().saturating_sub(1);
        let Some(top) = stack.last_mut() else { break };
        match top.moves.next() {
            Some(mv) => {
                let undo = work.apply(&mv)?;
                let child_ply = ply + 1;
                let child_moves = if child_ply < max_depth {
                    source.moves(&work, child_ply)?
                } else {
                    Vec::new()
                };
                if child_moves.is_empty() {
                    top.nodes += 1;
                    undo_checked(&mut work, undo, &top.snapshot)?;
                } else {
                    top.pending = Some(undo);
                    stack.push(Frame::new(work.clone(), child_moves));
                }
            }
            None => {
                let Some(done) = stack.pop() else { break };
                match stack.last_mut() {
                    Some(parent) => {
                        parent.nodes += done.nodes;
                        if let Some(undo) = parent.pending.take() {
                            undo_checked(&mut work, undo, &parent.snapshot)?;
                        }
                    }
                    None => {
                        debug!("perft {}..{} = {} nodes", depth, max_depth, done.nodes);
                        return Ok(done.nodes);
                    }
                }
            }
        }
    }
    Ok(0)
}

/// Per-root-move counts, in the source's order. Empty at the base case and
/// when the root has no moves; see [`divide_total`].
pub fn perft_divide<M: MoveSource + ?Sized>(
    pos: &Position,
    depth: usize,
    max_depth: usize,
    source: &mut M,
) -> Result<Vec<(Move, u64)>> {
    if depth >= max_depth {
        return Ok(Vec::new());
    }
    let mut work = pos.clone();
    let mut divide = Vec::new();
    for mv in source.moves(pos, depth)? {
        let undo = work.apply(&mv)?;
        let nodes = perft(&work, depth + 1, max_depth, source)?;
        undo_checked(&mut work, undo, pos)?;
        debug!("{}: {}", mv, nodes);
        divide.push((mv, nodes));
    }
    Ok(divide)
}

/// Node count of a divide listing. An empty listing is a leaf and counts as
/// one node, as in [`perft`].
pub fn divide_total(divide: &[(Move, u64)]) -> u64 {
    if divide.is_empty() {
        return 1;
    }
    divide.iter().map(|(_, nodes)| nodes).sum()
}
