// The rules oracle contract.
//
// Move legality and move application are external capabilities — this
// crate never implements board-game rules. A `RulesOracle` is consulted in
// exactly two places:
// - before a *local* move is committed, to check the proposed
//   origin/destination pair against the legal set;
// - to apply a move (local or remote) to the mirror. Remote moves are
//   trusted and go straight to `apply` without a legal-set check.
//
// `apply` takes the state by reference and returns a fresh mirror. An
// oracle must never mutate shared internal state to track the game —
// everything it needs is in the mirror it is handed, so the mirror the
// sync client holds is always the single source of truth.

use thiserror::Error;

use gambit_protocol::types::Move;

use crate::mirror::BoardMirror;

/// A move the oracle refused to apply.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("move {mv} is not legal in the current position")]
pub struct IllegalMove {
    pub mv: Move,
}

/// External authority on move legality and application.
pub trait RulesOracle {
    /// Every legal move in `state` for the side to move.
    fn legal_moves(&self, state: &BoardMirror) -> Vec<Move>;

    /// Apply `mv` to `state`, returning the resulting position as a new
    /// value. Fails with `IllegalMove` when the move cannot be applied.
    fn apply(&self, state: &BoardMirror, mv: Move) -> Result<BoardMirror, IllegalMove>;
}
