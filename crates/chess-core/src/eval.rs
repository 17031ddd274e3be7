//! Static material evaluation.
//!
//! Used as the alpha-beta leaf heuristic, for quiescence stand-pat, and for
//! scoring rollouts that reach the move cap without a result.

use crate::board::{Board, Role};
use crate::constants::CENTIPAWN_SCALE;
use crate::types::{Score, Value};

/// Material value of each role in centipawns.
#[inline]
pub const fn piece_value(role: Role) -> Score {
    match role {
        Role::Pawn => 100,
        Role::Knight => 320,
        Role::Bishop => 330,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 20_000,
    }
}

const ROLES: [Role; 6] = [
    Role::Pawn,
    Role::Knight,
    Role::Bishop,
    Role::Rook,
    Role::Queen,
    Role::King,
];

/// A static evaluation in both reporting units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    /// Bounded value in `[-1, 1]` from the side to move.
    pub value: Value,
    /// Centipawn score in `[-1000, 1000]` from the side to move.
    pub centipawns: Score,
}

/// Raw material balance from the side to move, unclamped.
pub fn material(board: &Board) -> Score {
    let us = board.turn();
    let them = !us;
    ROLES
        .iter()
        .map(|&role| {
            let diff = board.count(us, role) as Score - board.count(them, role) as Score;
            diff * piece_value(role)
        })
        .sum()
}

/// Evaluates a position from the side to move's perspective.
///
/// Terminal positions score their game-theoretic outcome: a checkmated side
/// to move gets -1, draws get 0.
pub fn evaluate(board: &Board) -> Evaluation {
    if let Some(terminal) = board.terminal() {
        let value = terminal.value();
        return Evaluation {
            value,
            centipawns: value_to_centipawns(value),
        };
    }
    evaluate_material(board)
}

/// Material evaluation without terminal detection.
#[inline]
pub fn evaluate_material(board: &Board) -> Evaluation {
    let cp = material(board).clamp(-CENTIPAWN_SCALE, CENTIPAWN_SCALE);
    Evaluation {
        value: centipawns_to_value(cp),
        centipawns: cp,
    }
}

/// Maps centipawns to `[-1, 1]`, saturating beyond +/-1000.
#[inline]
pub fn centipawns_to_value(cp: Score) -> Value {
    cp.clamp(-CENTIPAWN_SCALE, CENTIPAWN_SCALE) as Value / CENTIPAWN_SCALE as Value
}

#[inline]
pub fn value_to_centipawns(value: Value) -> Score {
    (value * CENTIPAWN_SCALE as Value).round() as Score
}

#[inline]
pub fn is_winning_position(value: Value) -> bool {
    value.abs() > 0.8
}

#[inline]
pub fn is_drawish_position(value: Value) -> bool {
    value.abs() < 0.1
}
