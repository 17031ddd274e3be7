//! Scored move lists and move ordering.

use arrayvec::ArrayVec;

use crate::board::{Board, Move, Role};
use crate::constants::MAX_MOVES;
use crate::eval::piece_value;
use crate::search::search_context::SearchContext;

/// Value assigned to the move suggested by the transposition table.
const TT_MOVE_VALUE: i32 = 1 << 20;

/// Base value of every capture before MVV-LVA.
const CAPTURE_BASE: i32 = 1000;

/// Bonus added to promotions.
const PROMOTION_BONUS: i32 = 900;

/// Bonus for quiet moves stored as killers at the current ply.
const KILLER_BONUS: i32 = 800;

/// Cap on the history contribution so killers keep precedence.
const HISTORY_MAX: i32 = KILLER_BONUS - 100;

/// A move with its ordering value.
#[derive(Clone, Debug)]
pub struct ScoredMove {
    pub mv: Move,
    /// Ordering value (higher = searched earlier).
    pub value: i32,
}

/// Container for the moves of one node with ordering capabilities.
#[derive(Clone, Debug, Default)]
pub struct MoveList {
    moves: ArrayVec<ScoredMove, MAX_MOVES>,
}

impl MoveList {
    /// Collects all legal moves of `board`.
    pub fn new(board: &Board) -> MoveList {
        Self::from_moves(board.legal_moves().iter())
    }

    /// Collects only the legal captures of `board`.
    pub fn captures(board: &Board) -> MoveList {
        Self::from_moves(board.captures().iter())
    }

    /// Wraps an already generated move list.
    pub fn from_moves<'a>(moves: impl IntoIterator<Item = &'a Move>) -> MoveList {
        MoveList {
            moves: moves
                .into_iter()
                .map(|mv| ScoredMove {
                    mv: mv.clone(),
                    value: 0,
                })
                .collect(),
        }
    }

    /// Returns the number of moves in this list.
    #[inline]
    pub fn count(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredMove> {
        self.moves.iter()
    }

    /// Scores every move for ordering at `ply`.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Search context holding killer and history tables
    /// * `ply` - Distance from the root
    /// * `tt_move` - Move suggested by the transposition table, if any
    pub fn evaluate_moves(&mut self, ctx: &SearchContext, ply: usize, tt_move: Option<&Move>) {
        for sm in self.moves.iter_mut() {
            sm.value = if tt_move == Some(&sm.mv) {
                TT_MOVE_VALUE
            } else {
                let mut value = tactical_value(&sm.mv);
                if !sm.mv.is_capture() {
                    if ctx.is_killer(ply, &sm.mv) {
                        value += KILLER_BONUS;
                    }
                    value += ctx.history(&sm.mv).min(HISTORY_MAX);
                }
                value
            };
        }
    }

    /// Scores captures by MVV-LVA only.
    pub fn evaluate_captures(&mut self) {
        for sm in self.moves.iter_mut() {
            sm.value = tactical_value(&sm.mv);
        }
    }

    /// Sorts all moves in descending order of their values.
    ///
    /// The sort is stable so equal values keep move generation order.
    #[inline]
    pub fn sort(&mut self) {
        self.moves.sort_by_key(|sm| -sm.value);
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a ScoredMove;
    type IntoIter = std::slice::Iter<'a, ScoredMove>;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.iter()
    }
}

/// Most valuable victim, least valuable attacker.
///
/// A capturing king counts as a zero-value attacker.
#[inline]
pub fn mvv_lva(victim: Role, attacker: Role) -> i32 {
    let attacker_value = match attacker {
        Role::King => 0,
        role => piece_value(role),
    };
    CAPTURE_BASE + piece_value(victim) - attacker_value
}

/// Capture and promotion part of a move's ordering value.
#[inline]
fn tactical_value(mv: &Move) -> i32 {
    let mut value = 0;
    if let Some(victim) = mv.capture() {
        value += mvv_lva(victim, mv.role());
    }
    if mv.is_promotion() {
        value += PROMOTION_BONUS;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::search_context::SearchContext;

    fn order(board: &Board, ctx: &SearchContext, tt_move: Option<&Move>) -> Vec<String> {
        let mut list = MoveList::new(board);
        list.evaluate_moves(ctx, 0, tt_move);
        list.sort();
        list.iter().map(|sm| Board::uci(&sm.mv)).collect()
    }

    #[test]
    fn test_mvv_lva() {
        assert_eq!(mvv_lva(Role::Queen, Role::Pawn), 1800);
        assert_eq!(mvv_lva(Role::Pawn, Role::Queen), 200);
        assert_eq!(mvv_lva(Role::Rook, Role::King), 1500);
    }

    #[test]
    fn test_captures_first_most_valuable_victim() {
        // White pawn on d4 can take a queen on e5 or a knight on c5
        let board = Board::from_fen("4k3/8/8/2n1q3/3P4/8/8/7K w - - 0 1").unwrap();
        let ctx = SearchContext::new(None, None);
        let moves = order(&board, &ctx, None);
        assert_eq!(moves[0], "d4e5");
        assert_eq!(moves[1], "d4c5");
    }

    #[test]
    fn test_tt_move_comes_first() {
        let board = Board::new();
        let ctx = SearchContext::new(None, None);
        let tt_move = board.parse_uci("g1f3").unwrap();
        assert_eq!(order(&board, &ctx, Some(&tt_move))[0], "g1f3");
    }

    #[test]
    fn test_killer_and_history_bonus() {
        let board = Board::new();
        let mut ctx = SearchContext::new(None, None);
        let killer = board.parse_uci("b1c3").unwrap();
        let hist = board.parse_uci("h2h3").unwrap();
        ctx.store_killer(0, &killer);
        ctx.update_history(&hist, 3);

        let moves = order(&board, &ctx, None);
        assert_eq!(moves[0], "b1c3");
        assert_eq!(moves[1], "h2h3");
    }

    #[test]
    fn test_promotion_bonus() {
        let board = Board::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let ctx = SearchContext::new(None, None);
        let moves = order(&board, &ctx, None);
        assert!(moves[0].starts_with("a7a8"));
    }

    #[test]
    fn test_capture_list() {
        let board = Board::from_fen("4k3/8/8/2n1q3/3P4/8/8/7K w - - 0 1").unwrap();
        let mut list = MoveList::captures(&board);
        list.evaluate_captures();
        list.sort();
        assert_eq!(list.count(), 2);
        assert_eq!(list.iter().next().map(|sm| sm.value), Some(1800));
    }
}
