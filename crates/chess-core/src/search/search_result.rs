use std::time::Duration;

use crate::board::{Board, Move, Terminal};
use crate::constants::{SCORE_MATE, SCORE_MATE_IN_MAX_PLY};
use crate::eval::{centipawns_to_value, value_to_centipawns};
use crate::types::{Depth, Score, Value};

/// Outcome of a single search call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchResult {
    /// `None` only when the position has no legal move.
    pub best_move: Option<Move>,
    pub pv_line: Vec<Move>,
    /// Evaluation in `[-1, 1]` from the side to move.
    pub value: Value,
    /// Evaluation in centipawns, clamped to `[-1000, 1000]`.
    pub centipawns: Score,
    /// Full moves to mate; negative when the side to move gets mated.
    pub mate_in: Option<i32>,
    /// Nodes visited (alpha-beta) or simulations run (MCTS).
    pub n_nodes: u64,
    /// Deepest completed iteration (alpha-beta) or PV length (MCTS).
    pub depth: Depth,
    /// Deepest ply reached with quiescence included (alpha-beta only).
    pub sel_depth: usize,
    pub n_root_moves: usize,
    pub elapsed: Duration,
}

impl SearchResult {
    /// Result for a position where the game is already over.
    pub fn terminal(terminal: Terminal, elapsed: Duration) -> SearchResult {
        let value = terminal.value();
        SearchResult {
            value,
            centipawns: value_to_centipawns(value),
            mate_in: (terminal == Terminal::Checkmate).then_some(0),
            elapsed,
            ..Default::default()
        }
    }

    /// Fills the value fields from an alpha-beta score.
    ///
    /// Mate scores saturate the value at +/-1.
    pub fn with_score(mut self, score: Score) -> SearchResult {
        self.mate_in = mate_distance(score);
        self.value = match self.mate_in {
            Some(n) if n > 0 => 1.0,
            Some(_) => -1.0,
            None => centipawns_to_value(score),
        };
        self.centipawns = value_to_centipawns(self.value);
        self
    }

    /// Fills the value fields from an MCTS value.
    pub fn with_value(mut self, value: Value) -> SearchResult {
        self.value = value.clamp(-1.0, 1.0);
        self.centipawns = value_to_centipawns(self.value);
        self
    }

    /// Principal variation as UCI tokens.
    pub fn pv_uci(&self) -> Vec<String> {
        self.pv_line.iter().map(Board::uci).collect()
    }
}

/// Converts a mate score into full moves, positive when the side to move mates.
pub fn mate_distance(score: Score) -> Option<i32> {
    if score >= SCORE_MATE_IN_MAX_PLY {
        let plies = SCORE_MATE - score;
        Some((plies + 1) / 2)
    } else if score <= -SCORE_MATE_IN_MAX_PLY {
        let plies = SCORE_MATE + score;
        Some(-(plies / 2))
    } else {
        None
    }
}
