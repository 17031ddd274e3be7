use crate::board::Move;
use crate::constants::SCORE_INF;
use crate::types::Score;

/// Represents a root move with its search results.
#[derive(Clone, Debug)]
pub struct RootMove {
    pub mv: Move,
    /// Score of this move in the current iteration
    pub score: Score,
    /// Whether the move has been searched in the current iteration
    pub searched: bool,
}

impl RootMove {
    /// Creates a new RootMove for the given move.
    pub fn new(mv: Move) -> Self {
        Self {
            mv,
            score: -SCORE_INF,
            searched: false,
        }
    }
}
