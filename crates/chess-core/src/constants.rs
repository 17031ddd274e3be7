use crate::types::{Depth, Score};

/// Score of a mate delivered at the root. Mates further away score lower.
pub const SCORE_MATE: Score = 30_000;

/// Window bound strictly above every reachable score.
pub const SCORE_INF: Score = 32_000;

/// Scores beyond this magnitude encode a forced mate.
pub const SCORE_MATE_IN_MAX_PLY: Score = SCORE_MATE - MAX_PLY as Score;

pub const SCORE_DRAW: Score = 0;

/// Centipawn magnitude that maps to a value of 1.0.
pub const CENTIPAWN_SCALE: Score = 1000;

/// Maximum ply reachable from the root in one search.
pub const MAX_PLY: usize = 128;

/// Upper bound on legal moves in any chess position.
pub const MAX_MOVES: usize = 256;

/// Maximum length of a reported principal variation.
pub const MAX_PV_LEN: usize = 32;

pub const DEFAULT_MAX_DEPTH: Depth = 10;

pub const DEFAULT_QUIESCENCE_DEPTH: Depth = 3;
