//! Common type aliases used throughout the engine.

/// Search depth in plies.
pub type Depth = u32;

/// Integer score in centipawns from the side to move.
pub type Score = i32;

/// Floating-point value in `[-1, 1]` from the side to move.
pub type Value = f32;

/// Dense integer identity of a move shape, see [`crate::move_index::MoveIndex`].
pub type ActionId = usize;
