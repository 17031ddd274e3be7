use crate::board::Board;

/// Counts the leaf nodes of the legal move tree to a fixed depth.
///
/// # Arguments
///
/// * `board` - The position to expand. Restored before returning.
/// * `depth` - Number of plies to expand.
///
/// # Returns
///
/// The number of positions reached at exactly `depth` plies.
pub fn perft(board: &mut Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = board.legal_moves();
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0;
    for mv in &moves {
        let mut child = board.push(mv);
        nodes += perft(&mut child, depth - 1);
    }
    nodes
}

/// Perft from the standard starting position.
pub fn perft_root(depth: u32) -> u64 {
    perft(&mut Board::new(), depth)
}
