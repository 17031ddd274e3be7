use rand::SeedableRng;
use rand::seq::IndexedRandom;
use rand_chacha::ChaCha8Rng;

use chess_core::{Board, IndexKind, MoveIndex};

fn check_position(index: &MoveIndex, board: &Board) {
    let moves = board.legal_moves();
    let mask = index.legal_mask(board);
    assert_eq!(mask.count_ones(), moves.len(), "{}", board.fen());
    for mv in &moves {
        let id = index.to_id(mv);
        assert_ne!(id, MoveIndex::UNKNOWN, "{}", Board::uci(mv));
        assert!(mask.contains(id));
        assert_eq!(index.from_id(id, board).as_ref(), Some(mv), "{}", board.fen());
    }
}

#[test]
fn test_bijection_over_random_games() {
    for kind in [IndexKind::Full, IndexKind::Compact] {
        let index = MoveIndex::with_kind(kind);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..8 {
            let mut board = Board::new();
            for _ in 0..80 {
                check_position(&index, &board);
                let moves = board.legal_moves();
                let Some(mv) = moves.choose(&mut rng) else {
                    break;
                };
                board.push_move(mv);
                if board.is_game_over() {
                    break;
                }
            }
        }
    }
}

#[test]
fn test_special_moves() {
    let index = MoveIndex::new();
    // Castling both ways, promotions with and without capture, en passant
    for fen in [
        "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
        "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1",
        "1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1",
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
    ] {
        check_position(&index, &Board::from_fen(fen).unwrap());
    }
}

#[test]
fn test_out_of_range_ids() {
    let index = MoveIndex::compact();
    let board = Board::new();
    assert!(index.from_id(index.action_space_size(), &board).is_none());
    assert!(index.from_id(usize::MAX, &board).is_none());
}
