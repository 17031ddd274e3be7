//! Iterative-deepening negamax with alpha-beta pruning.
//!
//! # References:
//! - https://www.chessprogramming.org/Negamax
//! - https://www.chessprogramming.org/Quiescence_Search

use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::board::{Board, Move, Terminal};
use crate::constants::{MAX_PLY, MAX_PV_LEN, SCORE_DRAW, SCORE_INF, SCORE_MATE, SCORE_MATE_IN_MAX_PLY};
use crate::eval::material;
use crate::move_list::MoveList;
use crate::search::options::AlphaBetaOptions;
use crate::search::root_move::RootMove;
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::search::{SearchLimits, Searcher};
use crate::transposition_table::{Bound, TranspositionTable, score_from_tt, score_to_tt};
use crate::types::{Depth, Score};

/// Alpha-beta searcher owning its transposition table.
pub struct AlphaBetaSearch {
    options: AlphaBetaOptions,
    tt: TranspositionTable,
}

impl AlphaBetaSearch {
    pub fn new(options: &AlphaBetaOptions) -> Self {
        AlphaBetaSearch {
            options: options.clone(),
            tt: TranspositionTable::new(options.tt_mb_size),
        }
    }

    pub fn options(&self) -> &AlphaBetaOptions {
        &self.options
    }

    /// Clears the transposition table.
    pub fn init(&mut self) {
        self.tt.clear();
    }

    /// Runs a search on `board` within `limits`.
    ///
    /// # Returns
    ///
    /// The result of the deepest fully completed iteration. When no iteration
    /// completes, the best root move scored before the abort is used, and
    /// failing that a one-ply static choice.
    pub fn search(&mut self, board: &Board, limits: &SearchLimits) -> SearchResult {
        let start = Instant::now();
        let mut board = board.clone();

        let moves = board.legal_moves();
        if let Some(terminal) = board.terminal_with(&moves) {
            debug!(?terminal, "search called on a finished game");
            return SearchResult::terminal(terminal, start.elapsed());
        }

        if !self.options.keep_tt {
            self.tt.clear();
        }
        self.tt.increment_generation();

        let max_depth = limits
            .depth
            .unwrap_or(self.options.max_depth)
            .clamp(1, MAX_PLY as Depth);
        let mut ctx = SearchContext::new(limits.time, limits.nodes)
            .with_quiescence_depth(self.options.quiescence_depth);
        ctx.root_moves = moves.iter().cloned().map(RootMove::new).collect();

        let mut completed: Option<(Move, Score, Depth)> = None;
        for depth in 1..=max_depth {
            ctx.reset_root_moves();
            let (score, best_move) = search_root(&mut ctx, &mut self.tt, &mut board, depth);

            if ctx.is_search_aborted() {
                if completed.is_none()
                    && let Some(rm) = ctx.best_root_move()
                {
                    debug!(depth, "using partially searched first iteration");
                    completed = Some((rm.mv.clone(), rm.score, depth));
                }
                break;
            }

            let Some(mv) = best_move else {
                break;
            };
            debug!(
                depth,
                score,
                nodes = ctx.n_nodes,
                sel_depth = ctx.sel_depth,
                best_move = %Board::uci(&mv),
                elapsed_ms = ctx.elapsed().as_millis() as u64,
                "iteration complete"
            );
            completed = Some((mv, score, depth));

            // A forced mate either way will not change with more depth
            if score.abs() >= SCORE_MATE_IN_MAX_PLY {
                break;
            }
        }

        #[cfg(feature = "search-stats")]
        debug!(stats = ?ctx.stats, "search statistics");

        let result = match completed {
            Some((mv, score, depth)) => {
                let pv_line = extract_pv(&self.tt, &board, &mv, depth as usize);
                SearchResult {
                    best_move: Some(mv),
                    pv_line,
                    depth,
                    ..Default::default()
                }
                .with_score(score)
            }
            None => {
                warn!("search aborted before any root move was scored, using static choice");
                match quick_move(&mut board) {
                    Some((mv, score)) => SearchResult {
                        pv_line: vec![mv.clone()],
                        best_move: Some(mv),
                        ..Default::default()
                    }
                    .with_score(score),
                    None => SearchResult::default(),
                }
            }
        };

        SearchResult {
            n_nodes: ctx.n_nodes,
            sel_depth: ctx.sel_depth,
            n_root_moves: moves.len(),
            elapsed: start.elapsed(),
            ..result
        }
    }
}

impl Searcher for AlphaBetaSearch {
    fn analyse(&mut self, board: &Board, limits: &SearchLimits) -> SearchResult {
        self.search(board, limits)
    }
}

/// Searches every root move and returns the best score and move.
///
/// Only moves that raise alpha have an exact score; the rest are upper
/// bounds and are not recorded as searched root moves. On abort the best
/// fully searched move so far is returned.
fn search_root(
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    board: &mut Board,
    depth: Depth,
) -> (Score, Option<Move>) {
    let mut alpha = -SCORE_INF;
    let beta = SCORE_INF;
    let key = board.key();
    let tt_move = tt.best_move(key);

    let mut move_list = MoveList::new(board);
    move_list.evaluate_moves(ctx, 0, tt_move.as_ref());
    move_list.sort();

    let mut best_score = -SCORE_INF;
    let mut best_move = None;
    for sm in &move_list {
        let score = {
            let mut child = board.push(&sm.mv);
            -negamax(ctx, tt, &mut child, depth - 1, 1, -beta, -alpha)
        };

        if ctx.is_search_aborted() {
            return (best_score, best_move);
        }

        if score > alpha {
            ctx.update_root_move(&sm.mv, score);
            best_score = score;
            best_move = Some(sm.mv.clone());
            alpha = score;
        }
    }

    let (_, idx) = tt.probe(key);
    tt.store(idx, key, score_to_tt(best_score, 0), Bound::Exact, depth, best_move.clone());
    (best_score, best_move)
}

/// Fail-soft negamax.
///
/// # Arguments
///
/// * `depth` - Remaining depth in plies
/// * `ply` - Distance from the root
fn negamax(
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    board: &mut Board,
    depth: Depth,
    ply: usize,
    mut alpha: Score,
    mut beta: Score,
) -> Score {
    ctx.increment_nodes();
    ctx.sel_depth = ctx.sel_depth.max(ply);

    if ctx.check_abort() {
        return material(board);
    }

    let moves = board.legal_moves();
    if let Some(terminal) = board.terminal_with(&moves) {
        return terminal_score(terminal, ply);
    }

    if depth == 0 {
        let qdepth = ctx.quiescence_depth;
        return quiescence(ctx, board, ply, alpha, beta, qdepth);
    }

    if ply >= MAX_PLY {
        return material(board);
    }

    let alpha_orig = alpha;
    let key = board.key();
    let tt_data = tt.probe(key).0.cloned();
    let mut tt_move = None;
    if let Some(data) = tt_data {
        #[cfg(feature = "search-stats")]
        {
            ctx.stats.tt_hits += 1;
        }
        tt_move = data.best_move;
        if data.depth >= depth {
            let tt_score = score_from_tt(data.score, ply);
            match data.bound {
                Bound::Exact => return tt_score,
                Bound::Lower => alpha = alpha.max(tt_score),
                Bound::Upper => beta = beta.min(tt_score),
                Bound::None => {}
            }
            if alpha >= beta {
                #[cfg(feature = "search-stats")]
                {
                    ctx.stats.tt_cutoffs += 1;
                }
                trace!(ply, depth, score = tt_score, "tt cutoff");
                return tt_score;
            }
        }
    }

    let mut move_list = MoveList::from_moves(&moves);
    move_list.evaluate_moves(ctx, ply, tt_move.as_ref());
    move_list.sort();

    let mut best_score = -SCORE_INF;
    let mut best_move = None;
    for sm in &move_list {
        let score = {
            let mut child = board.push(&sm.mv);
            -negamax(ctx, tt, &mut child, depth - 1, ply + 1, -beta, -alpha)
        };

        if ctx.is_search_aborted() {
            return best_score.max(score);
        }

        if score > best_score {
            best_score = score;
            best_move = Some(sm.mv.clone());
        }
        if score > alpha {
            alpha = score;
        }
        if alpha >= beta {
            #[cfg(feature = "search-stats")]
            {
                ctx.stats.beta_cutoffs += 1;
            }
            if !sm.mv.is_capture() {
                ctx.store_killer(ply, &sm.mv);
                ctx.update_history(&sm.mv, depth);
            }
            break;
        }
    }

    let (_, idx) = tt.probe(key);
    tt.store(
        idx,
        key,
        score_to_tt(best_score, ply),
        Bound::classify(best_score, alpha_orig, beta),
        depth,
        best_move,
    );
    best_score
}

/// Fail-hard capture search with stand-pat.
fn quiescence(
    ctx: &mut SearchContext,
    board: &mut Board,
    ply: usize,
    mut alpha: Score,
    beta: Score,
    qdepth: Depth,
) -> Score {
    ctx.increment_nodes();
    ctx.sel_depth = ctx.sel_depth.max(ply);
    #[cfg(feature = "search-stats")]
    {
        ctx.stats.quiescence_nodes += 1;
    }

    let stand_pat = material(board);
    if ctx.check_abort() {
        return stand_pat;
    }
    if stand_pat >= beta {
        return beta;
    }
    alpha = alpha.max(stand_pat);

    if qdepth == 0 || ply >= MAX_PLY {
        return alpha;
    }

    let mut move_list = MoveList::captures(board);
    move_list.evaluate_captures();
    move_list.sort();

    for sm in &move_list {
        let score = {
            let mut child = board.push(&sm.mv);
            -quiescence(ctx, &mut child, ply + 1, -beta, -alpha, qdepth - 1)
        };

        if ctx.is_search_aborted() {
            return alpha;
        }
        if score >= beta {
            return beta;
        }
        alpha = alpha.max(score);
    }

    alpha
}

/// Score of a finished game at `ply`; nearer mates score higher.
#[inline]
fn terminal_score(terminal: Terminal, ply: usize) -> Score {
    match terminal {
        Terminal::Checkmate => -(SCORE_MATE - ply as Score),
        Terminal::Stalemate | Terminal::InsufficientMaterial => SCORE_DRAW,
    }
}

/// Picks the move with the best static evaluation one ply ahead.
///
/// Used when a search is cut off before it scored any root move.
pub fn quick_move(board: &mut Board) -> Option<(Move, Score)> {
    let moves = board.legal_moves();
    let mut best: Option<(Move, Score)> = None;
    for mv in &moves {
        let child = board.push(mv);
        let score = match child.terminal() {
            Some(terminal) => -terminal_score(terminal, 1),
            None => -material(&child),
        };
        if best.as_ref().is_none_or(|(_, s)| score > *s) {
            best = Some((mv.clone(), score));
        }
    }
    best
}

/// Follows best moves stored in the transposition table from the root.
///
/// Stops on a missing or illegal entry, a repeated position, or after
/// `max_len` moves.
fn extract_pv(tt: &TranspositionTable, board: &Board, first: &Move, max_len: usize) -> Vec<Move> {
    let max_len = max_len.clamp(1, MAX_PV_LEN);
    let mut board = board.clone();
    let mut seen = vec![board.key()];
    let mut pv = vec![first.clone()];
    board.push_move(first);

    while pv.len() < max_len {
        let key = board.key();
        if seen.contains(&key) {
            break;
        }
        seen.push(key);

        let Some(mv) = tt.best_move(key) else {
            break;
        };
        if !board.legal_moves().contains(&mv) {
            break;
        }
        board.push_move(&mv);
        pv.push(mv);
    }
    pv
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn searcher() -> AlphaBetaSearch {
        AlphaBetaSearch::new(&AlphaBetaOptions::new(1))
    }

    fn analyse(fen: &str, depth: Depth) -> SearchResult {
        let board = Board::from_fen(fen).unwrap();
        searcher().search(&board, &SearchLimits::infinite().with_depth(depth))
    }

    /// Full-window value of every root move, each searched from scratch.
    fn exact_root_values(board: &Board, depth: Depth, qdepth: Depth) -> Vec<(Move, Score)> {
        let mut board = board.clone();
        let mut tt = TranspositionTable::new(1);
        board
            .legal_moves()
            .iter()
            .map(|mv| {
                tt.clear();
                let mut ctx = SearchContext::new(None, None).with_quiescence_depth(qdepth);
                let mut child = board.push(mv);
                let score = -negamax(&mut ctx, &mut tt, &mut child, depth - 1, 1, -SCORE_INF, SCORE_INF);
                (mv.clone(), score)
            })
            .collect()
    }

    #[test]
    fn test_chosen_move_has_root_maximum() {
        use rand::SeedableRng;
        use rand::seq::IndexedRandom;
        use rand_chacha::ChaCha8Rng;

        let options = AlphaBetaOptions::new(1);
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        for game in 0..8 {
            let mut board = Board::new();
            for _ in 0..(6 + 2 * game) {
                let moves = board.legal_moves();
                let Some(mv) = moves.choose(&mut rng) else {
                    break;
                };
                board.push_move(mv);
                if board.is_game_over() {
                    break;
                }
            }
            if board.is_game_over() {
                continue;
            }

            for depth in 1..=3 {
                let result = searcher().search(&board, &SearchLimits::infinite().with_depth(depth));
                let chosen = result.best_move.clone().unwrap();
                let values = exact_root_values(&board, result.depth, options.quiescence_depth);
                let best = values.iter().map(|(_, s)| *s).max().unwrap();
                let chosen_value = values.iter().find(|(mv, _)| *mv == chosen).unwrap().1;
                assert_eq!(
                    chosen_value,
                    best,
                    "fen={} depth={depth} chosen={}",
                    board.fen(),
                    Board::uci(&chosen)
                );
                assert_eq!(result.centipawns, SearchResult::default().with_score(best).centipawns);
            }
        }
    }

    #[test]
    fn test_partial_iteration_records_only_exact_moves() {
        // Queen hangs on d5; every other move scores at most alpha once d2d5 is known
        let mut board = Board::from_fen("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1").unwrap();
        let mut ctx = SearchContext::new(None, None);
        ctx.root_moves = board.legal_moves().iter().cloned().map(RootMove::new).collect();
        let mut tt = TranspositionTable::new(1);
        let (score, best) = search_root(&mut ctx, &mut tt, &mut board, 2);

        let best = best.unwrap();
        assert_eq!(Board::uci(&best), "d2d5");
        let recorded = ctx.best_root_move().unwrap();
        assert_eq!(recorded.mv, best);
        assert_eq!(recorded.score, score);
        for rm in ctx.root_moves.iter().filter(|rm| rm.searched) {
            assert!(rm.score <= score);
        }
    }

    #[test]
    fn test_reports_selective_depth() {
        let result = analyse("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3", 2);
        assert!(result.sel_depth >= 2);
    }

    #[test]
    fn test_start_position_depth_two() {
        let result = analyse(crate::board::START_FEN, 2);
        assert_eq!(result.n_root_moves, 20);
        assert_eq!(result.depth, 2);
        assert!(result.best_move.is_some());
        assert!(result.n_nodes > 20);
        assert!(result.value.abs() <= 1.0);
    }

    #[test]
    fn test_finds_back_rank_mate() {
        let result = analyse("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", 3);
        let mv = result.best_move.unwrap();
        assert_eq!(Board::uci(&mv), "a1a8");
        assert_eq!(result.mate_in, Some(1));
        assert_eq!(result.value, 1.0);
    }

    #[test]
    fn test_takes_hanging_queen() {
        let result = analyse("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1", 2);
        assert_eq!(Board::uci(&result.best_move.unwrap()), "d2d5");
        assert!(result.centipawns > 0);
    }

    #[test]
    fn test_terminal_root() {
        let result = analyse("8/8/8/8/8/8/8/4K2k w - - 0 1", 3);
        assert!(result.best_move.is_none());
        assert_eq!(result.n_root_moves, 0);
        assert_eq!(result.value, 0.0);

        let mated =
            analyse("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3", 3);
        assert!(mated.best_move.is_none());
        assert_eq!(mated.value, -1.0);
    }

    #[test]
    fn test_zero_budget_still_returns_legal_move() {
        let board = Board::new();
        let mut search = searcher();
        let result = search.search(&board, &SearchLimits::default().with_time(Duration::ZERO));
        let mv = result.best_move.unwrap();
        assert!(board.legal_moves().contains(&mv));
    }

    #[test]
    fn test_deterministic_with_fresh_table() {
        let board = Board::new();
        let limits = SearchLimits::infinite().with_depth(3);
        let mut search = searcher();
        let a = search.search(&board, &limits);
        let b = search.search(&board, &limits);
        assert_eq!(a.best_move, b.best_move);
        assert_eq!(a.n_nodes, b.n_nodes);
        assert_eq!(a.pv_line, b.pv_line);
    }

    #[test]
    fn test_pv_is_legal_sequence() {
        let board = Board::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3")
            .unwrap();
        let result = searcher().search(&board, &SearchLimits::infinite().with_depth(3));
        assert!(!result.pv_line.is_empty());
        assert_eq!(result.pv_line.first(), result.best_move.as_ref());
        let mut replay = board.clone();
        for mv in &result.pv_line {
            assert!(replay.legal_moves().contains(mv));
            replay.push_move(mv);
        }
    }

    #[test]
    fn test_quick_move_prefers_capture() {
        let mut board = Board::from_fen("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1").unwrap();
        let (mv, score) = quick_move(&mut board).unwrap();
        assert_eq!(Board::uci(&mv), "d2d5");
        assert_eq!(score, 500);
        assert_eq!(board.ply(), 0);
    }

    #[test]
    fn test_terminal_score_prefers_short_mates() {
        assert!(-terminal_score(Terminal::Checkmate, 1) > -terminal_score(Terminal::Checkmate, 3));
        assert_eq!(terminal_score(Terminal::Stalemate, 4), SCORE_DRAW);
    }
}
