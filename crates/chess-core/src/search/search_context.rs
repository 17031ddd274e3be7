use std::time::{Duration, Instant};

use crate::board::Move;
use crate::constants::{DEFAULT_QUIESCENCE_DEPTH, MAX_PLY, SCORE_INF};
use crate::search::root_move::RootMove;
use crate::search::time_control::should_stop;
use crate::types::{Depth, Score};

/// Number of history slots, one per (from, to) square pair.
const HISTORY_SIZE: usize = 64 * 64;

/// Counters collected with the `search-stats` feature.
#[cfg(feature = "search-stats")]
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchStats {
    pub tt_hits: u64,
    pub tt_cutoffs: u64,
    pub beta_cutoffs: u64,
    pub quiescence_nodes: u64,
}

/// Mutable state of one alpha-beta search call.
pub struct SearchContext {
    pub n_nodes: u64,
    /// Deepest ply reached, quiescence included.
    pub sel_depth: usize,
    pub quiescence_depth: Depth,
    pub root_moves: Vec<RootMove>,
    killers: Vec<[Option<Move>; 2]>,
    history: Box<[Score]>,
    start_time: Instant,
    budget: Option<Duration>,
    node_cap: Option<u64>,
    aborted: bool,
    #[cfg(feature = "search-stats")]
    pub stats: SearchStats,
}

impl SearchContext {
    /// Creates a context whose clock starts now.
    ///
    /// # Arguments
    ///
    /// * `budget` - Wall-clock budget, `None` for unlimited
    /// * `node_cap` - Maximum nodes to visit, `None` for unlimited
    pub fn new(budget: Option<Duration>, node_cap: Option<u64>) -> SearchContext {
        SearchContext {
            n_nodes: 0,
            sel_depth: 0,
            quiescence_depth: DEFAULT_QUIESCENCE_DEPTH,
            root_moves: Vec::new(),
            killers: vec![[None, None]; MAX_PLY + 1],
            history: vec![0; HISTORY_SIZE].into_boxed_slice(),
            start_time: Instant::now(),
            budget,
            node_cap,
            aborted: false,
            #[cfg(feature = "search-stats")]
            stats: SearchStats::default(),
        }
    }

    #[must_use]
    pub fn with_quiescence_depth(mut self, depth: Depth) -> Self {
        self.quiescence_depth = depth;
        self
    }

    #[inline]
    pub fn increment_nodes(&mut self) {
        self.n_nodes += 1;
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Polls the budget and latches the abort flag once it is exhausted.
    ///
    /// Called once per node.
    #[inline]
    pub fn check_abort(&mut self) -> bool {
        if !self.aborted
            && should_stop(self.elapsed(), self.n_nodes, self.budget, self.node_cap)
        {
            self.aborted = true;
        }
        self.aborted
    }

    #[inline]
    pub fn is_search_aborted(&self) -> bool {
        self.aborted
    }

    #[inline]
    pub fn is_killer(&self, ply: usize, mv: &Move) -> bool {
        self.killers
            .get(ply)
            .is_some_and(|k| k.iter().any(|slot| slot.as_ref() == Some(mv)))
    }

    /// Records a quiet move that caused a beta cutoff at `ply`.
    pub fn store_killer(&mut self, ply: usize, mv: &Move) {
        let Some(slots) = self.killers.get_mut(ply) else {
            return;
        };
        if slots[0].as_ref() != Some(mv) {
            slots[1] = slots[0].take();
            slots[0] = Some(mv.clone());
        }
    }

    #[inline]
    pub fn history(&self, mv: &Move) -> Score {
        self.history[history_index(mv)]
    }

    /// Rewards a move that caused a beta cutoff at `depth`.
    pub fn update_history(&mut self, mv: &Move, depth: Depth) {
        let bonus = (depth * depth) as Score;
        let slot = &mut self.history[history_index(mv)];
        *slot = slot.saturating_add(bonus);
    }

    /// Records the exact score of a root move that raised alpha.
    pub fn update_root_move(&mut self, mv: &Move, score: Score) {
        if let Some(rm) = self.root_moves.iter_mut().find(|rm| rm.mv == *mv) {
            rm.score = score;
            rm.searched = true;
        }
    }

    /// Root move with the highest score among those searched this iteration.
    pub fn best_root_move(&self) -> Option<&RootMove> {
        let mut best: Option<&RootMove> = None;
        for rm in self.root_moves.iter().filter(|rm| rm.searched) {
            if best.is_none_or(|b| rm.score > b.score) {
                best = Some(rm);
            }
        }
        best
    }

    /// Prepares root moves for the next iteration.
    pub fn reset_root_moves(&mut self) {
        for rm in self.root_moves.iter_mut() {
            rm.score = -SCORE_INF;
            rm.searched = false;
        }
    }
}

#[inline]
fn history_index(mv: &Move) -> usize {
    let to = usize::from(mv.to());
    let from = mv.from().map_or(to, usize::from);
    from * 64 + to
}
