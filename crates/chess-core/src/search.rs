pub mod alphabeta;
pub mod mcts;
pub mod options;
pub mod root_move;
pub mod search_context;
pub mod search_result;
pub mod time_control;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::board::{Board, Move};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::move_index::MoveIndex;
use crate::types::Depth;

use self::alphabeta::AlphaBetaSearch;
use self::mcts::{LeafEvaluator, MctsSearch};
use self::search_result::SearchResult;
use self::time_control::TimeManager;

/// Budget of a single search call. Every limit is optional; the search stops
/// at whichever is reached first.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SearchLimits {
    pub time: Option<Duration>,
    /// Iteration cap of the alpha-beta searcher.
    pub depth: Option<Depth>,
    /// Node cap (alpha-beta) or simulation cap (MCTS).
    pub nodes: Option<u64>,
}

impl SearchLimits {
    /// Limits with a wall-clock budget in seconds. Negative or non-finite
    /// values give a zero budget.
    pub fn new(time_limit_secs: f64) -> Self {
        SearchLimits {
            time: Some(Duration::try_from_secs_f64(time_limit_secs).unwrap_or(Duration::ZERO)),
            ..Default::default()
        }
    }

    /// No limit at all. The searchers fall back to their own caps.
    pub fn infinite() -> Self {
        SearchLimits::default()
    }

    /// Limits derived from a time manager's budget for the next move.
    pub fn from_time_manager(tm: &TimeManager) -> Self {
        SearchLimits {
            time: tm.budget(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_time(mut self, time: Duration) -> Self {
        self.time = Some(time);
        self
    }

    #[must_use]
    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = Some(depth);
        self
    }

    #[must_use]
    pub fn with_nodes(mut self, nodes: u64) -> Self {
        self.nodes = Some(nodes);
        self
    }
}

/// Common surface of both searchers.
///
/// A search never fails: it returns a legal move whenever the position has
/// one, degrading to weaker choices when the budget runs out.
pub trait Searcher {
    fn analyse(&mut self, board: &Board, limits: &SearchLimits) -> SearchResult;

    fn best_move(&mut self, board: &Board, limits: &SearchLimits) -> Option<Move> {
        self.analyse(board, limits).best_move
    }
}

/// Search algorithm selected by configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    AlphaBeta,
    Mcts,
}

/// A configured searcher of either kind.
pub enum Engine {
    AlphaBeta(AlphaBetaSearch),
    Mcts(MctsSearch),
}

impl Engine {
    /// Builds the searcher named by `config.engine.kind`.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration
    /// * `index` - Move index shared with the oracle, used by MCTS only
    /// * `evaluator` - Leaf evaluator, used by MCTS only
    pub fn from_config(
        config: &EngineConfig,
        index: Arc<MoveIndex>,
        evaluator: LeafEvaluator,
    ) -> Result<Engine> {
        config.validate()?;
        let engine = match config.engine.kind {
            EngineKind::AlphaBeta => Engine::AlphaBeta(AlphaBetaSearch::new(&config.alphabeta)),
            EngineKind::Mcts => Engine::Mcts(MctsSearch::new(&config.mcts, index, evaluator)?),
        };
        info!(kind = ?engine.kind(), "engine ready");
        Ok(engine)
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Engine::AlphaBeta(_) => EngineKind::AlphaBeta,
            Engine::Mcts(_) => EngineKind::Mcts,
        }
    }
}

impl Searcher for Engine {
    fn analyse(&mut self, board: &Board, limits: &SearchLimits) -> SearchResult {
        match self {
            Engine::AlphaBeta(search) => search.analyse(board, limits),
            Engine::Mcts(search) => search.analyse(board, limits),
        }
    }
}

/// Uniformly random legal move, for callers that need a move no matter what.
pub fn random_fallback_move(board: &Board, rng: &mut impl Rng) -> Option<Move> {
    board.legal_moves().choose(rng).cloned()
}
