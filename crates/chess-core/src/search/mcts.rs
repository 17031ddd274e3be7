//! PUCT Monte Carlo tree search.
//!
//! Each simulation descends from the root by PUCT, expands one leaf, scores it
//! with an oracle or a random rollout, and backs the value up the path with
//! alternating sign. Node statistics are stored from the perspective of the
//! side that played the move into the node.

pub mod arena;
pub mod node;

use std::sync::Arc;
use std::time::Instant;

use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::board::{Board, Move};
use crate::eval::evaluate_material;
use crate::move_index::MoveIndex;
use crate::oracle::Oracle;
use crate::sampling::{add_dirichlet_noise, apply_temperature, argmax, sample_index};
use crate::search::options::MctsOptions;
use crate::search::search_result::SearchResult;
use crate::search::time_control::should_stop;
use crate::search::{SearchLimits, Searcher};
use crate::types::{Depth, Value};

use self::arena::Arena;
use self::node::{Node, NodeId, ROOT};

/// Simulations run when neither a time nor a node limit is given.
pub const DEFAULT_SIMULATIONS: u64 = 800;

#[derive(Debug, Error)]
pub enum MctsError {
    #[error("invalid config: {msg}")]
    InvalidConfig { msg: &'static str },
}

/// How leaves are scored on expansion.
pub enum LeafEvaluator {
    /// Uniform priors and a random playout.
    Rollout,
    /// Priors and value from a predictor.
    Oracle(Box<dyn Oracle>),
}

impl std::fmt::Debug for LeafEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeafEvaluator::Rollout => f.write_str("Rollout"),
            LeafEvaluator::Oracle(_) => f.write_str("Oracle"),
        }
    }
}

pub struct MctsSearch {
    options: MctsOptions,
    index: Arc<MoveIndex>,
    evaluator: LeafEvaluator,
    rng: ChaCha8Rng,
    arena: Arena,
}

impl MctsSearch {
    /// Creates a searcher after validating `options`.
    pub fn new(
        options: &MctsOptions,
        index: Arc<MoveIndex>,
        evaluator: LeafEvaluator,
    ) -> Result<Self, MctsError> {
        options.validate()?;
        let rng = match options.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        Ok(MctsSearch {
            options: options.clone(),
            index,
            evaluator,
            rng,
            arena: Arena::new(),
        })
    }

    pub fn options(&self) -> &MctsOptions {
        &self.options
    }

    /// Tree of the last search. Rebuilt from scratch by every search.
    pub fn tree(&self) -> &Arena {
        &self.arena
    }

    /// Runs simulations from `board` until `limits` are reached.
    ///
    /// A node limit counts simulations. Depth limits do not apply.
    pub fn search(&mut self, board: &Board, limits: &SearchLimits) -> SearchResult {
        let start = Instant::now();
        self.arena = Arena::new();
        if let Some(seed) = self.options.seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }

        let mut board = board.clone();
        let root_moves = board.legal_moves();
        if let Some(terminal) = board.terminal_with(&root_moves) {
            debug!(?terminal, "search called on a finished game");
            self.arena.get_mut(ROOT).terminal = Some(terminal);
            return SearchResult::terminal(terminal, start.elapsed());
        }

        // The root's own evaluation is not backed up
        self.expand(ROOT, &mut board);
        if self.options.root_noise {
            self.add_root_noise();
        }

        let node_cap = match (limits.time, limits.nodes) {
            (None, None) => Some(DEFAULT_SIMULATIONS),
            (_, nodes) => nodes,
        };
        let mut n_simulations = 0u64;
        while !should_stop(start.elapsed(), n_simulations, limits.time, node_cap) {
            self.simulate(&mut board);
            n_simulations += 1;
        }

        let best_move = select_move(&self.arena, self.options.temperature, &mut self.rng);
        let pv_line = self.pv();
        let value = self
            .arena
            .most_visited_child(ROOT)
            .map_or(0.0, |id| self.arena.get(id).q());

        debug!(
            simulations = n_simulations,
            tree_size = self.arena.len(),
            value,
            best_move = ?best_move.as_ref().map(Board::uci),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "mcts search complete"
        );

        SearchResult {
            best_move,
            depth: pv_line.len() as Depth,
            pv_line,
            n_nodes: self.arena.root().visits as u64,
            n_root_moves: root_moves.len(),
            elapsed: start.elapsed(),
            ..Default::default()
        }
        .with_value(value)
    }

    /// One select, expand, evaluate and backup pass.
    fn simulate(&mut self, board: &mut Board) {
        let mut path = vec![ROOT];
        let mut node_id = ROOT;

        while !self.arena.get(node_id).is_leaf() {
            node_id = self.select_child(node_id);
            if let Some(mv) = &self.arena.get(node_id).mv {
                board.push_move(mv);
            }
            path.push(node_id);
        }

        let (terminal, is_expanded) = {
            let node = self.arena.get(node_id);
            (node.terminal, node.is_expanded)
        };
        let value = match terminal {
            Some(terminal) => terminal.value(),
            None if !is_expanded => self.expand(node_id, board),
            None => 0.0,
        };

        self.backup(&path, value);
        for _ in 1..path.len() {
            board.pop();
        }
    }

    /// Child of `node_id` with the highest PUCT score; the first one wins ties.
    fn select_child(&self, node_id: NodeId) -> NodeId {
        let parent = self.arena.get(node_id);
        // Floor at one visit so priors still rank children of a fresh parent
        let parent_sqrt = (parent.visits.max(1) as f32).sqrt();

        let mut best = parent.children[0];
        let mut best_score = f32::NEG_INFINITY;
        for &child in &parent.children {
            let score = self.arena.get(child).puct(self.options.c_puct, parent_sqrt);
            if score > best_score {
                best_score = score;
                best = child;
            }
        }
        best
    }

    /// Expands `node_id` and returns the leaf value from the side to move.
    fn expand(&mut self, node_id: NodeId, board: &mut Board) -> Value {
        let moves = board.legal_moves();
        if let Some(terminal) = board.terminal_with(&moves) {
            let node = self.arena.get_mut(node_id);
            node.terminal = Some(terminal);
            node.is_expanded = true;
            return terminal.value();
        }

        let (priors, value) = match &mut self.evaluator {
            LeafEvaluator::Rollout => (
                self.index.legal_priors(&[], board),
                rollout(board, &mut self.rng, self.options.rollout_max_moves),
            ),
            LeafEvaluator::Oracle(oracle) => {
                let size = self.index.action_space_size();
                match oracle
                    .predict(board, &self.index)
                    .and_then(|p| p.validate(size))
                {
                    Ok(p) => (self.index.legal_priors(&p.policy, board), p.value),
                    Err(e) => {
                        warn!(error = %e, fen = %board.fen(), "oracle failed, using uniform priors");
                        (self.index.legal_priors(&[], board), 0.0)
                    }
                }
            }
        };

        for (mv, prior) in priors {
            let child = self.arena.push(Node::child(mv, node_id, prior));
            self.arena.get_mut(node_id).children.push(child);
        }
        self.arena.get_mut(node_id).is_expanded = true;
        value
    }

    /// Adds `value`, seen from the leaf's side to move, along `path`.
    fn backup(&mut self, path: &[NodeId], value: Value) {
        let mut v = -value;
        for &id in path.iter().rev() {
            let node = self.arena.get_mut(id);
            node.visits += 1;
            node.value_sum += v;
            v = -v;
        }
    }

    fn add_root_noise(&mut self) {
        let children = self.arena.root().children.clone();
        let mut priors: Vec<f32> = children.iter().map(|&c| self.arena.get(c).prior).collect();
        add_dirichlet_noise(
            &mut priors,
            self.options.dirichlet_alpha,
            self.options.dirichlet_epsilon,
            &mut self.rng,
        );
        for (&child, prior) in children.iter().zip(priors) {
            self.arena.get_mut(child).prior = prior;
        }
    }

    /// Picks a root move from the last search's visit counts.
    ///
    /// Temperature zero takes the most visited child. Positive temperatures
    /// sample from `visits^(1/T)`. With no visits at all the first child is
    /// returned.
    pub fn select_move_with(&self, temperature: f32, rng: &mut impl Rng) -> Option<Move> {
        select_move(&self.arena, temperature, rng)
    }

    /// Most-visited line from the root.
    pub fn pv(&self) -> Vec<Move> {
        let mut pv = Vec::new();
        let mut node_id = ROOT;
        while pv.len() < self.options.pv_max_len {
            let Some(child) = self.arena.most_visited_child(node_id) else {
                break;
            };
            let node = self.arena.get(child);
            if node.visits == 0 {
                break;
            }
            let Some(mv) = &node.mv else {
                break;
            };
            pv.push(mv.clone());
            node_id = child;
        }
        pv
    }

    /// Root visit distribution over the action space.
    ///
    /// All zeros before any simulation has run.
    pub fn visit_policy(&self) -> Vec<f32> {
        let mut pi = vec![0.0; self.index.action_space_size()];
        let root = self.arena.root();
        let total: u32 = root.children.iter().map(|&c| self.arena.get(c).visits).sum();
        if total == 0 {
            return pi;
        }
        for &child in &root.children {
            let node = self.arena.get(child);
            if let Some(mv) = &node.mv {
                let id = self.index.to_id(mv);
                if id != MoveIndex::UNKNOWN {
                    pi[id] = node.visits as f32 / total as f32;
                }
            }
        }
        pi
    }
}

impl Searcher for MctsSearch {
    fn analyse(&mut self, board: &Board, limits: &SearchLimits) -> SearchResult {
        self.search(board, limits)
    }
}

fn select_move(arena: &Arena, temperature: f32, rng: &mut impl Rng) -> Option<Move> {
    let root = arena.root();
    if root.children.is_empty() {
        return None;
    }

    let visits: Vec<f32> = root
        .children
        .iter()
        .map(|&c| arena.get(c).visits as f32)
        .collect();
    let idx = if temperature <= 0.0 || visits.iter().all(|&v| v == 0.0) {
        argmax(&visits)
    } else {
        sample_index(&apply_temperature(&visits, temperature), rng).unwrap_or(0)
    };
    arena.get(root.children[idx]).mv.clone()
}

/// Plays uniformly random moves from `board` for at most `max_moves` plies.
///
/// # Returns
///
/// The outcome from the side to move at `board`: the game result when one is
/// reached, the material evaluation otherwise. `board` is restored.
pub fn rollout(board: &mut Board, rng: &mut impl Rng, max_moves: u32) -> Value {
    let mut plies = 0u32;
    let value = loop {
        let moves = board.legal_moves();
        if let Some(terminal) = board.terminal_with(&moves) {
            break terminal.value();
        }
        if plies >= max_moves {
            break evaluate_material(board).value;
        }
        let Some(mv) = moves.choose(rng) else {
            break 0.0;
        };
        board.push_move(mv);
        plies += 1;
    };

    for _ in 0..plies {
        board.pop();
    }
    trace!(plies, value, "rollout finished");
    if plies % 2 == 0 { value } else { -value }
}
