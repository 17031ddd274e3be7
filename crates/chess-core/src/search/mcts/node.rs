//! Tree node statistics for PUCT.

use crate::board::{Move, Terminal};
use crate::types::Value;

pub type NodeId = u32;

/// Root of every tree.
pub const ROOT: NodeId = 0;

#[derive(Clone, Debug)]
pub struct Node {
    /// Move leading here from the parent; `None` at the root.
    pub mv: Option<Move>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub visits: u32,
    /// Sum of backed-up values, from the perspective of the side that played `mv`.
    pub value_sum: f32,
    pub prior: f32,
    pub is_expanded: bool,
    /// Set on expansion when the position has no further play.
    pub terminal: Option<Terminal>,
}

impl Node {
    pub fn root() -> Self {
        Node {
            mv: None,
            parent: None,
            children: Vec::new(),
            visits: 0,
            value_sum: 0.0,
            prior: 1.0,
            is_expanded: false,
            terminal: None,
        }
    }

    pub fn child(mv: Move, parent: NodeId, prior: f32) -> Self {
        Node {
            mv: Some(mv),
            parent: Some(parent),
            prior,
            ..Node::root()
        }
    }

    /// Mean value; zero while unvisited.
    pub fn q(&self) -> Value {
        if self.visits == 0 {
            0.0
        } else {
            self.value_sum / self.visits as f32
        }
    }

    /// PUCT score of this node as a child of a parent with `parent_sqrt`
    /// = sqrt(parent visits).
    #[inline]
    pub fn puct(&self, c_puct: f32, parent_sqrt: f32) -> f32 {
        self.q() + c_puct * self.prior * parent_sqrt / (1.0 + self.visits as f32)
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        !self.is_expanded || self.children.is_empty()
    }
}
