//! Arena-backed node storage.

use crate::search::mcts::node::{Node, NodeId, ROOT};

pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    /// Creates an arena holding only an unexpanded root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::root()],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, n: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(n);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    pub fn root(&self) -> &Node {
        self.get(ROOT)
    }

    /// Child of `id` with the most visits; the first one wins ties.
    pub fn most_visited_child(&self, id: NodeId) -> Option<NodeId> {
        let mut best: Option<(NodeId, u32)> = None;
        for &child in &self.get(id).children {
            let visits = self.get(child).visits;
            if best.is_none_or(|(_, v)| visits > v) {
                best = Some((child, visits));
            }
        }
        best.map(|(child, _)| child)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}
