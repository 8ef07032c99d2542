//! Graph traversal algorithms.
//!
//! - [`bfs`] - Breadth-first search, yields nodes in visitation order
//! - [`dfs`] - Iterative depth-first search (pre-order)
//! - [`postorder`] - Depth-first post-order (descendants before the node)
//!
//! Per-node bookkeeping is sized by [`GraphBase::node_bound`], so traversals work on
//! graphs with removed nodes.

use std::collections::VecDeque;

use crate::utils::graph::{GraphBase, NodeId, Successors};

/// Breadth-first search iterator over graph nodes.
///
/// Visits each node reachable from the start exactly once, exploring all nodes
/// at distance d before any node at distance d+1. Successors are enqueued in
/// edge insertion order.
pub struct BfsIterator<'g, G: Successors> {
    graph: &'g G,
    queue: VecDeque<NodeId>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> BfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let bound = graph.node_bound();
        if start.index() >= bound {
            return BfsIterator {
                graph,
                queue: VecDeque::new(),
                visited: Vec::new(),
            };
        }

        let mut visited = vec![false; bound];
        visited[start.index()] = true;

        BfsIterator {
            graph,
            queue: VecDeque::from([start]),
            visited,
        }
    }
}

impl<G: Successors> Iterator for BfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;

        for succ in self.graph.successors(node) {
            if let Some(seen) = self.visited.get_mut(succ.index()) {
                if !*seen {
                    *seen = true;
                    self.queue.push_back(succ);
                }
            }
        }

        Some(node)
    }
}

/// Returns a breadth-first search iterator starting from `start`.
///
/// An out-of-range start yields nothing.
///
/// # Examples
///
/// ```rust,ignore
/// use stagecraft::utils::graph::{algorithms::bfs, DirectedGraph};
///
/// let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
/// let a = graph.add_node("a", ());
/// let b = graph.add_node("b", ());
/// let c = graph.add_node("c", ());
/// graph.add_edge(a, b, ())?;
/// graph.add_edge(a, c, ())?;
///
/// assert_eq!(bfs(&graph, a).collect::<Vec<_>>(), vec![a, b, c]);
/// ```
pub fn bfs<G: Successors>(graph: &G, start: NodeId) -> BfsIterator<'_, G> {
    BfsIterator::new(graph, start)
}

/// Depth-first search iterator over graph nodes, in pre-order.
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<NodeId>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> DfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let bound = graph.node_bound();
        if start.index() >= bound {
            return DfsIterator {
                graph,
                stack: Vec::new(),
                visited: Vec::new(),
            };
        }

        DfsIterator {
            graph,
            stack: vec![start],
            visited: vec![false; bound],
        }
    }
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.stack.pop()?;
            if self.visited[node.index()] {
                continue;
            }
            self.visited[node.index()] = true;

            // Reverse so the first successor is explored first
            let successors: Vec<NodeId> = self.graph.successors(node).collect();
            for succ in successors.into_iter().rev() {
                if succ.index() < self.visited.len() && !self.visited[succ.index()] {
                    self.stack.push(succ);
                }
            }

            return Some(node);
        }
    }
}

/// Returns a depth-first (pre-order) iterator starting from `start`.
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> DfsIterator<'_, G> {
    DfsIterator::new(graph, start)
}

/// Computes the post-order of nodes reachable from `start`.
///
/// A node appears after every node reachable through its first unvisited
/// successors. Cycles are cut at the first revisit.
#[must_use]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let bound = graph.node_bound();
    if start.index() >= bound {
        return Vec::new();
    }

    let mut visited = vec![false; bound];
    let mut result = Vec::new();
    let mut stack = vec![(start, State::Enter)];

    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;
                stack.push((node, State::Exit));

                let successors: Vec<NodeId> = graph.successors(node).collect();
                for succ in successors.into_iter().rev() {
                    if succ.index() < bound && !visited[succ.index()] {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }

    result
}
