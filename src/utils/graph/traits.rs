//! Trait definitions for graph abstractions.
//!
//! Traversal algorithms in [`crate::utils::graph::algorithms`] are written against
//! these traits rather than a concrete graph type.
//!
//! - [`GraphBase`] - Live node count, the slot bound, and node iteration
//! - [`Successors`] - Forward edge traversal (outgoing edges)
//! - [`Predecessors`] - Backward edge traversal (incoming edges)

use crate::utils::graph::NodeId;

/// Core properties shared by every graph.
pub trait GraphBase {
    /// Returns the number of live nodes.
    fn node_count(&self) -> usize;

    /// Returns one past the largest node index ever handed out.
    ///
    /// Graphs that support removal leave holes in their index space; algorithms
    /// size their per-node bookkeeping by this bound instead of [`GraphBase::node_count`].
    fn node_bound(&self) -> usize {
        self.node_count()
    }

    /// Returns an iterator over all live node identifiers.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward adjacency.
pub trait Successors: GraphBase {
    /// Returns the targets of all outgoing edges of `node`, in insertion order.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward adjacency.
pub trait Predecessors: GraphBase {
    /// Returns the sources of all incoming edges of `node`, in insertion order.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}
