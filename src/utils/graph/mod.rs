//! Generic directed graph infrastructure.
//!
//! This module provides the graph container shared by the control-flow graph
//! ([`crate::analysis::ControlFlowGraph`]) and the call graph
//! ([`crate::analysis::CallGraph`]), together with traversal algorithms written
//! against small adjacency traits.
//!
//! # Architecture
//!
//! - [`DirectedGraph`] - Named nodes, typed edges, removal, reachability and condensation
//! - [`NodeId`] / [`EdgeId`] - Stable slot identifiers
//! - [`GraphBase`], [`Successors`], [`Predecessors`] - Traits the algorithms consume
//! - [`algorithms`] - Iterative BFS, DFS and post-order traversals
//!
//! # Examples
//!
//! ```rust,ignore
//! use stagecraft::utils::graph::{algorithms, DirectedGraph};
//!
//! let mut graph: DirectedGraph<u32, ()> = DirectedGraph::new();
//! let a = graph.add_node("a", 0);
//! let b = graph.add_node("b", 1);
//! graph.add_edge(a, b, ())?;
//!
//! let order: Vec<_> = algorithms::bfs(&graph, a).collect();
//! assert_eq!(order, vec![a, b]);
//! ```

mod directed;
mod ids;
mod traits;

pub mod algorithms;

pub use directed::DirectedGraph;
pub use ids::{EdgeId, NodeId};
pub use traits::{GraphBase, Predecessors, Successors};
