//! Control flow graphs.
//!
//! [`ControlFlowGraph::build`] partitions a function's [`crate::ir::TacList`] into
//! [`BasicBlock`]s on top of the generic [`crate::utils::graph::DirectedGraph`].
//! Dead-block elimination condenses the graph, walks it from the function start and
//! re-emits the reachable blocks in stream order.

mod block;
mod graph;

pub use block::BasicBlock;
pub use graph::ControlFlowGraph;
