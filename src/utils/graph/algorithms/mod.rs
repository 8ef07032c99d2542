//! Graph algorithms over the adjacency traits.
//!
//! All traversals are iterative (explicit queue or stack), so deep graphs do not
//! consume call stack.

mod traversal;

pub use traversal::{bfs, dfs, postorder, BfsIterator, DfsIterator};
