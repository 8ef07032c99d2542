//! Call graph between source functions and intrinsics.
//!
//! Every call instruction contributes an edge from the calling function to its
//! callee, tagged with [`CallFlags`]: [`CallFlags::RUNTIME`] for ordinary calls and
//! [`CallFlags::BUILD`] for calls that run during compilation. Repeated calls between
//! the same pair collapse into one edge carrying the union of their flags.
//!
//! # Architecture
//!
//! The graph sits on [`crate::utils::graph::DirectedGraph`] with one node per
//! function symbol. Traversals reuse the generic iterative algorithms, so deep call
//! chains never grow the host stack.
//!
//! # Components
//!
//! - [`CallGraph`]: the graph plus name lookup and traversals
//! - [`CallFlags`]: runtime/build tags on an edge
//!
//! # Example
//!
//! ```rust,ignore
//! use stagecraft::analysis::CallGraph;
//!
//! let graph = CallGraph::build(&program);
//!
//! // Callees before callers
//! for function in graph.post_order("main") {
//!     println!("{}", function.name);
//! }
//!
//! // Everything that still has to run at build time
//! let pending = graph.build_tainted("main");
//! ```

mod graph;

pub use graph::{CallFlags, CallGraph};
