//! Utility modules shared across the crate.

mod dot;
pub mod graph;

pub use dot::escape_dot;
