//! The optimizer passes.
//!
//! Each pass rewrites one function at a time and records every rewrite in the
//! [`crate::compiler::EventLog`]. The [`crate::compiler::PassScheduler`] runs them
//! in this order:
//!
//! 1. [`PropagationPass`] - operands take the values assigned earlier in the block
//! 2. [`ConstantFoldingPass`] - operations over literals are evaluated
//! 3. [`DeadBlockEliminationPass`] - constant branches resolve, unreachable blocks go
//! 4. [`DeadCodeEliminationPass`] - writes nobody reads are removed

mod deadblock;
mod deadcode;
mod folding;
mod propagation;

pub use deadblock::DeadBlockEliminationPass;
pub use deadcode::DeadCodeEliminationPass;
pub use folding::ConstantFoldingPass;
pub use propagation::PropagationPass;
