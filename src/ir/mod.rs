//! Three-address code.
//!
//! Instructions ([`Tac`]) name their operands as [`crate::symbols::DataSymbol`]s and
//! live in a [`TacList`], which hands out stable [`TacId`] handles so that analyses
//! can point at instructions while passes rewrite the stream around them.

pub mod eval;
mod list;
mod tac;

pub use list::{Iter, TacId, TacList};
pub use tac::{BinaryOp, MarkOp, Tac, UnaryOp};
