//! Flow analyses over three-address code.
//!
//! # Architecture
//!
//! - [`cfg`] - basic blocks and control edges of one function
//! - [`defuse`] - readers and writers of every data symbol of one function
//! - [`lvn`] - value generations inside one basic block
//! - [`callgraph`] - runtime and build call edges of a whole program
//!
//! All analyses are snapshots: they are rebuilt after the instruction stream they
//! describe has been edited.

pub mod callgraph;
pub mod cfg;
pub mod defuse;
pub mod lvn;

pub use callgraph::{CallFlags, CallGraph};
pub use cfg::{BasicBlock, ControlFlowGraph};
pub use defuse::{DataUse, DefUseGraph};
pub use lvn::LocalValueNumbering;
