//! # stagecraft Prelude
//!
//! Convenient re-exports of the types most programs driving the compiler need.
//! Import this module to build programs, run the pipeline and read its results.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all stagecraft operations
pub use crate::Error;

/// The result type used throughout stagecraft
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The phase driver and its configuration
pub use crate::compiler::{BackendTarget, CompilerConfig, Pipeline, StagingLimits};

/// Programs and function bodies
pub use crate::program::{Program, SourceFunction};

/// User-facing results of each phase
pub use crate::diagnostics::{Diagnostics, Message, MessageType};

// ================================================================================================
// Intermediate Representation
// ================================================================================================

/// Instructions and instruction lists
pub use crate::ir::{BinaryOp, MarkOp, Tac, TacId, TacList, UnaryOp};

// ================================================================================================
// Symbols
// ================================================================================================

/// Symbol tables and the symbols they hold
pub use crate::symbols::{
    DataSymbol, FunctionSymbol, LabelSymbol, LiteralSymbol, LiteralValue, ParamDirection,
    ParamSymbol, ScopeId, Symbol, SymbolTable, TypeSymbol,
};

// ================================================================================================
// Analysis and Optimization
// ================================================================================================

/// Flow analyses
pub use crate::analysis::{CallGraph, ControlFlowGraph, DefUseGraph, LocalValueNumbering};

/// Event journaling and optimizer passes
pub use crate::compiler::{EventKind, EventLog, PassScheduler, TacPass};

// ================================================================================================
// Staged Execution
// ================================================================================================

/// Backends, front-end seam and per-compilation staging state
pub use crate::staging::{
    Frontend, Intrinsic, NativeBackend, NoFrontend, StagingContext, StagingHost, TacInterpreter,
};
