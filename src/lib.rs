// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # stagecraft
//!
//! The middle and back end of a compiler whose distinguishing feature is **staged
//! execution**: functions and source regions marked as build-time are compiled,
//! executed while the program is still being compiled, and their results are spliced
//! back into the program as literals or as freshly injected code.
//!
//! The crate takes a program that a front end has already lowered into three-address
//! code, runs every build-time call and region until none are left, optimizes the
//! result and prepares it for a concrete backend.
//!
//! ## Features
//!
//! - **Three-address IR** - [`ir::Tac`] instructions in an editable [`ir::TacList`]
//! - **Lexical symbol tables** - [`symbols::SymbolTable`] with literal interning
//! - **Flow analyses** - control-flow graph, def-use graph, local value numbering and
//!   a call graph tracking runtime/build call edges
//! - **Optimizer** - propagation, constant folding, dead-block and dead-code elimination
//! - **Staging engine** - executes build calls and build regions through a
//!   [`staging::NativeBackend`], including source injection that re-enters the front end
//! - **Backend portability** - rewrites static locals and out-parameters for targets
//!   that lack them
//!
//! ## Architecture
//!
//! The phases run in a fixed order, each returning a [`diagnostics::Diagnostics`]:
//!
//! 1. [`compiler::Pipeline::generate_build_regions`] - lift build regions into functions
//! 2. [`compiler::Pipeline::execute_build`] - run staged code to a fixed point
//! 3. [`compiler::Pipeline::optimize`] - the four optimizer passes
//! 4. [`compiler::Pipeline::ready_for_backend`] - reject residual build calls
//! 5. [`compiler::Pipeline::backend_prepass`] - target-specific rewrites
//! 6. [`compiler::Pipeline::prune_build_symbols`] - drop build-only symbols
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagecraft::prelude::*;
//!
//! let mut program = Program::new();
//! // ... a front end populates `program` ...
//!
//! let mut pipeline = Pipeline::new(CompilerConfig::default());
//! let backend = TacInterpreter::new(StagingLimits::default());
//!
//! pipeline.generate_build_regions(&mut program)?;
//! let result = pipeline.execute_build(&mut program, &backend, &NoFrontend)?;
//! for message in result.messages() {
//!     println!("{message}");
//! }
//! pipeline.optimize(&mut program)?;
//! pipeline.ready_for_backend(&program)?;
//! # Ok::<(), stagecraft::Error>(())
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,ignore
/// use stagecraft::prelude::*;
///
/// let program = Program::new();
/// assert!(program.function("main").is_none());
/// ```
pub mod prelude;

/// Generic graph infrastructure shared by the analyses.
pub mod utils;

/// Symbols and lexically nested symbol tables.
///
/// Types, literals, data, labels and functions live in a [`symbols::SymbolTable`]
/// arena of scopes. Literals are interned so that equal values share one symbol.
pub mod symbols;

/// Three-address intermediate representation.
///
/// # Key Types
///
/// - [`ir::Tac`] - a single instruction
/// - [`ir::TacList`] - an ordered, editable instruction stream with stable handles
/// - [`ir::eval`] - literal arithmetic shared by constant folding and staged execution
pub mod ir;

/// Programs: the global symbol table plus the bodies of all source functions.
pub mod program;

/// Flow analyses over the IR.
///
/// - [`analysis::ControlFlowGraph`] - basic blocks and control edges
/// - [`analysis::DefUseGraph`] - readers and writers per data symbol
/// - [`analysis::LocalValueNumbering`] - per-block value generations
/// - [`analysis::CallGraph`] - runtime and build call edges between functions
pub mod analysis;

/// Optimizer passes, event journaling, configuration and the phase pipeline.
pub mod compiler;

/// Staged execution: running build calls and regions during compilation.
pub mod staging;

/// Result objects carrying user-facing messages.
pub mod diagnostics;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust,ignore
/// use stagecraft::{Result, program::Program};
///
/// fn entry_length(program: &Program) -> Result<usize> {
///     Ok(program.function("main").map_or(0, |f| f.tacs.len()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `stagecraft` Error type
///
/// The main error type for all operations in this crate. Fatal compilation errors
/// travel as [`Error`]; user-facing informational output travels as
/// [`diagnostics::Message`] values inside a [`diagnostics::Diagnostics`].
pub use error::Error;
