//! Staged execution.
//!
//! Functions and regions marked as build-time run while the program is still being
//! compiled. Their results replace the calls, and their side effects (injected
//! statements, new functions, text output) become part of the compilation.
//!
//! # Architecture
//!
//! - [`generate_build_regions`] - lifts build regions into build functions
//! - [`Executor`] - walks the program in rounds and resolves build calls and regions
//! - [`NativeBackend`] - compiles and invokes staged functions; [`TacInterpreter`]
//!   is the built-in implementation
//! - [`Intrinsic`] - the native functions staged code may call
//! - [`StagingContext`] - per-compilation state: call site, output, assertion latch,
//!   files and static storage
//! - [`Frontend`] - the seam source injection re-enters the compiler through
//! - [`BackendPrepass`] - rewrites for targets without statics or out-parameters
//!
//! # Example
//!
//! ```rust,ignore
//! use stagecraft::staging::{Executor, NoFrontend, StagingContext, TacInterpreter};
//!
//! let backend = TacInterpreter::default();
//! let mut context = StagingContext::new();
//! let resolved = Executor::new(&backend, &NoFrontend, &events)
//!     .run(&mut program, &mut context, &mut diagnostics)?;
//! println!("{resolved} build sites resolved, output:\n{}", context.output());
//! ```

mod backend;
mod context;
mod executor;
mod frontend;
mod interpreter;
mod intrinsics;
mod prepass;
mod regions;

pub use backend::{NativeBackend, StagingHost};
pub use context::{CallSite, FileCursor, StagingContext};
pub use executor::Executor;
pub use frontend::{Frontend, NoFrontend};
pub use interpreter::{CompiledFunction, CompiledUnit, TacInterpreter};
pub use intrinsics::Intrinsic;
pub use prepass::BackendPrepass;
pub use regions::generate_build_regions;

use crate::Error;

/// Builds the fault raised when staged code misbehaves inside `function`.
pub(crate) fn fault(function: &str, message: impl Into<String>) -> Error {
    Error::StagingFault {
        function: function.to_string(),
        message: message.into(),
    }
}
