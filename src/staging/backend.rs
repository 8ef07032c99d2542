//! The native execution interface.
//!
//! Staged execution needs two things from whatever runs the code: compile a set of
//! functions into something executable, then invoke one of them with literal
//! arguments. [`NativeBackend`] is that contract. [`crate::staging::TacInterpreter`]
//! implements it by walking the three-address code directly; a JIT could implement
//! it as well without the executor noticing.

use crate::{
    compiler::EventLog,
    diagnostics::Diagnostics,
    program::Program,
    staging::{Frontend, StagingContext},
    symbols::LiteralValue,
    Result,
};

/// Everything staged code may touch outside its own frames.
///
/// Built by the executor for each invocation and handed to the backend, which
/// passes it on to intrinsics.
pub struct StagingHost<'a> {
    /// The program under compilation, edited by source injection
    pub program: &'a mut Program,
    /// Per-compilation staging state
    pub context: &'a mut StagingContext,
    /// Front end for injected source
    pub frontend: &'a dyn Frontend,
    /// Event log for injected source and created functions
    pub events: &'a EventLog,
    /// Messages of the running phase
    pub diagnostics: &'a mut Diagnostics,
}

/// Compiles and runs staged functions.
///
/// # Example
///
/// ```rust,ignore
/// use stagecraft::staging::{NativeBackend, TacInterpreter};
///
/// let backend = TacInterpreter::default();
/// let unit = backend.compile(&program, &["square".to_string()])?;
/// let value = backend.invoke(&unit, "square", &[LiteralValue::I32(7)], &mut host)?;
/// assert_eq!(value, Some(LiteralValue::I32(49)));
/// ```
pub trait NativeBackend {
    /// The executable form of a set of functions.
    type Unit;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Compiles `functions`, and everything they need, into one unit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SymbolError`] if a named function has no body.
    fn compile(&self, program: &Program, functions: &[String]) -> Result<Self::Unit>;

    /// Runs `function` with `arguments` to completion.
    ///
    /// Returns the function's value, `None` for `void` functions.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StagingFault`] for execution faults, the staging
    /// limit errors when a bound is hit, and any error raised by an intrinsic.
    fn invoke(
        &self,
        unit: &Self::Unit,
        function: &str,
        arguments: &[LiteralValue],
        host: &mut StagingHost<'_>,
    ) -> Result<Option<LiteralValue>>;
}
