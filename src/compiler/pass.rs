//! The pass interface of the optimizer.

use crate::{
    compiler::EventLog, program::SourceFunction, symbols::SymbolTable, Result,
};

/// An optimizer pass over one function's three-address code.
///
/// Passes are stateless unit structs; the [`crate::compiler::PassScheduler`] runs
/// them in a fixed order, one function at a time. There is no cross-function state:
/// a pass sees the function it rewrites and the symbol table it interns into.
pub trait TacPass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Should this pass run on `function`?
    ///
    /// Called before `run_on_function`. Override to skip functions the pass cannot
    /// improve.
    fn should_run(&self, _function: &SourceFunction) -> bool {
        true
    }

    /// Run the pass on a single function.
    ///
    /// Returns `true` if the function changed. Each rewrite is recorded in `events`.
    ///
    /// # Arguments
    ///
    /// * `function` - The function to rewrite.
    /// * `symbols` - The program's symbol table, for interning literals.
    /// * `events` - The event log.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotImplemented`] when the function contains an
    /// instruction shape the pass does not handle.
    fn run_on_function(
        &self,
        function: &mut SourceFunction,
        symbols: &mut SymbolTable,
        events: &EventLog,
    ) -> Result<bool>;
}
