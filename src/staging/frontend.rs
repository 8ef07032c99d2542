//! The front-end seam used by source injection.
//!
//! Staged code may hand source text back to the compiler: `Build_AddBody` injects
//! statements into the function that is executing, `Build_Func` declares a whole new
//! function. Parsing, binding and lowering that text is the front end's job; this
//! crate only sees the [`Frontend`] trait.

use std::sync::Arc;

use crate::{
    diagnostics::Diagnostics, ir::Tac, program::Program, symbols::FunctionSymbol, Error, Result,
};

/// Parses, binds and lowers source text on behalf of staged code.
///
/// Implementations add whatever symbols the text declares to `program`: locals and
/// literals into the target function's scope for statements, a new function with
/// its body for [`Frontend::lower_function`]. Binding problems go to
/// `diagnostics`; a hard failure is returned as [`Error::Frontend`].
pub trait Frontend {
    /// Lowers the statements in `source` as part of `function`.
    ///
    /// Returns the lowered instructions in order; the caller splices them in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Frontend`] if the text does not parse or bind.
    fn lower_statements(
        &self,
        source: &str,
        function: &str,
        program: &mut Program,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<Tac>>;

    /// Declares the function in `source` in the global scope and lowers its body
    /// into `program`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Frontend`] if the text does not parse or bind.
    fn lower_function(
        &self,
        source: &str,
        program: &mut Program,
        diagnostics: &mut Diagnostics,
    ) -> Result<Arc<FunctionSymbol>>;
}

/// A front end that rejects all source, for programs that never inject any.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFrontend;

impl Frontend for NoFrontend {
    fn lower_statements(
        &self,
        _source: &str,
        function: &str,
        _program: &mut Program,
        _diagnostics: &mut Diagnostics,
    ) -> Result<Vec<Tac>> {
        Err(Error::Frontend(format!(
            "No front end available to inject statements into {function}"
        )))
    }

    fn lower_function(
        &self,
        _source: &str,
        _program: &mut Program,
        _diagnostics: &mut Diagnostics,
    ) -> Result<Arc<FunctionSymbol>> {
        Err(Error::Frontend(
            "No front end available to declare functions".to_string(),
        ))
    }
}
