//! Function symbols.

use std::{fmt, sync::Arc};

use crate::symbols::{
    data::{DataSymbol, ParamDirection, ParamSymbol},
    types::TypeSymbol,
};

/// Where a function's body comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Body is three-address code owned by the [`crate::program::Program`]
    Source,
    /// Implemented natively by the staging host
    Builtin,
}

/// A function signature plus its kind.
///
/// Shared as `Arc<FunctionSymbol>` between the symbol table, call instructions and
/// the call graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSymbol {
    /// Function name
    pub name: String,
    /// Return type; `void` when the function returns nothing
    pub return_type: TypeSymbol,
    /// Parameters in declaration order
    pub parameters: Vec<Arc<ParamSymbol>>,
    /// Only callable during staged execution
    pub is_build: bool,
    /// Body source
    pub kind: FunctionKind,
}

impl FunctionSymbol {
    /// Creates a source function symbol.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        return_type: TypeSymbol,
        parameters: Vec<Arc<ParamSymbol>>,
        is_build: bool,
    ) -> Self {
        FunctionSymbol {
            name: name.into(),
            return_type,
            parameters,
            is_build,
            kind: FunctionKind::Source,
        }
    }

    /// Returns `true` if the body is native.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.kind == FunctionKind::Builtin
    }

    /// Returns the parameters as data symbols, for binding in the function body.
    #[must_use]
    pub fn parameter_symbols(&self) -> Vec<DataSymbol> {
        self.parameters
            .iter()
            .map(|p| DataSymbol::Param(p.clone()))
            .collect()
    }

    /// Returns `true` if any parameter is passed out.
    #[must_use]
    pub fn has_out_parameters(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| p.direction == ParamDirection::Out)
    }

    /// Returns `true` if parameter `index` is passed out.
    #[must_use]
    pub fn is_out(&self, index: usize) -> bool {
        self.parameters
            .get(index)
            .is_some_and(|p| p.direction == ParamDirection::Out)
    }
}

impl fmt::Display for FunctionSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if param.direction == ParamDirection::Out {
                f.write_str("out ")?;
            }
            write!(f, "{} {}", param.ty, param.name)?;
        }
        f.write_str(")")
    }
}
