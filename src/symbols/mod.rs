//! Symbols and symbol tables.
//!
//! # Architecture
//!
//! - [`TypeSymbol`] and the primitive [`TypeCode`]s
//! - [`LiteralValue`] and interned [`LiteralSymbol`]s
//! - [`DataSymbol`], the operand type of every instruction
//! - [`FunctionSymbol`] signatures
//! - [`SymbolTable`], the scope arena
//!
//! Symbols are values: cheap to clone, compared structurally. Identity matters only
//! for literals, where [`SymbolTable::intern`] hands out one shared `Arc` per
//! distinct value.

mod data;
mod function;
mod literal;
mod table;
mod types;

use std::fmt;

pub use data::{
    DataSymbol, ElementSymbol, FieldSymbol, LocalSymbol, ParamDirection, ParamSymbol, Storage,
    TempSymbol,
};
pub use function::{FunctionKind, FunctionSymbol};
pub use literal::{LiteralSymbol, LiteralValue};
pub use table::{ScopeId, Symbol, SymbolKind, SymbolTable};
pub use types::{EnumType, FieldDef, HandleType, StructType, TypeCode, TypeSymbol};

/// A jump target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelSymbol {
    /// Label name, unique within a program
    pub name: String,
    /// Emitted for build-only code
    pub is_build: bool,
}

impl LabelSymbol {
    /// Creates a runtime label.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        LabelSymbol {
            name: name.into(),
            is_build: false,
        }
    }
}

impl fmt::Display for LabelSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
