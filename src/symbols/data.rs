//! Data symbols: every operand an instruction can read or write.

use std::{fmt, sync::Arc};

use crate::{
    symbols::{literal::LiteralSymbol, types::TypeSymbol},
    Error, Result,
};

/// Storage class of a local variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Storage {
    /// Lives for one invocation
    #[default]
    Auto,
    /// Keeps its value across invocations
    Static,
}

/// Parameter passing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamDirection {
    /// Passed by value
    #[default]
    In,
    /// Written back to the caller's argument on return
    Out,
}

/// A compiler-generated temporary with a globally unique name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TempSymbol {
    /// Generated name
    pub name: String,
    /// Value type
    pub ty: TypeSymbol,
}

/// A named local variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalSymbol {
    /// Source name
    pub name: String,
    /// Value type
    pub ty: TypeSymbol,
    /// Storage class
    pub storage: Storage,
    /// Declared element count for arrays, 1 otherwise
    pub dimension: usize,
    /// Declared inside build-only code
    pub is_build: bool,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamSymbol {
    /// Parameter name
    pub name: String,
    /// Value type
    pub ty: TypeSymbol,
    /// Passing direction
    pub direction: ParamDirection,
}

impl ParamSymbol {
    /// Creates a parameter description.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeSymbol, direction: ParamDirection) -> Self {
        ParamSymbol {
            name: name.into(),
            ty,
            direction,
        }
    }
}

/// Access to a field of another data symbol, `instance.field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSymbol {
    /// The aggregate being accessed
    pub instance: DataSymbol,
    /// Field name
    pub field: String,
    /// Field type
    pub ty: TypeSymbol,
}

/// Access to an array element, `array[index]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementSymbol {
    /// The array being indexed
    pub array: DataSymbol,
    /// The index operand
    pub index: DataSymbol,
    /// Element type
    pub ty: TypeSymbol,
}

/// An operand: literal, temporary, local, parameter, field access or element access.
///
/// Cloning is cheap (one `Arc` bump). Equality and hashing are structural, so two
/// separately created `a.x` accesses compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataSymbol {
    /// Interned constant
    Literal(Arc<LiteralSymbol>),
    /// Compiler temporary
    Temp(Arc<TempSymbol>),
    /// Named local
    Local(Arc<LocalSymbol>),
    /// Function parameter
    Param(Arc<ParamSymbol>),
    /// Field access
    Field(Arc<FieldSymbol>),
    /// Array element access
    Element(Arc<ElementSymbol>),
}

impl DataSymbol {
    /// Creates an automatic local.
    #[must_use]
    pub fn local(name: impl Into<String>, ty: TypeSymbol) -> Self {
        DataSymbol::Local(Arc::new(LocalSymbol {
            name: name.into(),
            ty,
            storage: Storage::Auto,
            dimension: 1,
            is_build: false,
        }))
    }

    /// Creates a static local.
    #[must_use]
    pub fn static_local(name: impl Into<String>, ty: TypeSymbol) -> Self {
        DataSymbol::Local(Arc::new(LocalSymbol {
            name: name.into(),
            ty,
            storage: Storage::Static,
            dimension: 1,
            is_build: false,
        }))
    }

    /// Creates a parameter.
    #[must_use]
    pub fn param(name: impl Into<String>, ty: TypeSymbol, direction: ParamDirection) -> Self {
        DataSymbol::Param(Arc::new(ParamSymbol {
            name: name.into(),
            ty,
            direction,
        }))
    }

    /// Creates `instance.field`, resolving the field type from the instance type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if the instance type has no such field.
    pub fn field(instance: DataSymbol, field: impl Into<String>) -> Result<Self> {
        let field = field.into();
        let ty = instance.ty().field_type(&field).ok_or_else(|| {
            Error::SymbolError(format!("Type {} has no field {}", instance.ty(), field))
        })?;
        Ok(DataSymbol::Field(Arc::new(FieldSymbol {
            instance,
            field,
            ty,
        })))
    }

    /// Creates `array[index]`, resolving the element type from the array type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `array` is not of array type.
    pub fn element(array: DataSymbol, index: DataSymbol) -> Result<Self> {
        let ty = array
            .ty()
            .element()
            .cloned()
            .ok_or_else(|| Error::TypeMismatch {
                expected: "array".to_string(),
                found: array.ty().to_string(),
            })?;
        Ok(DataSymbol::Element(Arc::new(ElementSymbol { array, index, ty })))
    }

    /// Returns the name as it appears in listings.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            DataSymbol::Literal(l) => l.to_string(),
            DataSymbol::Temp(t) => t.name.clone(),
            DataSymbol::Local(l) => l.name.clone(),
            DataSymbol::Param(p) => p.name.clone(),
            DataSymbol::Field(f) => format!("{}.{}", f.instance.name(), f.field),
            DataSymbol::Element(e) => format!("{}[{}]", e.array.name(), e.index.name()),
        }
    }

    /// Returns the value type.
    #[must_use]
    pub fn ty(&self) -> &TypeSymbol {
        match self {
            DataSymbol::Literal(l) => &l.ty,
            DataSymbol::Temp(t) => &t.ty,
            DataSymbol::Local(l) => &l.ty,
            DataSymbol::Param(p) => &p.ty,
            DataSymbol::Field(f) => &f.ty,
            DataSymbol::Element(e) => &e.ty,
        }
    }

    /// Element count for array literals and locals, 1 otherwise.
    #[must_use]
    pub fn dimension(&self) -> usize {
        match self {
            DataSymbol::Literal(l) => l.dimension,
            DataSymbol::Local(l) => l.dimension,
            _ => 1,
        }
    }

    /// Returns the interned literal, if this operand is one.
    #[must_use]
    pub fn as_literal(&self) -> Option<&Arc<LiteralSymbol>> {
        match self {
            DataSymbol::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Returns `true` for literal operands.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, DataSymbol::Literal(_))
    }

    /// Returns `true` for parameters.
    #[must_use]
    pub fn is_param(&self) -> bool {
        matches!(self, DataSymbol::Param(_))
    }

    /// Returns `true` for static locals.
    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self, DataSymbol::Local(l) if l.storage == Storage::Static)
    }

    /// Returns `true` for locals declared in build-only code.
    #[must_use]
    pub fn is_build(&self) -> bool {
        matches!(self, DataSymbol::Local(l) if l.is_build)
    }

    /// Expands an operand into the symbols it touches.
    ///
    /// A field access touches itself and its instance; an element access touches the
    /// array and the index; everything else touches only itself.
    #[must_use]
    pub fn symbols(&self) -> Vec<DataSymbol> {
        match self {
            DataSymbol::Field(f) => vec![self.clone(), f.instance.clone()],
            DataSymbol::Element(e) => vec![e.array.clone(), e.index.clone()],
            _ => vec![self.clone()],
        }
    }

    /// Returns the variable an access path is rooted at (`a` for `a.x[i].y`).
    #[must_use]
    pub fn root(&self) -> &DataSymbol {
        match self {
            DataSymbol::Field(f) => f.instance.root(),
            DataSymbol::Element(e) => e.array.root(),
            _ => self,
        }
    }

    /// Returns `true` if `needle` occurs anywhere in this operand.
    #[must_use]
    pub fn mentions(&self, needle: &DataSymbol) -> bool {
        if self == needle {
            return true;
        }
        match self {
            DataSymbol::Field(f) => f.instance.mentions(needle),
            DataSymbol::Element(e) => e.array.mentions(needle) || e.index.mentions(needle),
            _ => false,
        }
    }

    /// Replaces every occurrence of `from` in this operand, including inside
    /// access paths, with `to`.
    #[must_use]
    pub fn substitute(&self, from: &DataSymbol, to: &DataSymbol) -> DataSymbol {
        if self == from {
            return to.clone();
        }
        match self {
            DataSymbol::Field(f) if f.instance.mentions(from) => {
                DataSymbol::Field(Arc::new(FieldSymbol {
                    instance: f.instance.substitute(from, to),
                    field: f.field.clone(),
                    ty: f.ty.clone(),
                }))
            }
            DataSymbol::Element(e) if e.array.mentions(from) || e.index.mentions(from) => {
                DataSymbol::Element(Arc::new(ElementSymbol {
                    array: e.array.substitute(from, to),
                    index: e.index.substitute(from, to),
                    ty: e.ty.clone(),
                }))
            }
            _ => self.clone(),
        }
    }
}

impl From<Arc<LiteralSymbol>> for DataSymbol {
    fn from(literal: Arc<LiteralSymbol>) -> Self {
        DataSymbol::Literal(literal)
    }
}

impl fmt::Display for DataSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
