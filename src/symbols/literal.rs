//! Literal values and literal symbols.

use std::fmt;

use crate::symbols::types::{HandleType, TypeCode, TypeSymbol};

/// A compile-time constant value.
///
/// Integers keep their width, so `I32(5)` and `I64(5)` are different values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    /// Boolean
    Bool(bool),
    /// `i8`
    I8(i8),
    /// `i16`
    I16(i16),
    /// `i32`
    I32(i32),
    /// `i64`
    I64(i64),
    /// `u8`
    U8(u8),
    /// `u16`
    U16(u16),
    /// `u32`
    U32(u32),
    /// `u64`
    U64(u64),
    /// String
    Str(String),
    /// Array of element values
    Array(Vec<LiteralValue>),
    /// Struct value, fields in declaration order
    Struct(Vec<LiteralValue>),
    /// Function handle, by function name
    Func(String),
    /// Handle to a file opened by the staging host
    File(usize),
}

impl LiteralValue {
    /// Returns the primitive code of a scalar value.
    #[must_use]
    pub fn type_code(&self) -> Option<TypeCode> {
        Some(match self {
            LiteralValue::Bool(_) => TypeCode::Bool,
            LiteralValue::I8(_) => TypeCode::I8,
            LiteralValue::I16(_) => TypeCode::I16,
            LiteralValue::I32(_) => TypeCode::I32,
            LiteralValue::I64(_) => TypeCode::I64,
            LiteralValue::U8(_) => TypeCode::U8,
            LiteralValue::U16(_) => TypeCode::U16,
            LiteralValue::U32(_) => TypeCode::U32,
            LiteralValue::U64(_) => TypeCode::U64,
            LiteralValue::Str(_) => TypeCode::Str,
            _ => return None,
        })
    }

    /// Returns the type of a value whose type can be inferred from the value alone.
    ///
    /// Scalars and handles infer their type; arrays infer from their first
    /// element; struct values need their declaring type and return `None`.
    #[must_use]
    pub fn infer_type(&self) -> Option<TypeSymbol> {
        match self {
            LiteralValue::Func(_) => Some(TypeSymbol::Handle(HandleType::Func)),
            LiteralValue::File(_) => Some(TypeSymbol::Handle(HandleType::File)),
            LiteralValue::Array(items) => items
                .first()
                .and_then(LiteralValue::infer_type)
                .map(TypeSymbol::array_of),
            LiteralValue::Struct(_) => None,
            scalar => scalar.type_code().map(TypeSymbol::Primitive),
        }
    }

    /// Number of elements for arrays, 1 otherwise.
    #[must_use]
    pub fn dimension(&self) -> usize {
        match self {
            LiteralValue::Array(items) => items.len(),
            _ => 1,
        }
    }

    /// Widens any integer value to `i128`.
    #[must_use]
    pub fn as_integer(&self) -> Option<i128> {
        Some(match self {
            LiteralValue::I8(v) => i128::from(*v),
            LiteralValue::I16(v) => i128::from(*v),
            LiteralValue::I32(v) => i128::from(*v),
            LiteralValue::I64(v) => i128::from(*v),
            LiteralValue::U8(v) => i128::from(*v),
            LiteralValue::U16(v) => i128::from(*v),
            LiteralValue::U32(v) => i128::from(*v),
            LiteralValue::U64(v) => i128::from(*v),
            _ => return None,
        })
    }

    /// Returns the boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LiteralValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiteralValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Produces the zero value of `ty`: `false`, `0`, `""`, or a struct of zero fields.
    ///
    /// Arrays default to empty; handles have no default.
    #[must_use]
    pub fn default_for(ty: &TypeSymbol) -> Option<LiteralValue> {
        match ty {
            TypeSymbol::Primitive(code) => Some(match code {
                TypeCode::Void => return None,
                TypeCode::Bool => LiteralValue::Bool(false),
                TypeCode::I8 => LiteralValue::I8(0),
                TypeCode::I16 => LiteralValue::I16(0),
                TypeCode::I32 => LiteralValue::I32(0),
                TypeCode::I64 => LiteralValue::I64(0),
                TypeCode::U8 => LiteralValue::U8(0),
                TypeCode::U16 => LiteralValue::U16(0),
                TypeCode::U32 => LiteralValue::U32(0),
                TypeCode::U64 => LiteralValue::U64(0),
                TypeCode::Str => LiteralValue::Str(String::new()),
            }),
            TypeSymbol::Enum(_) => Some(LiteralValue::I32(0)),
            TypeSymbol::Array(_) => Some(LiteralValue::Array(Vec::new())),
            TypeSymbol::Struct(s) => s
                .fields
                .iter()
                .map(|f| LiteralValue::default_for(&f.ty))
                .collect::<Option<Vec<_>>>()
                .map(LiteralValue::Struct),
            TypeSymbol::Handle(_) => None,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Bool(v) => write!(f, "{v}"),
            LiteralValue::I8(v) => write!(f, "{v}"),
            LiteralValue::I16(v) => write!(f, "{v}"),
            LiteralValue::I32(v) => write!(f, "{v}"),
            LiteralValue::I64(v) => write!(f, "{v}"),
            LiteralValue::U8(v) => write!(f, "{v}"),
            LiteralValue::U16(v) => write!(f, "{v}"),
            LiteralValue::U32(v) => write!(f, "{v}"),
            LiteralValue::U64(v) => write!(f, "{v}"),
            LiteralValue::Str(v) => f.write_str(v),
            LiteralValue::Array(items) | LiteralValue::Struct(items) => {
                let open = if matches!(self, LiteralValue::Array(_)) { '[' } else { '{' };
                let close = if open == '[' { ']' } else { '}' };
                write!(f, "{open}")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "{close}")
            }
            LiteralValue::Func(name) => write!(f, "{name}"),
            LiteralValue::File(handle) => write!(f, "File#{handle}"),
        }
    }
}

/// An interned constant: a value, its type and its dimension.
///
/// Held behind an `Arc` by the symbol table; interning guarantees that equal
/// `(value, type)` pairs in one scope chain share a single allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LiteralSymbol {
    /// The constant
    pub value: LiteralValue,
    /// Declared type
    pub ty: TypeSymbol,
    /// Element count for arrays, 1 otherwise
    pub dimension: usize,
}

impl LiteralSymbol {
    /// Creates a literal symbol; the dimension is taken from the value.
    #[must_use]
    pub fn new(value: LiteralValue, ty: TypeSymbol) -> Self {
        let dimension = value.dimension();
        LiteralSymbol {
            value,
            ty,
            dimension,
        }
    }
}

impl fmt::Display for LiteralSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\":{}", self.value, self.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::types::FieldDef;

    #[test]
    fn test_display() {
        assert_eq!(LiteralValue::I32(-4).to_string(), "-4");
        assert_eq!(LiteralValue::Bool(true).to_string(), "true");
        assert_eq!(
            LiteralValue::Array(vec![LiteralValue::U8(1), LiteralValue::U8(2)]).to_string(),
            "[1, 2]"
        );
        assert_eq!(
            LiteralSymbol::new(LiteralValue::Str("hi".into()), TypeSymbol::STR).to_string(),
            "\"hi\":str"
        );
    }

    #[test]
    fn test_width_distinguishes_values() {
        assert_ne!(LiteralValue::I32(5), LiteralValue::I64(5));
        assert_eq!(LiteralValue::I32(5).as_integer(), LiteralValue::I64(5).as_integer());
    }

    #[test]
    fn test_infer_type() {
        assert_eq!(LiteralValue::U64(1).infer_type(), Some(TypeSymbol::from(TypeCode::U64)));
        assert_eq!(
            LiteralValue::Array(vec![LiteralValue::U8(7)]).infer_type(),
            Some(TypeSymbol::array_of(TypeSymbol::U8))
        );
        assert_eq!(LiteralValue::Array(vec![]).infer_type(), None);
    }

    #[test]
    fn test_default_for_struct() {
        let ty = TypeSymbol::new_struct(
            "Pair",
            vec![
                FieldDef {
                    name: "a".into(),
                    ty: TypeSymbol::I32,
                },
                FieldDef {
                    name: "b".into(),
                    ty: TypeSymbol::STR,
                },
            ],
            false,
        );
        assert_eq!(
            LiteralValue::default_for(&ty),
            Some(LiteralValue::Struct(vec![
                LiteralValue::I32(0),
                LiteralValue::Str(String::new())
            ]))
        );
        assert_eq!(LiteralValue::default_for(&TypeSymbol::VOID), None);
    }

    #[test]
    fn test_dimension() {
        let symbol = LiteralSymbol::new(
            LiteralValue::Array(vec![LiteralValue::I32(1); 3]),
            TypeSymbol::array_of(TypeSymbol::I32),
        );
        assert_eq!(symbol.dimension, 3);
    }
}
