//! Type symbols.
//!
//! [`TypeSymbol`] is a cheap-to-clone value: primitives are inline, aggregate types
//! share their definition behind an `Arc`. Two type symbols are equal when they
//! describe the same type structurally.

use std::{fmt, sync::Arc};

use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

/// The primitive type codes.
///
/// The string form is the name the front end uses for the type (`i32`, `str`, ...).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    EnumCount,
)]
#[strum(serialize_all = "lowercase")]
pub enum TypeCode {
    /// No value
    Void,
    /// `true` / `false`
    Bool,
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
    /// Immutable string
    Str,
}

impl TypeCode {
    /// Returns `true` for the eight integer codes.
    #[must_use]
    pub fn is_integer(self) -> bool {
        !matches!(self, TypeCode::Void | TypeCode::Bool | TypeCode::Str)
    }
}

/// Opaque handle types provided by the staging host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum HandleType {
    /// Handle to a function, produced by `Build_Func`
    Func,
    /// Handle to an open text file, produced by `File_Open`
    File,
}

/// A named field of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: TypeSymbol,
}

/// A user-declared struct type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructType {
    /// Type name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldDef>,
    /// Declared inside build-only code
    pub is_build: bool,
}

/// A user-declared enumeration. Members are 32-bit integer constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    /// Type name
    pub name: String,
    /// `(member, value)` pairs in declaration order
    pub members: Vec<(String, i32)>,
    /// Declared inside build-only code
    pub is_build: bool,
}

/// A type known to the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSymbol {
    /// One of the primitive type codes
    Primitive(TypeCode),
    /// A struct type
    Struct(Arc<StructType>),
    /// An enum type
    Enum(Arc<EnumType>),
    /// An array of the element type
    Array(Arc<TypeSymbol>),
    /// An opaque host handle
    Handle(HandleType),
}

impl TypeSymbol {
    /// `void`
    pub const VOID: TypeSymbol = TypeSymbol::Primitive(TypeCode::Void);
    /// `bool`
    pub const BOOL: TypeSymbol = TypeSymbol::Primitive(TypeCode::Bool);
    /// `i32`
    pub const I32: TypeSymbol = TypeSymbol::Primitive(TypeCode::I32);
    /// `u8`
    pub const U8: TypeSymbol = TypeSymbol::Primitive(TypeCode::U8);
    /// `str`
    pub const STR: TypeSymbol = TypeSymbol::Primitive(TypeCode::Str);

    /// Creates an array type over `element`.
    #[must_use]
    pub fn array_of(element: TypeSymbol) -> Self {
        TypeSymbol::Array(Arc::new(element))
    }

    /// Creates a struct type.
    #[must_use]
    pub fn new_struct(name: impl Into<String>, fields: Vec<FieldDef>, is_build: bool) -> Self {
        TypeSymbol::Struct(Arc::new(StructType {
            name: name.into(),
            fields,
            is_build,
        }))
    }

    /// Returns the type name as the front end spells it.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            TypeSymbol::Primitive(code) => code.to_string(),
            TypeSymbol::Struct(s) => s.name.clone(),
            TypeSymbol::Enum(e) => e.name.clone(),
            TypeSymbol::Array(element) => format!("{}[]", element.name()),
            TypeSymbol::Handle(handle) => handle.to_string(),
        }
    }

    /// Returns the primitive code, if this is a primitive type.
    #[must_use]
    pub fn code(&self) -> Option<TypeCode> {
        match self {
            TypeSymbol::Primitive(code) => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` if this is a primitive type (including `void`).
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeSymbol::Primitive(_))
    }

    /// Returns `true` for `void`.
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, TypeSymbol::Primitive(TypeCode::Void))
    }

    /// Returns the element type of an array.
    #[must_use]
    pub fn element(&self) -> Option<&TypeSymbol> {
        match self {
            TypeSymbol::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Returns `true` if the type was declared in build-only code.
    #[must_use]
    pub fn is_build(&self) -> bool {
        match self {
            TypeSymbol::Struct(s) => s.is_build,
            TypeSymbol::Enum(e) => e.is_build,
            _ => false,
        }
    }

    /// Resolves the type of field `name`.
    ///
    /// Arrays expose a synthetic `Length` field of type `i32`.
    #[must_use]
    pub fn field_type(&self, name: &str) -> Option<TypeSymbol> {
        match self {
            TypeSymbol::Struct(s) => s
                .fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.ty.clone()),
            TypeSymbol::Array(_) if name == "Length" => Some(TypeSymbol::I32),
            _ => None,
        }
    }

    /// Returns the position of field `name` in a struct type.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        match self {
            TypeSymbol::Struct(s) => s.fields.iter().position(|f| f.name == name),
            _ => None,
        }
    }
}

impl From<TypeCode> for TypeSymbol {
    fn from(code: TypeCode) -> Self {
        TypeSymbol::Primitive(code)
    }
}

impl fmt::Display for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
