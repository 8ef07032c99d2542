//! Literal arithmetic.
//!
//! The single definition of what `(operator, operand type)` pairs mean. Constant
//! folding evaluates with these functions at optimization time, and the staging
//! interpreter evaluates with them at build time, so a folded result always equals
//! what the staged program would have computed.
//!
//! Integer arithmetic wraps at the operand width. Both operands of a binary operator
//! must have the same type.

use thiserror::Error;

use crate::{
    ir::{BinaryOp, UnaryOp},
    symbols::LiteralValue,
};

/// Why an evaluation produced no value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Integer division or remainder by zero, or `MIN / -1`.
    #[error("Division overflow or by zero in {op}")]
    DivideByZero {
        /// The offending operator
        op: BinaryOp,
    },

    /// The operator is not defined for the operand types.
    #[error("Operator {op} is not defined for {operands}")]
    Unsupported {
        /// The operator, as text
        op: String,
        /// The operand values, as text
        operands: String,
    },

    /// A branch condition was neither a boolean nor an integer.
    #[error("Condition {0} is not a boolean")]
    NotCondition(String),
}

macro_rules! integer_binary {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {{
        let (a, b) = ($a, $b);
        match $op {
            BinaryOp::Add => Ok(LiteralValue::$variant(a.wrapping_add(b))),
            BinaryOp::Subtract => Ok(LiteralValue::$variant(a.wrapping_sub(b))),
            BinaryOp::Multiply => Ok(LiteralValue::$variant(a.wrapping_mul(b))),
            BinaryOp::Divide => a
                .checked_div(b)
                .map(LiteralValue::$variant)
                .ok_or(EvalError::DivideByZero { op: $op }),
            BinaryOp::Mod => a
                .checked_rem(b)
                .map(LiteralValue::$variant)
                .ok_or(EvalError::DivideByZero { op: $op }),
            BinaryOp::LessThan => Ok(LiteralValue::Bool(a < b)),
            BinaryOp::LessThanEqual => Ok(LiteralValue::Bool(a <= b)),
            BinaryOp::GreaterThan => Ok(LiteralValue::Bool(a > b)),
            BinaryOp::GreaterThanEqual => Ok(LiteralValue::Bool(a >= b)),
            BinaryOp::Equals => Ok(LiteralValue::Bool(a == b)),
        }
    }};
}

macro_rules! integer_unary {
    ($op:expr, $a:expr, $variant:ident, signed) => {
        match $op {
            UnaryOp::Increment => Some(LiteralValue::$variant($a.wrapping_add(1))),
            UnaryOp::Decrement => Some(LiteralValue::$variant($a.wrapping_sub(1))),
            UnaryOp::Negate => Some(LiteralValue::$variant($a.wrapping_neg())),
        }
    };
    ($op:expr, $a:expr, $variant:ident, unsigned) => {
        match $op {
            UnaryOp::Increment => Some(LiteralValue::$variant($a.wrapping_add(1))),
            UnaryOp::Decrement => Some(LiteralValue::$variant($a.wrapping_sub(1))),
            UnaryOp::Negate => None,
        }
    };
}

/// Evaluates `lhs op rhs`.
///
/// Integers of equal width support every operator. Strings support `Add`
/// (concatenation) and `Equals`; booleans support `Equals`.
///
/// # Errors
///
/// [`EvalError::DivideByZero`] for a zero divisor, [`EvalError::Unsupported`] for
/// any other operand combination.
pub fn binary(
    op: BinaryOp,
    lhs: &LiteralValue,
    rhs: &LiteralValue,
) -> std::result::Result<LiteralValue, EvalError> {
    use LiteralValue as L;

    match (lhs, rhs) {
        (L::I8(a), L::I8(b)) => integer_binary!(op, *a, *b, I8),
        (L::I16(a), L::I16(b)) => integer_binary!(op, *a, *b, I16),
        (L::I32(a), L::I32(b)) => integer_binary!(op, *a, *b, I32),
        (L::I64(a), L::I64(b)) => integer_binary!(op, *a, *b, I64),
        (L::U8(a), L::U8(b)) => integer_binary!(op, *a, *b, U8),
        (L::U16(a), L::U16(b)) => integer_binary!(op, *a, *b, U16),
        (L::U32(a), L::U32(b)) => integer_binary!(op, *a, *b, U32),
        (L::U64(a), L::U64(b)) => integer_binary!(op, *a, *b, U64),
        (L::Str(a), L::Str(b)) => match op {
            BinaryOp::Add => Ok(L::Str(format!("{a}{b}"))),
            BinaryOp::Equals => Ok(L::Bool(a == b)),
            _ => Err(unsupported(op, &[lhs, rhs])),
        },
        (L::Bool(a), L::Bool(b)) if op == BinaryOp::Equals => Ok(L::Bool(a == b)),
        _ => Err(unsupported(op, &[lhs, rhs])),
    }
}

/// Evaluates `op operand`.
///
/// # Errors
///
/// [`EvalError::Unsupported`] for non-integer operands and for negating an
/// unsigned integer.
pub fn unary(op: UnaryOp, operand: &LiteralValue) -> std::result::Result<LiteralValue, EvalError> {
    use LiteralValue as L;

    let value = match operand {
        L::I8(a) => integer_unary!(op, *a, I8, signed),
        L::I16(a) => integer_unary!(op, *a, I16, signed),
        L::I32(a) => integer_unary!(op, *a, I32, signed),
        L::I64(a) => integer_unary!(op, *a, I64, signed),
        L::U8(a) => integer_unary!(op, *a, U8, unsigned),
        L::U16(a) => integer_unary!(op, *a, U16, unsigned),
        L::U32(a) => integer_unary!(op, *a, U32, unsigned),
        L::U64(a) => integer_unary!(op, *a, U64, unsigned),
        _ => None,
    };
    value.ok_or_else(|| unsupported(op, &[operand]))
}

/// Decides whether a branch condition holds.
///
/// Booleans are themselves; integers hold when non-zero.
///
/// # Errors
///
/// [`EvalError::NotCondition`] for any other value.
pub fn is_truthy(value: &LiteralValue) -> std::result::Result<bool, EvalError> {
    if let Some(b) = value.as_bool() {
        return Ok(b);
    }
    value
        .as_integer()
        .map(|v| v != 0)
        .ok_or_else(|| EvalError::NotCondition(value.to_string()))
}

fn unsupported(op: impl ToString, operands: &[&LiteralValue]) -> EvalError {
    let operands = operands
        .iter()
        .map(|v| match v.type_code() {
            Some(code) => format!("{code} {v}"),
            None => v.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    EvalError::Unsupported {
        op: op.to_string(),
        operands,
    }
}
