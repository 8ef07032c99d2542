//! Literal constant folding.
//!
//! Unary and binary operations whose operands are all literals are evaluated with
//! [`crate::ir::eval`] and replaced by an assignment of the interned result:
//!
//! ```text
//! x = "2":i32 Add "3":i32    =>    x = "5":i32
//! ```

use crate::{
    compiler::{EventKind, EventLog, TacPass},
    ir::{
        eval::{self, EvalError},
        Tac,
    },
    program::SourceFunction,
    symbols::{DataSymbol, LiteralValue, SymbolTable},
    Result,
};

/// Evaluates operations over literals at compile time.
pub struct ConstantFoldingPass;

impl Default for ConstantFoldingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantFoldingPass {
    /// Creates a new constant folding pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Evaluates `tac` if it is an operation over literals.
    ///
    /// Division by zero is left for the program to fault on at runtime.
    fn evaluate(tac: &Tac) -> Result<Option<(DataSymbol, LiteralValue)>> {
        let outcome = match tac {
            Tac::Binary {
                op,
                result,
                lhs: DataSymbol::Literal(lhs),
                rhs: DataSymbol::Literal(rhs),
            } => {
                if lhs.ty != rhs.ty {
                    return Err(invariant_error!(
                        "Folding {} over {} and {}",
                        op,
                        lhs.ty,
                        rhs.ty
                    ));
                }
                (result, eval::binary(*op, &lhs.value, &rhs.value))
            }
            Tac::Unary {
                op,
                result,
                operand: DataSymbol::Literal(operand),
            } => (result, eval::unary(*op, &operand.value)),
            _ => return Ok(None),
        };

        match outcome {
            (result, Ok(value)) => Ok(Some((result.clone(), value))),
            (_, Err(EvalError::DivideByZero { .. })) => Ok(None),
            (_, Err(e)) => Err(invariant_error!("Folding {}: {}", tac, e)),
        }
    }
}

impl TacPass for ConstantFoldingPass {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn description(&self) -> &'static str {
        "Evaluates unary and binary operations over literals"
    }

    fn run_on_function(
        &self,
        function: &mut SourceFunction,
        symbols: &mut SymbolTable,
        events: &EventLog,
    ) -> Result<bool> {
        let mut changed = false;

        for (position, id) in function.tacs.ids().into_iter().enumerate() {
            let Some(tac) = function.tacs.get(id) else {
                continue;
            };
            let Some((result, value)) = Self::evaluate(tac)? else {
                continue;
            };

            let ty = value.infer_type().unwrap_or_else(|| result.ty().clone());
            let literal = symbols.intern(function.scope, value, ty)?;
            let folded = Tac::assign(result, DataSymbol::Literal(literal));

            let before = function.tacs.replace(id, folded.clone())?;
            events
                .record(EventKind::ConstantFolded)
                .at(function.name(), position)
                .pass(self.name())
                .message(format!("{before} -> {folded}"));
            changed = true;
        }

        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{BinaryOp, UnaryOp},
        symbols::TypeSymbol,
        test::Fixture,
        Error,
    };

    fn run(f: &mut Fixture) -> Result<bool> {
        let (function, symbols) = f.program.split_mut("main").unwrap();
        ConstantFoldingPass.run_on_function(function, symbols, &f.events)
    }

    #[test]
    fn test_fold_add() {
        let mut f = Fixture::new("main");
        let x = f.local("x", TypeSymbol::I32);
        let two = f.int(2);
        let three = f.int(3);
        f.push(Tac::Binary {
            op: BinaryOp::Add,
            result: x,
            lhs: two,
            rhs: three,
        });

        assert!(run(&mut f).unwrap());
        assert_eq!(f.listing(), vec!["AssignTac: x = \"5\":i32"]);

        // The result is the interned literal.
        let five = f.int(5);
        assert_eq!(
            f.tacs().tacs().next(),
            Some(&Tac::assign(DataSymbol::local("x", TypeSymbol::I32), five))
        );
    }

    #[test]
    fn test_fold_is_idempotent() {
        let mut f = Fixture::new("main");
        let x = f.local("x", TypeSymbol::I32);
        let two = f.int(2);
        let three = f.int(3);
        f.push(Tac::Binary {
            op: BinaryOp::Multiply,
            result: x,
            lhs: two,
            rhs: three,
        });

        assert!(run(&mut f).unwrap());
        let once = f.listing();
        assert!(!run(&mut f).unwrap());
        assert_eq!(f.listing(), once);
        assert_eq!(f.events.count_kind(EventKind::ConstantFolded), 1);
    }

    #[test]
    fn test_fold_comparison_and_unary() {
        let mut f = Fixture::new("main");
        let b = f.local("b", TypeSymbol::BOOL);
        let n = f.local("n", TypeSymbol::I32);
        let two = f.int(2);
        let three = f.int(3);
        f.push(Tac::Binary {
            op: BinaryOp::LessThan,
            result: b,
            lhs: two.clone(),
            rhs: three,
        });
        f.push(Tac::Unary {
            op: UnaryOp::Negate,
            result: n,
            operand: two,
        });

        run(&mut f).unwrap();
        assert_eq!(
            f.listing(),
            vec!["AssignTac: b = \"true\":bool", "AssignTac: n = \"-2\":i32"]
        );
    }

    #[test]
    fn test_divide_by_zero_is_left_alone() {
        let mut f = Fixture::new("main");
        let x = f.local("x", TypeSymbol::I32);
        let one = f.int(1);
        let zero = f.int(0);
        f.push(Tac::Binary {
            op: BinaryOp::Divide,
            result: x,
            lhs: one,
            rhs: zero,
        });

        assert!(!run(&mut f).unwrap());
    }

    #[test]
    fn test_unsupported_pair_is_invariant_error() {
        let mut f = Fixture::new("main");
        let x = f.local("x", TypeSymbol::STR);
        let a = f.string("a");
        let b = f.string("b");
        f.push(Tac::Binary {
            op: BinaryOp::Subtract,
            result: x,
            lhs: a,
            rhs: b,
        });

        assert!(matches!(run(&mut f), Err(Error::NotImplemented { .. })));
    }
}
