//! Local copy and constant propagation.
//!
//! Within each basic block, an operand whose value was produced by a plain
//! assignment earlier in the same block is replaced by the assignment's source:
//!
//! ```text
//! x = 5                x = 5
//! y = x Add 1    =>    y = 5 Add 1
//! ```
//!
//! The replacement is only made while both sides of the assignment still hold the
//! values they had at the assignment, which [`LocalValueNumbering::unchanged_between`]
//! decides. Variables of enclosing scopes are left alone since calls may change them,
//! and static locals are left alone since their declaring assignment only runs once.

use std::collections::HashMap;

use crate::{
    analysis::{ControlFlowGraph, LocalValueNumbering},
    compiler::{EventKind, EventLog, TacPass},
    ir::{Tac, TacId},
    program::SourceFunction,
    symbols::{DataSymbol, SymbolTable},
    Result,
};

/// Replaces operands by the values assigned to them earlier in the same block.
pub struct PropagationPass;

impl Default for PropagationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl PropagationPass {
    /// Creates a new propagation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` if `symbol` lives in a scope enclosing the function.
    fn is_outer(function: &SourceFunction, symbols: &SymbolTable, symbol: &DataSymbol) -> bool {
        symbols
            .defining_scope(function.scope, symbol.root())
            .is_some_and(|scope| scope != function.scope)
    }

    /// Checks that `result = operand` at `writer` may replace `result` at `user`.
    fn is_current(
        lvn: &LocalValueNumbering,
        function: &SourceFunction,
        symbols: &SymbolTable,
        writer: TacId,
        user: TacId,
        result: &DataSymbol,
        operand: &DataSymbol,
    ) -> bool {
        if result == operand || result.root().is_static() {
            return false;
        }
        result
            .symbols()
            .into_iter()
            .chain(operand.symbols())
            .filter(|s| !s.is_literal())
            .all(|s| {
                !s.root().is_static()
                    && !Self::is_outer(function, symbols, &s)
                    && lvn.unchanged_between(&s, writer, user)
            })
    }
}

/// Substitutes `from` by `to` in the read operands of `tac`.
///
/// A literal replacement only applies to whole operands, never inside an access
/// path. Returns `Ok(None)` when nothing changed.
fn substitute_reads(tac: &Tac, from: &DataSymbol, to: &DataSymbol) -> Result<Option<Tac>> {
    let s = |d: &DataSymbol| {
        if d == from {
            to.clone()
        } else if to.is_literal() {
            d.clone()
        } else {
            d.substitute(from, to)
        }
    };

    let rewritten = match tac {
        Tac::Assign {
            result,
            operand,
            declare,
        } => Tac::Assign {
            result: result.clone(),
            operand: s(operand),
            declare: *declare,
        },
        Tac::Unary {
            op,
            result,
            operand,
        } => Tac::Unary {
            op: *op,
            result: result.clone(),
            operand: s(operand),
        },
        Tac::Binary {
            op,
            result,
            lhs,
            rhs,
        } => Tac::Binary {
            op: *op,
            result: result.clone(),
            lhs: s(lhs),
            rhs: s(rhs),
        },
        Tac::Call {
            result,
            function,
            arguments,
            is_build,
        } => Tac::Call {
            result: result.clone(),
            function: function.clone(),
            arguments: arguments
                .iter()
                .enumerate()
                .map(|(i, a)| if function.is_out(i) { a.clone() } else { s(a) })
                .collect(),
            is_build: *is_build,
        },
        Tac::MultiCall {
            result,
            side_effects,
            function,
            arguments,
        } => Tac::MultiCall {
            result: result.clone(),
            side_effects: side_effects.clone(),
            function: function.clone(),
            arguments: arguments
                .iter()
                .enumerate()
                .map(|(i, a)| if function.is_out(i) { a.clone() } else { s(a) })
                .collect(),
        },
        Tac::Conditional {
            location,
            condition,
        } => Tac::Conditional {
            location: location.clone(),
            condition: s(condition),
        },
        Tac::Return(value) => Tac::Return(s(value)),
        other => {
            let changed = other.reads().iter().any(|r| r.mentions(from));
            if changed {
                return Err(invariant_error!(
                    "Propagation into {} is not supported",
                    other
                ));
            }
            return Ok(None);
        }
    };

    Ok((rewritten != *tac).then_some(rewritten))
}

impl TacPass for PropagationPass {
    fn name(&self) -> &'static str {
        "propagation"
    }

    fn description(&self) -> &'static str {
        "Replaces operands by values assigned earlier in the same basic block"
    }

    fn run_on_function(
        &self,
        function: &mut SourceFunction,
        symbols: &mut SymbolTable,
        events: &EventLog,
    ) -> Result<bool> {
        let cfg = ControlFlowGraph::build(&function.tacs)?;
        let positions: HashMap<TacId, usize> = function
            .tacs
            .ids()
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();

        let mut blocks: Vec<(usize, Vec<TacId>)> = cfg
            .blocks()
            .map(|(_, block)| (block.order(), block.instructions().to_vec()))
            .collect();
        blocks.sort_by_key(|(order, _)| *order);

        let mut changed = false;
        for (_, block) in blocks {
            let lvn = LocalValueNumbering::build(&function.tacs, &block);

            for &user in &block {
                for writer in lvn.operand_writers(user) {
                    let Some(Tac::Assign {
                        result, operand, ..
                    }) = function.tacs.get(writer).cloned()
                    else {
                        continue;
                    };
                    if !Self::is_current(&lvn, function, symbols, writer, user, &result, &operand)
                    {
                        continue;
                    }
                    let Some(current) = function.tacs.get(user) else {
                        continue;
                    };
                    let Some(rewritten) = substitute_reads(current, &result, &operand)? else {
                        continue;
                    };

                    let before = function.tacs.replace(user, rewritten.clone())?;
                    events
                        .record(EventKind::OperandPropagated)
                        .at(function.name(), positions.get(&user).copied().unwrap_or(0))
                        .pass(self.name())
                        .message(format!("{before} -> {rewritten}"));
                    changed = true;
                }
            }
        }

        Ok(changed)
    }
}
