//! Dead-code elimination.
//!
//! A symbol that is written but never read is dead; an instruction whose every
//! write is dead is removed.
//!
//! Calls are the exception. A call writing only dead symbols is kept with its
//! result dropped (`n = f(a)` becomes `f(a)`) instead of being deleted, since the
//! callee may print, inject code or update statics.
//!
//! Parameters, static locals and variables of enclosing scopes survive the
//! function body and are never considered dead.

use std::collections::HashSet;

use crate::{
    analysis::DefUseGraph,
    compiler::{EventKind, EventLog, TacPass},
    ir::Tac,
    program::SourceFunction,
    symbols::{DataSymbol, SymbolTable},
    Result,
};

/// Removes writes nobody reads.
pub struct DeadCodeEliminationPass;

impl Default for DeadCodeEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadCodeEliminationPass {
    /// Creates a new dead-code elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn is_removable(function: &SourceFunction, symbols: &SymbolTable, symbol: &DataSymbol) -> bool {
        let root = symbol.root();
        if root.is_literal() || root.is_param() || root.is_static() {
            return false;
        }
        symbols
            .defining_scope(function.scope, root)
            .is_none_or(|scope| scope == function.scope)
    }

    /// Collects the symbols with writers and without readers.
    fn dead_symbols(function: &SourceFunction, symbols: &SymbolTable) -> HashSet<DataSymbol> {
        DefUseGraph::build(function, symbols)
            .iter()
            .filter(|(symbol, uses)| {
                uses.readers.is_empty()
                    && !uses.writers.is_empty()
                    && Self::is_removable(function, symbols, symbol)
            })
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }
}

impl TacPass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn description(&self) -> &'static str {
        "Removes instructions whose results are never read"
    }

    fn run_on_function(
        &self,
        function: &mut SourceFunction,
        symbols: &mut SymbolTable,
        events: &EventLog,
    ) -> Result<bool> {
        let dead = Self::dead_symbols(function, symbols);
        if dead.is_empty() {
            return Ok(false);
        }

        let mut changed = false;
        for (position, id) in function.tacs.ids().into_iter().enumerate() {
            let Some(tac) = function.tacs.get(id) else {
                continue;
            };

            let result_dead = {
                let writes = tac.result_writes();
                !writes.is_empty() && writes.iter().all(|w| dead.contains(w))
            };
            if !result_dead {
                continue;
            }

            match tac {
                Tac::Call {
                    function: callee,
                    arguments,
                    is_build,
                    ..
                } => {
                    let stripped = Tac::Call {
                        result: None,
                        function: callee.clone(),
                        arguments: arguments.clone(),
                        is_build: *is_build,
                    };
                    let before = function.tacs.replace(id, stripped.clone())?;
                    events
                        .record(EventKind::InstructionRemoved)
                        .at(function.name(), position)
                        .pass(self.name())
                        .message(format!("{before} -> {stripped}"));
                }
                Tac::MultiCall {
                    side_effects,
                    function: callee,
                    arguments,
                    ..
                } => {
                    let stripped = Tac::MultiCall {
                        result: None,
                        side_effects: side_effects.clone(),
                        function: callee.clone(),
                        arguments: arguments.clone(),
                    };
                    let before = function.tacs.replace(id, stripped.clone())?;
                    events
                        .record(EventKind::InstructionRemoved)
                        .at(function.name(), position)
                        .pass(self.name())
                        .message(format!("{before} -> {stripped}"));
                }
                _ => {
                    if let Some(removed) = function.tacs.remove(id) {
                        events
                            .record(EventKind::InstructionRemoved)
                            .at(function.name(), position)
                            .pass(self.name())
                            .message(removed.to_string());
                    }
                }
            }
            changed = true;
        }

        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        ir::BinaryOp,
        symbols::{FunctionSymbol, ParamDirection, ParamSymbol, TypeSymbol},
        test::Fixture,
    };

    fn run(f: &mut Fixture) -> bool {
        let name = f.name.clone();
        let (function, symbols) = f.program.split_mut(&name).unwrap();
        DeadCodeEliminationPass
            .run_on_function(function, symbols, &f.events)
            .unwrap()
    }

    #[test]
    fn test_unread_local_removed() {
        let mut f = Fixture::new("main");
        let x = f.local("x", TypeSymbol::I32);
        let y = f.local("y", TypeSymbol::I32);
        let one = f.int(1);
        let two = f.int(2);

        f.push(Tac::assign(x.clone(), one));
        f.push(Tac::assign(y, two));
        f.push(Tac::Return(x));

        assert!(run(&mut f));
        assert_eq!(
            f.listing(),
            vec!["AssignTac: x = \"1\":i32", "ReturnTac: x"]
        );
        assert_eq!(f.events.count_kind(EventKind::InstructionRemoved), 1);
    }

    #[test]
    fn test_param_kept() {
        let signature = FunctionSymbol::new(
            "f",
            TypeSymbol::VOID,
            vec![Arc::new(ParamSymbol::new(
                "p",
                TypeSymbol::I32,
                ParamDirection::In,
            ))],
            false,
        );
        let mut f = Fixture::with_signature(signature);
        let p = DataSymbol::param("p", TypeSymbol::I32, ParamDirection::In);
        let one = f.int(1);
        f.push(Tac::assign(p, one));

        assert!(!run(&mut f));
        assert_eq!(f.listing().len(), 1);
    }

    #[test]
    fn test_dead_call_result_dropped() {
        let mut f = Fixture::new("main");
        let n = f.local("n", TypeSymbol::I32);
        let s = f.string("abc");
        let str_len = f.program.find_function("str_len").unwrap();

        f.push(Tac::Call {
            result: Some(n),
            function: str_len,
            arguments: vec![s],
            is_build: false,
        });

        assert!(run(&mut f));
        assert_eq!(f.listing(), vec!["CallTac: Void str_len(\"abc\":str)"]);
    }

    #[test]
    fn test_dead_chain_takes_two_runs() {
        let mut f = Fixture::new("main");
        let t = f.temp(TypeSymbol::I32);
        let u = f.temp(TypeSymbol::I32);
        let one = f.int(1);

        // t is read by the binary, u is not
        f.push(Tac::assign(t.clone(), one.clone()));
        f.push(Tac::Binary {
            op: BinaryOp::Add,
            result: u,
            lhs: t,
            rhs: one,
        });

        assert!(run(&mut f));
        assert_eq!(f.listing(), vec!["AssignTac: _temp_T0 = \"1\":i32"]);
        // The second run sees the freshly unread temporary.
        assert!(run(&mut f));
        assert!(f.listing().is_empty());
    }

    #[test]
    fn test_globals_kept() {
        let mut f = Fixture::new("main");
        let root = f.program.symbols.root();
        let g = f.program.local(root, "g", TypeSymbol::I32).unwrap();
        let one = f.int(1);
        f.push(Tac::assign(g, one));

        assert!(!run(&mut f));
    }
}
