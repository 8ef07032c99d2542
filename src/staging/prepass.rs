//! Backend portability pre-pass.
//!
//! Some targets lack features the IR uses freely. Before rendering for such a
//! target the program is rewritten into an equivalent form:
//!
//! - **Static locals** become globals named `{function}_{name}`. Their declaring
//!   assignment leaves the function and is returned as a global initializer.
//! - **Out-parameters** become extra return values: `Return(x)` turns into
//!   `MultiReturn([x, outs..])`, `ReturnVoid` into `MultiReturn(outs)`, and every
//!   call of such a function into a `MultiCall` that receives the out values.
//!
//! Only functions reachable from the entry are rewritten.

use std::sync::Arc;

use crate::{
    analysis::CallGraph,
    compiler::{BackendTarget, EventKind, EventLog},
    ir::{MarkOp, Tac, TacId},
    program::{Program, SourceFunction},
    symbols::{DataSymbol, LocalSymbol, Storage, Symbol, SymbolTable},
    Result,
};

/// Rewrites a program for one [`BackendTarget`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendPrepass {
    target: BackendTarget,
}

impl BackendPrepass {
    /// Creates the pre-pass for `target`.
    #[must_use]
    pub fn new(target: BackendTarget) -> Self {
        BackendPrepass { target }
    }

    /// Returns the target.
    #[must_use]
    pub fn target(&self) -> BackendTarget {
        self.target
    }

    /// Rewrites the functions reachable from `entry`.
    ///
    /// # Returns
    ///
    /// The global initializers produced by hoisting static locals, in function
    /// order. Empty for targets that keep statics.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SymbolError`] if a hoisted name collides with an
    /// existing global.
    pub fn run(&self, program: &mut Program, entry: &str, events: &EventLog) -> Result<Vec<Tac>> {
        let functions = CallGraph::build(program).in_order_functions(entry);
        let mut initializers = Vec::new();

        if !self.target.supports_static_locals() {
            for name in &functions {
                let Some((function, symbols)) = program.split_mut(name) else {
                    continue;
                };
                initializers.extend(hoist_statics(function, symbols, events)?);
            }
        }

        if !self.target.supports_out_parameters() {
            for name in &functions {
                let Some(function) = program.function_mut(name) else {
                    continue;
                };
                rewrite_returns(function, events)?;
                rewrite_calls(function, events)?;
            }
        }

        Ok(initializers)
    }
}

fn hoist_statics(
    function: &mut SourceFunction,
    symbols: &mut SymbolTable,
    events: &EventLog,
) -> Result<Vec<Tac>> {
    let name = function.name().to_string();
    let root = symbols.root();
    let mut initializers = Vec::new();

    let statics: Vec<DataSymbol> = {
        let mut found: Vec<DataSymbol> = Vec::new();
        for tac in function.tacs.tacs() {
            for symbol in tac.reads().into_iter().chain(tac.writes()) {
                let root_symbol = symbol.root();
                if root_symbol.is_static() && !found.contains(root_symbol) {
                    found.push(root_symbol.clone());
                }
            }
        }
        found
    };

    for old in statics {
        let DataSymbol::Local(local) = &old else {
            continue;
        };
        let global = DataSymbol::Local(Arc::new(LocalSymbol {
            name: format!("{name}_{}", local.name),
            ty: local.ty.clone(),
            storage: Storage::Auto,
            dimension: local.dimension,
            is_build: local.is_build,
        }));

        if let Some(scope) = symbols.defining_scope(function.scope, &old) {
            symbols.remove(scope, &Symbol::Data(old.clone()))?;
        }
        symbols.add(root, global.clone())?;

        for (id, tac) in snapshot(function) {
            match &tac {
                Tac::Assign {
                    result,
                    declare: true,
                    ..
                } if *result == old => {
                    function.tacs.remove(id);
                    initializers.push(tac.substitute(&old, &global));
                }
                _ => {
                    let rewritten = tac.substitute(&old, &global);
                    if rewritten != tac {
                        function.tacs.replace(id, rewritten)?;
                    }
                }
            }
        }

        events
            .record(EventKind::StaticHoisted)
            .function(name.clone())
            .message(format!("{} -> {}", old.name(), global.name()));
    }

    Ok(initializers)
}

fn snapshot(function: &SourceFunction) -> Vec<(TacId, Tac)> {
    function
        .tacs
        .iter()
        .map(|(id, tac)| (id, tac.clone()))
        .collect()
}

fn out_parameters(function: &SourceFunction) -> Vec<DataSymbol> {
    function
        .symbol
        .parameter_symbols()
        .into_iter()
        .enumerate()
        .filter(|(i, _)| function.symbol.is_out(*i))
        .map(|(_, p)| p)
        .collect()
}

fn rewrite_returns(function: &mut SourceFunction, events: &EventLog) -> Result<()> {
    if !function.symbol.has_out_parameters() {
        return Ok(());
    }
    let outs = out_parameters(function);

    let mut rewritten = 0;
    let mut returns_last = false;
    for (id, tac) in snapshot(function) {
        let replacement = match tac {
            Tac::Return(value) => {
                let mut values = vec![value];
                values.extend(outs.iter().cloned());
                Tac::MultiReturn(values)
            }
            Tac::ReturnVoid => Tac::MultiReturn(outs.clone()),
            Tac::FunctionMark(MarkOp::End) => continue,
            Tac::MultiReturn(_) => {
                returns_last = true;
                continue;
            }
            _ => {
                returns_last = false;
                continue;
            }
        };
        function.tacs.replace(id, replacement)?;
        rewritten += 1;
        returns_last = true;
    }

    // A body that runs off its end still has to hand back the out values.
    if !returns_last {
        let tail = Tac::MultiReturn(outs);
        match function.tacs.last() {
            Some(last) if matches!(function.tacs.get(last), Some(Tac::FunctionMark(MarkOp::End))) => {
                function.tacs.insert_before(last, tail)?;
            }
            _ => {
                function.tacs.push_back(tail);
            }
        }
        rewritten += 1;
    }

    events
        .record(EventKind::OutParamsRewritten)
        .function(function.name())
        .message(format!("{rewritten} returns"));
    Ok(())
}

fn rewrite_calls(function: &mut SourceFunction, events: &EventLog) -> Result<()> {
    let mut rewritten = 0;
    for id in function.tacs.ids() {
        let Some(Tac::Call {
            result,
            function: callee,
            arguments,
            ..
        }) = function.tacs.get(id)
        else {
            continue;
        };
        if !callee.has_out_parameters() {
            continue;
        }

        let side_effects = arguments
            .iter()
            .enumerate()
            .filter(|(i, _)| callee.is_out(*i))
            .map(|(_, a)| a.clone())
            .collect();
        let multi = Tac::MultiCall {
            result: result.clone(),
            side_effects,
            function: callee.clone(),
            arguments: arguments.clone(),
        };
        function.tacs.replace(id, multi)?;
        rewritten += 1;
    }

    if rewritten > 0 {
        events
            .record(EventKind::OutParamsRewritten)
            .function(function.name())
            .message(format!("{rewritten} calls"));
    }
    Ok(())
}
