//! The staged execution driver.
//!
//! The [`Executor`] walks every runtime function reachable from the entry, in call
//! graph order, and resolves what it finds:
//!
//! - A build call whose arguments are all literals is invoked through the
//!   [`NativeBackend`]. Its result is interned as a literal, assigned to the call's
//!   destination, and the call is removed. A build call with a non-literal
//!   argument cannot run yet; it is reported and left in place.
//! - A build region start mark invokes the region function, then the whole span
//!   up to and including the end mark is removed.
//!
//! Staged code may inject new instructions or declare new functions, which can
//! contain build calls of their own. The walk therefore repeats in rounds, each
//! with a freshly compiled unit, until a round resolves nothing or the round limit
//! is reached.
//!
//! A failed `Assert` stops execution with an error message; execution faults abort
//! with the fault.

use std::collections::HashSet;

use crate::{
    analysis::CallGraph,
    compiler::{EventKind, EventLog},
    diagnostics::Diagnostics,
    ir::{MarkOp, Tac, TacId},
    program::{Program, ENTRY_FUNCTION},
    staging::{fault, CallSite, Frontend, NativeBackend, StagingContext, StagingHost},
    symbols::{DataSymbol, LiteralValue},
    Error, Result,
};

/// Runs build calls and build regions until the program has none left to run.
pub struct Executor<'e, B: NativeBackend> {
    backend: &'e B,
    frontend: &'e dyn Frontend,
    events: &'e EventLog,
    entry: String,
    max_rounds: usize,
}

/// Mutable state threaded through one execution.
struct Run<'r> {
    program: &'r mut Program,
    context: &'r mut StagingContext,
    diagnostics: &'r mut Diagnostics,
    reported: HashSet<(String, TacId)>,
}

impl<'e, B: NativeBackend> Executor<'e, B> {
    /// Creates an executor starting at the default entry function.
    #[must_use]
    pub fn new(backend: &'e B, frontend: &'e dyn Frontend, events: &'e EventLog) -> Self {
        Executor {
            backend,
            frontend,
            events,
            entry: ENTRY_FUNCTION.to_string(),
            max_rounds: 16,
        }
    }

    /// Sets the entry function.
    #[must_use]
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    /// Sets the maximum number of rounds.
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    /// Executes staged code in `program` to a fixed point.
    ///
    /// Messages go to `diagnostics`; the text written by staged code accumulates in
    /// `context`.
    ///
    /// # Returns
    ///
    /// The number of build calls and regions resolved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssertFailed`] after a staged assertion failed (the
    /// `Build Assert Failed.` message is already in `diagnostics`), and any fault
    /// or limit error raised while executing.
    pub fn run(
        &self,
        program: &mut Program,
        context: &mut StagingContext,
        diagnostics: &mut Diagnostics,
    ) -> Result<usize> {
        let mut run = Run {
            program,
            context,
            diagnostics,
            reported: HashSet::new(),
        };

        let mut total = 0;
        for round in 1..=self.max_rounds {
            let resolved = self.run_round(&mut run)?;
            total += resolved;
            self.events
                .record(EventKind::RoundCompleted)
                .message(format!("round {round} resolved {resolved}"));

            if resolved == 0 {
                return Ok(total);
            }
        }

        let text = format!(
            "Build execution stopped after {} rounds with work remaining",
            self.max_rounds
        );
        self.events.warn(text.clone());
        run.diagnostics.warning(text);
        Ok(total)
    }

    fn run_round(&self, run: &mut Run<'_>) -> Result<usize> {
        let call_graph = CallGraph::build(run.program);
        let functions: Vec<String> = call_graph
            .in_order_functions(&self.entry)
            .into_iter()
            .filter(|name| run.program.function(name).is_some_and(|f| !f.is_build()))
            .collect();

        let targets = staged_targets(run.program, &functions);
        let unit = self.backend.compile(run.program, &targets)?;

        let mut resolved = 0;
        for name in &functions {
            let mut cursor = run.program.function(name).and_then(|f| f.tacs.first());
            while let Some(id) = cursor {
                let Some(tac) = run
                    .program
                    .function(name)
                    .and_then(|f| f.tacs.get(id))
                    .cloned()
                else {
                    break;
                };

                cursor = match &tac {
                    Tac::Call { .. } if tac.is_build_call() => {
                        let next = next_of(run.program, name, id);
                        if self.execute_call(run, &unit, name, id, &tac)? {
                            resolved += 1;
                        }
                        next
                    }
                    Tac::BuildMark {
                        name: region,
                        op: MarkOp::Start,
                    } => {
                        resolved += 1;
                        self.execute_region(run, &unit, name, id, region)?
                    }
                    _ => next_of(run.program, name, id),
                };
            }
        }

        Ok(resolved)
    }

    fn invoke(
        &self,
        run: &mut Run<'_>,
        unit: &B::Unit,
        caller: &str,
        site: TacId,
        callee: &str,
        arguments: &[LiteralValue],
    ) -> Result<Option<LiteralValue>> {
        run.context.call_site = Some(CallSite {
            function: caller.to_string(),
            instruction: site,
        });
        let mut host = StagingHost {
            program: &mut *run.program,
            context: &mut *run.context,
            frontend: self.frontend,
            events: self.events,
            diagnostics: &mut *run.diagnostics,
        };
        let value = self.backend.invoke(unit, callee, arguments, &mut host);
        run.context.call_site = None;
        let value = value?;

        if run.context.assert_failed() {
            run.diagnostics.error("Build Assert Failed.");
            self.events.error(format!("assertion failed in {callee} from {caller}"));
            return Err(Error::AssertFailed);
        }
        Ok(value)
    }

    /// Runs one build call; returns `false` if it had to be skipped.
    fn execute_call(
        &self,
        run: &mut Run<'_>,
        unit: &B::Unit,
        caller: &str,
        id: TacId,
        tac: &Tac,
    ) -> Result<bool> {
        let Tac::Call {
            result,
            function: callee,
            arguments,
            ..
        } = tac
        else {
            return Ok(false);
        };

        let Some(values) = arguments
            .iter()
            .map(|a| a.as_literal().map(|l| l.value.clone()))
            .collect::<Option<Vec<_>>>()
        else {
            if run.reported.insert((caller.to_string(), id)) {
                run.diagnostics.info(format!(
                    "Unable to execute build call {} from {caller}. Non-literals detected.",
                    callee.name
                ));
            }
            return Ok(false);
        };

        let value = self.invoke(run, unit, caller, id, &callee.name, &values)?;

        let scope = run
            .program
            .function(caller)
            .map(|f| f.scope)
            .ok_or_else(|| fault(caller, "function disappeared during execution"))?;
        let replacement = match (result, &value) {
            (Some(result), Some(value)) => {
                let ty = value
                    .infer_type()
                    .unwrap_or_else(|| callee.return_type.clone());
                let literal = run.program.symbols.intern(scope, value.clone(), ty)?;
                Some(Tac::assign(result.clone(), DataSymbol::Literal(literal)))
            }
            (Some(_), None) => {
                return Err(fault(
                    &callee.name,
                    format!("returned no value to {caller}"),
                ));
            }
            (None, _) => None,
        };

        let function = run
            .program
            .function_mut(caller)
            .ok_or_else(|| fault(caller, "function disappeared during execution"))?;
        if let Some(replacement) = replacement {
            function.tacs.insert_after(id, replacement)?;
        }
        function.tacs.remove(id);

        let shown = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let value_text = value.map(|v| v.to_string()).unwrap_or_default();
        run.diagnostics.info(format!(
            "Executed build call {} from {caller}",
            callee.name
        ));
        run.diagnostics
            .info(format!("{}({shown}) -> \"{value_text}\"", callee.name));
        self.events
            .record(EventKind::BuildCallExecuted)
            .at(caller, id.index())
            .message(format!("{}({shown}) -> {value_text}", callee.name));
        Ok(true)
    }

    /// Runs one region and removes its span; returns the instruction after it.
    fn execute_region(
        &self,
        run: &mut Run<'_>,
        unit: &B::Unit,
        caller: &str,
        id: TacId,
        region: &str,
    ) -> Result<Option<TacId>> {
        self.invoke(run, unit, caller, id, region, &[])?;

        let function = run
            .program
            .function_mut(caller)
            .ok_or_else(|| fault(caller, "function disappeared during execution"))?;

        let mut removed = 0;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            cursor = function.tacs.next(current);
            let is_end = matches!(
                function.tacs.get(current),
                Some(Tac::BuildMark { name, op: MarkOp::End }) if name == region
            );
            function.tacs.remove(current);
            removed += 1;
            if is_end {
                self.events
                    .record(EventKind::RegionExecuted)
                    .at(caller, id.index())
                    .message(format!("{region}, {removed} instructions removed"));
                return Ok(cursor);
            }
        }

        Err(fault(caller, format!("region {region} has no end mark")))
    }
}

fn next_of(program: &Program, function: &str, id: TacId) -> Option<TacId> {
    program.function(function).and_then(|f| f.tacs.next(id))
}

/// Source functions the walk may need to run: build call targets and regions.
fn staged_targets(program: &Program, functions: &[String]) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for function in functions.iter().filter_map(|name| program.function(name)) {
        for tac in function.tacs.tacs() {
            let target = match tac {
                Tac::Call { function, .. } if tac.is_build_call() && !function.is_builtin() => {
                    &function.name
                }
                Tac::BuildMark {
                    name,
                    op: MarkOp::Start,
                } => name,
                _ => continue,
            };
            if program.function(target).is_some() && !targets.contains(target) {
                targets.push(target.clone());
            }
        }
    }
    targets
}
