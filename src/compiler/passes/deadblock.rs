//! Dead-block elimination.
//!
//! Runs in two steps:
//!
//! 1. Every conditional jump testing a literal is resolved: a false condition
//!    becomes an unconditional `goto`, a true one falls through and is removed.
//! 2. The control flow graph is rebuilt and condensed, and only the blocks
//!    reachable from the function start survive, in stream order.
//!
//! Condensing also drops `goto L` / `L:` pairs that end up adjacent.

use std::collections::HashSet;

use crate::{
    analysis::ControlFlowGraph,
    compiler::{EventKind, EventLog, TacPass},
    ir::{eval, Tac},
    program::SourceFunction,
    symbols::{DataSymbol, SymbolTable},
    Result,
};

/// Removes blocks that can no longer be reached.
pub struct DeadBlockEliminationPass;

impl Default for DeadBlockEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadBlockEliminationPass {
    /// Creates a new dead-block elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolves conditionals over literals. Returns `true` if any was resolved.
    fn resolve_branches(&self, function: &mut SourceFunction, events: &EventLog) -> Result<bool> {
        let mut changed = false;

        for (position, id) in function.tacs.ids().into_iter().enumerate() {
            let Some(Tac::Conditional {
                location,
                condition: DataSymbol::Literal(literal),
            }) = function.tacs.get(id)
            else {
                continue;
            };

            let (location, literal) = (location.clone(), literal.clone());
            let holds = eval::is_truthy(&literal.value)
                .map_err(|e| invariant_error!("Branch on {}: {}", literal, e))?;

            let message = if holds {
                function.tacs.remove(id);
                format!("IF NOT {literal} -> {location} never jumps")
            } else {
                function.tacs.replace(id, Tac::Goto(location.clone()))?;
                format!("IF NOT {literal} -> {location} always jumps")
            };

            events
                .record(EventKind::BranchSimplified)
                .at(function.name(), position)
                .pass(self.name())
                .message(message);
            changed = true;
        }

        Ok(changed)
    }
}

impl TacPass for DeadBlockEliminationPass {
    fn name(&self) -> &'static str {
        "dead-block-elimination"
    }

    fn description(&self) -> &'static str {
        "Resolves constant branches and removes unreachable blocks"
    }

    fn run_on_function(
        &self,
        function: &mut SourceFunction,
        _symbols: &mut SymbolTable,
        events: &EventLog,
    ) -> Result<bool> {
        let resolved = self.resolve_branches(function, events)?;

        let mut cfg = ControlFlowGraph::build(&function.tacs)?;
        cfg.condense(&function.tacs)?;
        let Some(start) = cfg
            .find_function_start(&function.tacs)
            .or_else(|| cfg.entry())
        else {
            return Ok(resolved);
        };

        let live = cfg.reachable(start);
        let kept = cfg.linearize(&live);
        if kept.len() == function.tacs.len() {
            return Ok(resolved);
        }

        let live_set: HashSet<_> = live.iter().copied().collect();
        for (node, block) in cfg.blocks().filter(|(n, _)| !live_set.contains(n)) {
            events
                .record(EventKind::BlockRemoved)
                .function(function.name())
                .location(block.order())
                .pass(self.name())
                .message(format!(
                    "{} ({} instructions)",
                    cfg.graph().name(node).unwrap_or_default(),
                    block.len()
                ));
        }

        function.tacs = function.tacs.select(&kept);
        Ok(true)
    }
}
