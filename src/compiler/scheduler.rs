//! Pass scheduler for the optimizer.
//!
//! The `PassScheduler` applies its passes, in insertion order, to one function at a
//! time. By default the sequence runs once. With a higher iteration limit it repeats
//! until a full round changes nothing, since a later pass can expose work for an
//! earlier one: folding `y = x Add 1` into a plain assignment only reaches the next
//! reader of `y` in another propagation round.

use crate::{
    compiler::{
        passes::{
            ConstantFoldingPass, DeadBlockEliminationPass, DeadCodeEliminationPass,
            PropagationPass,
        },
        CompilerConfig, EventKind, EventLog, TacPass,
    },
    program::{Program, SourceFunction},
    symbols::SymbolTable,
    Error, Result,
};

/// Runs optimizer passes over the functions of a program.
pub struct PassScheduler {
    /// Maximum rounds of the pass sequence per function.
    max_iterations: usize,
    /// The passes, in execution order.
    passes: Vec<Box<dyn TacPass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PassScheduler {
    /// Creates an empty scheduler.
    ///
    /// # Arguments
    ///
    /// * `max_iterations` - Maximum rounds of the pass sequence per function.
    #[must_use]
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            passes: Vec::new(),
        }
    }

    /// Creates a scheduler with the passes `config` enables, in the fixed order
    /// propagation, folding, dead-block elimination, dead-code elimination, repeated
    /// at most `config.optimizer_rounds` times.
    #[must_use]
    pub fn from_config(config: &CompilerConfig) -> Self {
        let mut scheduler = Self::new(config.optimizer_rounds);
        if config.enable_propagation {
            scheduler.add(PropagationPass::new());
        }
        if config.enable_constant_folding {
            scheduler.add(ConstantFoldingPass::new());
        }
        if config.enable_dead_block_elimination {
            scheduler.add(DeadBlockEliminationPass::new());
        }
        if config.enable_dead_code_elimination {
            scheduler.add(DeadCodeEliminationPass::new());
        }
        scheduler
    }

    /// Appends a pass to the sequence.
    pub fn add(&mut self, pass: impl TacPass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Returns the names of the scheduled passes, in order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Returns the iteration limit.
    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Runs the sequence on one function until it is stable or the iteration
    /// limit is reached.
    ///
    /// # Returns
    ///
    /// `true` if any pass changed the function.
    ///
    /// # Errors
    ///
    /// Returns the first error a pass reports, with the function unchanged from
    /// the state the failing pass saw.
    pub fn run_on_function(
        &self,
        function: &mut SourceFunction,
        symbols: &mut SymbolTable,
        events: &EventLog,
    ) -> Result<bool> {
        let mut any_changed = false;

        for iteration in 0..self.max_iterations {
            let mut round_changed = false;
            for pass in &self.passes {
                if !pass.should_run(function) {
                    continue;
                }
                if pass.run_on_function(function, symbols, events)? {
                    events
                        .record(EventKind::PassCompleted)
                        .function(function.name())
                        .pass(pass.name())
                        .message(format!("changed in round {}", iteration + 1));
                    round_changed = true;
                }
            }

            if !round_changed {
                break;
            }
            any_changed = true;
        }

        Ok(any_changed)
    }

    /// Runs the sequence on every source function of `program`.
    ///
    /// Functions are independent; nothing learned in one carries over to another.
    ///
    /// # Returns
    ///
    /// The number of functions that changed.
    ///
    /// # Errors
    ///
    /// Returns the first error a pass reports.
    pub fn run(&self, program: &mut Program, events: &EventLog) -> Result<usize> {
        if self.passes.is_empty() {
            return Ok(0);
        }

        events
            .record(EventKind::PassStarted)
            .message(self.pass_names().join(", "));

        let mut changed = 0;
        for name in program.function_names() {
            let (function, symbols) = program
                .split_mut(&name)
                .ok_or_else(|| Error::SymbolError(format!("Function {name} not found")))?;
            if self.run_on_function(function, symbols, events)? {
                changed += 1;
            }
        }
        Ok(changed)
    }
}
