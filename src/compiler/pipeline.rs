//! The phase driver.
//!
//! A [`Pipeline`] owns the configuration, the event log and the staging context of
//! one compilation and exposes each phase as a method. The phases are meant to run
//! in the order they are declared here; each returns the user-facing messages it
//! produced.
//!
//! | Phase | Effect |
//! |-------|--------|
//! | [`Pipeline::generate_build_regions`] | Lifts build regions into functions |
//! | [`Pipeline::execute_build`] | Runs staged code to a fixed point |
//! | [`Pipeline::optimize`] | Propagation, folding, dead blocks, dead code |
//! | [`Pipeline::ready_for_backend`] | Rejects programs with build calls left |
//! | [`Pipeline::backend_prepass`] | Rewrites for the configured target |
//! | [`Pipeline::prune_build_symbols`] | Drops build-only symbols |

use crate::{
    analysis::CallGraph,
    compiler::{prune, CompilerConfig, DerivedStats, EventLog, PassScheduler},
    diagnostics::Diagnostics,
    ir::Tac,
    program::Program,
    staging::{
        self, BackendPrepass, Executor, Frontend, NativeBackend, StagingContext, TacInterpreter,
    },
    Error, Result,
};

/// Drives one compilation through its phases.
///
/// # Example
///
/// ```rust,ignore
/// use stagecraft::prelude::*;
///
/// let mut pipeline = Pipeline::new(CompilerConfig::default());
/// pipeline.generate_build_regions(&mut program)?;
/// let staged = pipeline.execute_build(&mut program, &TacInterpreter::default(), &NoFrontend)?;
/// if !staged.success() {
///     return Ok(staged);
/// }
/// pipeline.optimize(&mut program)?;
/// let ready = pipeline.ready_for_backend(&program)?;
/// println!("{}", pipeline.events().summary());
/// ```
pub struct Pipeline {
    config: CompilerConfig,
    events: EventLog,
    context: StagingContext,
    scheduler: PassScheduler,
    globals: Vec<Tac>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl Pipeline {
    /// Creates a pipeline for `config`.
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        let scheduler = PassScheduler::from_config(&config);
        Pipeline {
            config,
            events: EventLog::new(),
            context: StagingContext::new(),
            scheduler,
            globals: Vec::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Returns everything recorded so far.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Returns the counters derived from the event log.
    #[must_use]
    pub fn stats(&self) -> DerivedStats {
        DerivedStats::from_log(&self.events)
    }

    /// Returns the text written by staged code.
    #[must_use]
    pub fn output(&self) -> &str {
        self.context.output()
    }

    /// Returns the staging context of the last [`Pipeline::execute_build`].
    #[must_use]
    pub fn context(&self) -> &StagingContext {
        &self.context
    }

    /// Creates the built-in interpreter bounded by the configured staging limits.
    #[must_use]
    pub fn interpreter(&self) -> TacInterpreter {
        TacInterpreter::new(self.config.limits.clone())
    }

    /// Returns the global initializers produced by [`Pipeline::backend_prepass`].
    #[must_use]
    pub fn globals(&self) -> &[Tac] {
        &self.globals
    }

    /// Lifts every build region into a build function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if a region name collides with another symbol.
    pub fn generate_build_regions(&mut self, program: &mut Program) -> Result<Diagnostics> {
        staging::generate_build_regions(program, &self.events)?;
        Ok(Diagnostics::new())
    }

    /// Runs all build calls and regions reachable from the entry function.
    ///
    /// The staging context is reset first. A failed staged assertion is not an
    /// error of this method: it ends execution and the returned diagnostics carry
    /// `Build Assert Failed.`.
    ///
    /// # Errors
    ///
    /// Returns execution faults, staging limit errors and front-end errors. Use
    /// [`Pipeline::execute_build_with`] to keep the messages of a failed run.
    pub fn execute_build<B: NativeBackend>(
        &mut self,
        program: &mut Program,
        backend: &B,
        frontend: &dyn Frontend,
    ) -> Result<Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        self.execute_build_with(program, backend, frontend, &mut diagnostics)?;
        Ok(diagnostics)
    }

    /// Like [`Pipeline::execute_build`], collecting messages into `diagnostics`.
    ///
    /// A failure other than an assertion is also added to `diagnostics` as an
    /// error message before it is returned.
    ///
    /// # Errors
    ///
    /// Returns execution faults, staging limit errors and front-end errors.
    pub fn execute_build_with<B: NativeBackend>(
        &mut self,
        program: &mut Program,
        backend: &B,
        frontend: &dyn Frontend,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        self.context.reset();

        let executor = Executor::new(backend, frontend, &self.events)
            .with_entry(self.config.entry.clone())
            .with_max_rounds(self.config.max_build_rounds);
        match executor.run(program, &mut self.context, diagnostics) {
            Ok(_) | Err(Error::AssertFailed) => Ok(()),
            Err(e) => {
                diagnostics.error(e.to_string());
                self.events.error(format!("staged execution stopped: {e}"));
                Err(e)
            }
        }
    }

    /// Runs the enabled optimizer passes over every function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotImplemented`] if a pass meets an instruction it cannot
    /// handle.
    pub fn optimize(&mut self, program: &mut Program) -> Result<Diagnostics> {
        self.scheduler.run(program, &self.events)?;
        Ok(Diagnostics::new())
    }

    /// Checks that no build call remains reachable from the entry function.
    ///
    /// # Errors
    ///
    /// Infallible today; returns `Result` to match the other phases.
    pub fn ready_for_backend(&self, program: &Program) -> Result<Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let tainted = CallGraph::build(program).build_tainted(&self.config.entry);
        if !tainted.is_empty() {
            let names = tainted
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            diagnostics.error(format!("File contains build calls: {names}"));
        }
        Ok(diagnostics)
    }

    /// Rewrites the program for the configured backend target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if a hoisted static collides with a global.
    pub fn backend_prepass(&mut self, program: &mut Program) -> Result<Diagnostics> {
        let prepass = BackendPrepass::new(self.config.target);
        self.globals = prepass.run(program, &self.config.entry, &self.events)?;
        Ok(Diagnostics::new())
    }

    /// Removes build-only functions and symbols.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if a build function cannot be removed.
    pub fn prune_build_symbols(&mut self, program: &mut Program) -> Result<Diagnostics> {
        prune::prune_build_symbols(program, &self.events)?;
        Ok(Diagnostics::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::BackendTarget,
        diagnostics::MessageType,
        staging::NoFrontend,
        symbols::{FunctionSymbol, TypeSymbol},
        test::Fixture,
    };

    #[test]
    fn test_residual_build_call_reported() {
        let mut f = Fixture::new("main");
        let (gen, _) = f.declare(FunctionSymbol::new("gen", TypeSymbol::VOID, vec![], true));
        f.push(Tac::Call {
            result: None,
            function: gen,
            arguments: vec![],
            is_build: true,
        });

        let pipeline = Pipeline::default();
        let diagnostics = pipeline.ready_for_backend(&f.program).unwrap();
        assert!(!diagnostics.success());
        assert_eq!(
            diagnostics.messages()[0].text,
            "File contains build calls: gen"
        );
        assert_eq!(diagnostics.messages()[0].kind, MessageType::Error);
    }

    #[test]
    fn test_clean_program_is_ready() {
        let mut f = Fixture::new("main");
        f.push(Tac::ReturnVoid);
        let diagnostics = Pipeline::default().ready_for_backend(&f.program).unwrap();
        assert!(diagnostics.success());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_assert_failure_becomes_diagnostic() {
        let mut f = Fixture::new("main");
        let assert = f.program.find_function("Assert").unwrap();
        let no = f.boolean(false);
        f.push(Tac::Call {
            result: None,
            function: assert,
            arguments: vec![no],
            is_build: true,
        });

        let mut pipeline = Pipeline::new(CompilerConfig::new().with_target(BackendTarget::Python));
        let diagnostics = pipeline
            .execute_build(&mut f.program, &TacInterpreter::default(), &NoFrontend)
            .unwrap();
        assert!(diagnostics.has_errors());
        assert!(pipeline.context().assert_failed());
    }

    #[test]
    fn test_staging_fault_becomes_diagnostic() {
        let mut f = Fixture::new("main");
        let add_body = f.program.find_function("Build_AddBody").unwrap();
        let body = f.string("x = 1");
        f.push(Tac::Call {
            result: None,
            function: add_body,
            arguments: vec![body],
            is_build: true,
        });

        let mut pipeline = Pipeline::default();
        let mut diagnostics = Diagnostics::new();
        let result = pipeline.execute_build_with(
            &mut f.program,
            &TacInterpreter::default(),
            &NoFrontend,
            &mut diagnostics,
        );

        let Err(error) = result else {
            panic!("injection without a front end must fail");
        };
        assert!(matches!(error, Error::Frontend(_)));
        let errors: Vec<&str> = diagnostics
            .of_kind(MessageType::Error)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(errors, vec![error.to_string().as_str()]);
        assert_eq!(pipeline.stats().errors, 1);
    }
}
