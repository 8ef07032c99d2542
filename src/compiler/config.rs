//! Compiler configuration.
//!
//! [`CompilerConfig`] selects the entry function, the optimizer passes to run, how
//! many staging rounds to attempt and the backend the program is prepared for.
//! [`StagingLimits`] bounds the work a single staged invocation may do.

use strum::{Display, EnumIter, EnumString};

use crate::program::ENTRY_FUNCTION;

/// Backend the program is prepared for by the portability pre-pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum BackendTarget {
    /// Has out-parameters and static locals; nothing to rewrite
    #[default]
    Cpp,
    /// Has neither; statics are hoisted and out-parameters become extra return values
    Python,
}

impl BackendTarget {
    /// Returns `true` if the target passes arguments by reference.
    #[must_use]
    pub fn supports_out_parameters(self) -> bool {
        matches!(self, BackendTarget::Cpp)
    }

    /// Returns `true` if the target has function-local static storage.
    #[must_use]
    pub fn supports_static_locals(self) -> bool {
        matches!(self, BackendTarget::Cpp)
    }
}

/// Bounds on one staged invocation.
///
/// # Example
///
/// ```rust,ignore
/// use stagecraft::compiler::StagingLimits;
///
/// let limits = StagingLimits::new()
///     .with_max_instructions(100_000)
///     .with_max_call_depth(64);
/// ```
///
/// # Default Values
///
/// | Limit | Default Value |
/// |-------|---------------|
/// | `max_instructions` | 10,000,000 |
/// | `max_call_depth` | 1,000 |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagingLimits {
    /// Maximum instructions one invocation may execute.
    ///
    /// Set to 0 for unlimited execution.
    pub max_instructions: u64,

    /// Maximum depth of nested calls within one invocation.
    pub max_call_depth: usize,
}

impl Default for StagingLimits {
    fn default() -> Self {
        Self {
            max_instructions: 10_000_000,
            max_call_depth: 1000,
        }
    }
}

impl StagingLimits {
    /// Creates limits with the default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum instruction count (0 for unlimited).
    #[must_use]
    pub fn with_max_instructions(mut self, max: u64) -> Self {
        self.max_instructions = max;
        self
    }

    /// Sets the maximum call depth.
    #[must_use]
    pub fn with_max_call_depth(mut self, max: usize) -> Self {
        self.max_call_depth = max;
        self
    }
}

/// Configuration of a [`crate::compiler::Pipeline`].
///
/// # Default Values
///
/// | Setting | Default Value |
/// |---------|---------------|
/// | `entry` | `main` |
/// | `enable_*` | all `true` |
/// | `max_build_rounds` | 16 |
/// | `optimizer_rounds` | 1 |
/// | `limits` | [`StagingLimits::default`] |
/// | `target` | [`BackendTarget::Cpp`] |
#[derive(Clone, Debug)]
pub struct CompilerConfig {
    /// Name of the entry function.
    pub entry: String,
    /// Run local propagation.
    pub enable_propagation: bool,
    /// Run constant folding.
    pub enable_constant_folding: bool,
    /// Run dead-block elimination.
    pub enable_dead_block_elimination: bool,
    /// Run dead-code elimination.
    pub enable_dead_code_elimination: bool,
    /// Upper bound on staging rounds before giving up on a fixed point.
    pub max_build_rounds: usize,
    /// Times the optimizer pass sequence may run on one function.
    ///
    /// The default runs it once; larger values repeat it until a round changes
    /// nothing.
    pub optimizer_rounds: usize,
    /// Bounds on each staged invocation.
    pub limits: StagingLimits,
    /// Backend for the portability pre-pass.
    pub target: BackendTarget,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            entry: ENTRY_FUNCTION.to_string(),
            enable_propagation: true,
            enable_constant_folding: true,
            enable_dead_block_elimination: true,
            enable_dead_code_elimination: true,
            max_build_rounds: 16,
            optimizer_rounds: 1,
            limits: StagingLimits::default(),
            target: BackendTarget::default(),
        }
    }
}

impl CompilerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables all optimizer passes.
    #[must_use]
    pub fn without_optimizations(mut self) -> Self {
        self.enable_propagation = false;
        self.enable_constant_folding = false;
        self.enable_dead_block_elimination = false;
        self.enable_dead_code_elimination = false;
        self
    }

    /// Sets the entry function.
    #[must_use]
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    /// Enables or disables propagation.
    #[must_use]
    pub fn with_propagation(mut self, enabled: bool) -> Self {
        self.enable_propagation = enabled;
        self
    }

    /// Enables or disables constant folding.
    #[must_use]
    pub fn with_constant_folding(mut self, enabled: bool) -> Self {
        self.enable_constant_folding = enabled;
        self
    }

    /// Enables or disables dead-block elimination.
    #[must_use]
    pub fn with_dead_block_elimination(mut self, enabled: bool) -> Self {
        self.enable_dead_block_elimination = enabled;
        self
    }

    /// Enables or disables dead-code elimination.
    #[must_use]
    pub fn with_dead_code_elimination(mut self, enabled: bool) -> Self {
        self.enable_dead_code_elimination = enabled;
        self
    }

    /// Sets the staging round limit.
    #[must_use]
    pub fn with_max_build_rounds(mut self, rounds: usize) -> Self {
        self.max_build_rounds = rounds;
        self
    }

    /// Sets how often the optimizer sequence may repeat per function.
    #[must_use]
    pub fn with_optimizer_rounds(mut self, rounds: usize) -> Self {
        self.optimizer_rounds = rounds;
        self
    }

    /// Sets the staging limits.
    #[must_use]
    pub fn with_limits(mut self, limits: StagingLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the backend target.
    #[must_use]
    pub fn with_target(mut self, target: BackendTarget) -> Self {
        self.target = target;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.entry, "main");
        assert!(config.enable_propagation && config.enable_dead_code_elimination);
        assert_eq!(config.limits.max_call_depth, 1000);
        assert_eq!(config.target, BackendTarget::Cpp);
        assert_eq!(config.optimizer_rounds, 1);
    }

    #[test]
    fn test_builders() {
        let config = CompilerConfig::new()
            .without_optimizations()
            .with_constant_folding(true)
            .with_target(BackendTarget::Python)
            .with_limits(StagingLimits::new().with_max_instructions(50));

        assert!(!config.enable_propagation);
        assert!(config.enable_constant_folding);
        assert_eq!(config.limits.max_instructions, 50);
        assert!(!config.target.supports_out_parameters());
    }

    #[test]
    fn test_target_names() {
        assert_eq!(BackendTarget::Python.to_string(), "python");
        assert_eq!(BackendTarget::from_str("cpp").unwrap(), BackendTarget::Cpp);
    }
}
