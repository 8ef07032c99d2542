use thiserror::Error;

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::NotImplemented {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::NotImplemented {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants split into three groups, following how the compilation phases treat them:
///
/// # Error Categories
///
/// ## Structural Errors
/// - [`Error::GraphError`] - Missing node or edge in a [`crate::utils::graph::DirectedGraph`]
/// - [`Error::SymbolError`] - Duplicate insert or missing lookup in a [`crate::symbols::SymbolTable`]
/// - [`Error::TypeMismatch`] - Operands or values of incompatible types
///
/// ## Invariant Violations
/// - [`Error::NotImplemented`] - An instruction shape or `(type, operator)` pair a pass does
///   not handle. These are defects, never user errors.
///
/// ## Staging Faults
/// - [`Error::StagingFault`] - Execution fault inside staged code
/// - [`Error::InstructionLimitExceeded`] / [`Error::CallDepthExceeded`] - Staging limits hit
/// - [`Error::AssertFailed`] - A staged `Assert` latched
/// - [`Error::Frontend`] - Injected source failed to parse or bind
///
/// # Examples
///
/// ```rust,ignore
/// use stagecraft::{Error, compiler::PassScheduler};
///
/// match scheduler.run(&mut program, &events) {
///     Ok(changes) => println!("{changes} rewrites"),
///     Err(Error::NotImplemented { message, file, line }) => {
///         eprintln!("optimizer defect: {message} ({file}:{line})");
///     }
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A pass or the executor met an instruction shape or operator it does not support.
    ///
    /// The source location where the case was detected is carried along for debugging.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the unsupported case
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Not implemented - {file}:{line}: {message}")]
    NotImplemented {
        /// The message to be printed for the NotImplemented error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Graph operation referenced a node or edge that does not exist.
    #[error("{0}")]
    GraphError(String),

    /// Symbol table insert collided with an existing name, or a lookup failed.
    #[error("{0}")]
    SymbolError(String),

    /// An instruction handle no longer refers to a live entry of its list.
    #[error("Instruction handle {0} is not part of this list")]
    InvalidHandle(String),

    /// Operand or value types did not line up.
    #[error("Type mismatch - expected {expected}, found {found}")]
    TypeMismatch {
        /// The type that was required
        expected: String,
        /// The type that was encountered
        found: String,
    },

    /// Staged code faulted while executing.
    ///
    /// Covers division by zero, out-of-range array access, unknown functions and
    /// malformed intrinsic arguments.
    #[error("Staging fault in {function}: {message}")]
    StagingFault {
        /// The function that was executing when the fault occurred
        function: String,
        /// Description of the fault
        message: String,
    },

    /// Staged execution ran past its instruction budget.
    #[error("Instruction limit exceeded - executed {executed}, limit {limit}")]
    InstructionLimitExceeded {
        /// Instructions executed so far
        executed: u64,
        /// Configured budget
        limit: u64,
    },

    /// Staged execution nested calls deeper than allowed.
    #[error("Call depth exceeded - depth {depth}, limit {limit}")]
    CallDepthExceeded {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        limit: usize,
    },

    /// A staged `Assert` evaluated to false.
    #[error("Build Assert Failed.")]
    AssertFailed,

    /// Source handed to the front end during staged execution was rejected.
    #[error("Front end rejected injected source - {0}")]
    Frontend(String),

    /// File I/O error from a staged file intrinsic.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
