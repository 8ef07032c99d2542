//! Event journaling for the compiler phases.
//!
//! Every rewrite an optimizer pass or the staging engine performs is recorded as an
//! [`Event`]. The log is append-only and can be shared by reference: recording takes
//! `&self`, so a pass can log while it holds the program mutably.
//!
//! # Architecture
//!
//! - [`Event`] - one recorded event (a rewrite, an engine step or a diagnostic)
//! - [`EventLog`] - the collection, with queries and a summary
//! - [`EventBuilder`] - fluent construction, recorded when dropped
//! - [`DerivedStats`] - counters computed from a log
//!
//! # Example
//!
//! ```rust,ignore
//! use stagecraft::compiler::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::ConstantFolded)
//!     .at("main", 3)
//!     .message("x = 2 Add 3 -> x = 5");
//! log.info("Starting pass: propagation");
//!
//! println!("{}", log.summary());
//! ```

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use strum::{Display, EnumIter, IntoStaticStr};

/// Categories of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum EventKind {
    /// An operand was replaced by the value assigned to it earlier in the block.
    #[strum(serialize = "operand propagated")]
    OperandPropagated,
    /// An operation over literals was replaced by its result.
    #[strum(serialize = "constant folded")]
    ConstantFolded,
    /// A conditional jump on a literal became a jump or disappeared.
    #[strum(serialize = "branch simplified")]
    BranchSimplified,
    /// An unreachable basic block was dropped.
    #[strum(serialize = "block removed")]
    BlockRemoved,
    /// An instruction was removed.
    #[strum(serialize = "instruction removed")]
    InstructionRemoved,
    /// A build call was executed and replaced by its result.
    #[strum(serialize = "build call executed")]
    BuildCallExecuted,
    /// A build region was executed and removed.
    #[strum(serialize = "region executed")]
    RegionExecuted,
    /// A build region was lifted into its own function.
    #[strum(serialize = "region extracted")]
    RegionExtracted,
    /// Staged code injected instructions into a function.
    #[strum(serialize = "source injected")]
    SourceInjected,
    /// Staged code created a new function.
    #[strum(serialize = "function created")]
    FunctionCreated,
    /// A static local was moved to the global scope.
    #[strum(serialize = "static hoisted")]
    StaticHoisted,
    /// Out-parameters were turned into extra return values.
    #[strum(serialize = "out params rewritten")]
    OutParamsRewritten,
    /// A build-only symbol was removed before code generation.
    #[strum(serialize = "symbol pruned")]
    SymbolPruned,

    /// A pass started on a function.
    #[strum(serialize = "pass started")]
    PassStarted,
    /// A pass finished on a function.
    #[strum(serialize = "pass completed")]
    PassCompleted,
    /// A staging round finished.
    #[strum(serialize = "round completed")]
    RoundCompleted,

    /// Informational message.
    #[strum(serialize = "info")]
    Info,
    /// Something unexpected but recoverable.
    #[strum(serialize = "warning")]
    Warning,
    /// Something failed.
    #[strum(serialize = "error")]
    Error,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        (*self).into()
    }

    /// Returns `true` if this event represents a program rewrite.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Self::OperandPropagated
                | Self::ConstantFolded
                | Self::BranchSimplified
                | Self::BlockRemoved
                | Self::InstructionRemoved
                | Self::BuildCallExecuted
                | Self::RegionExecuted
                | Self::RegionExtracted
                | Self::SourceInjected
                | Self::FunctionCreated
                | Self::StaticHoisted
                | Self::OutParamsRewritten
                | Self::SymbolPruned
        )
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event
    pub kind: EventKind,
    /// The function where the event occurred
    pub function: Option<String>,
    /// Instruction position within the function
    pub location: Option<usize>,
    /// Human-readable description
    pub message: String,
    /// Pass that produced the event
    pub pass: Option<String>,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            function: None,
            location: None,
            message: message.into(),
            pass: None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.kind)?;
        if let Some(function) = &self.function {
            match self.location {
                Some(location) => write!(f, "{function}@{location}: ")?,
                None => write!(f, "{function}: ")?,
            }
        }
        f.write_str(&self.message)
    }
}

/// Builder for events, created by [`EventLog::record`].
///
/// The event is added to the log when the builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    function: Option<String>,
    location: Option<usize>,
    message: Option<String>,
    pass: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            function: None,
            location: None,
            message: None,
            pass: None,
        }
    }

    /// Sets the function and instruction position.
    pub fn at(mut self, function: impl Into<String>, location: usize) -> Self {
        self.function = Some(function.into());
        self.location = Some(location);
        self
    }

    /// Sets only the function.
    pub fn function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Sets only the instruction position.
    pub fn location(mut self, location: usize) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets the message; defaults to the kind's description.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates the event with a pass.
    pub fn pass(mut self, pass_name: impl Into<String>) -> Self {
        self.pass = Some(pass_name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            function: self.function.take(),
            location: self.location.take(),
            message,
            pass: self.pass.take(),
        });
    }
}

/// Append-only collection of events.
///
/// Statistics are derived from the events rather than tracked separately.
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let log = Self::new();
        for event in self.iter() {
            log.events.push(event.clone());
        }
        log
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Returns `true` if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building an event of the given kind.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Info, message));
    }

    /// Records a warning.
    pub fn warn(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Warning, message));
    }

    /// Records an error.
    pub fn error(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Error, message));
    }

    /// Returns `true` if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|(_, e)| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(_, e)| e.kind == kind).count()
    }

    /// Iterates all events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for event in self.iter() {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the number of distinct functions with events.
    #[must_use]
    pub fn functions_affected(&self) -> usize {
        self.iter()
            .filter_map(|e| e.function.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Summarizes the transformation counts, e.g. `2 constant folded, 1 block removed`.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let mut parts: Vec<String> = self
            .count_by_kind()
            .iter()
            .filter(|(k, _)| k.is_transformation())
            .map(|(kind, count)| format!("{count} {kind}"))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.sort();
        parts.join(", ")
    }
}

/// Counters computed from an [`EventLog`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedStats {
    /// Functions with at least one event
    pub functions_transformed: usize,
    /// Operands replaced by propagation
    pub operands_propagated: usize,
    /// Operations folded to literals
    pub constants_folded: usize,
    /// Conditionals simplified
    pub branches_simplified: usize,
    /// Blocks dropped as unreachable
    pub blocks_removed: usize,
    /// Instructions removed
    pub instructions_removed: usize,
    /// Build calls executed
    pub build_calls_executed: usize,
    /// Build regions executed
    pub regions_executed: usize,
    /// Injections performed by staged code
    pub sources_injected: usize,
    /// Functions created by staged code
    pub functions_created: usize,
    /// Build-only symbols pruned
    pub symbols_pruned: usize,
    /// Warnings
    pub warnings: usize,
    /// Errors
    pub errors: usize,
}

impl DerivedStats {
    /// Computes the counters from `log`.
    #[must_use]
    pub fn from_log(log: &EventLog) -> Self {
        let counts = log.count_by_kind();
        let get = |kind: EventKind| counts.get(&kind).copied().unwrap_or(0);

        Self {
            functions_transformed: log.functions_affected(),
            operands_propagated: get(EventKind::OperandPropagated),
            constants_folded: get(EventKind::ConstantFolded),
            branches_simplified: get(EventKind::BranchSimplified),
            blocks_removed: get(EventKind::BlockRemoved),
            instructions_removed: get(EventKind::InstructionRemoved),
            build_calls_executed: get(EventKind::BuildCallExecuted),
            regions_executed: get(EventKind::RegionExecuted),
            sources_injected: get(EventKind::SourceInjected),
            functions_created: get(EventKind::FunctionCreated),
            symbols_pruned: get(EventKind::SymbolPruned),
            warnings: get(EventKind::Warning),
            errors: get(EventKind::Error),
        }
    }

    /// Returns `true` if nothing was rewritten.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operands_propagated == 0
            && self.constants_folded == 0
            && self.branches_simplified == 0
            && self.blocks_removed == 0
            && self.instructions_removed == 0
            && self.build_calls_executed == 0
            && self.regions_executed == 0
    }
}

impl fmt::Display for DerivedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let mut add = |count: usize, what: &str| {
            if count > 0 {
                parts.push(format!("{count} {what}"));
            }
        };
        add(self.functions_transformed, "functions");
        add(self.build_calls_executed, "build calls");
        add(self.regions_executed, "regions");
        add(self.constants_folded, "folded");
        add(self.operands_propagated, "propagated");
        add(self.branches_simplified, "branches");
        add(self.blocks_removed, "blocks removed");
        add(self.instructions_removed, "instructions removed");
        add(self.warnings, "warnings");
        add(self.errors, "errors");

        if parts.is_empty() {
            f.write_str("no changes")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}
