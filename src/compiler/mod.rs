//! Optimizer passes, event journaling, configuration and the phase driver.
//!
//! This module sits between the analyses and the backends:
//!
//! - [`crate::analysis`] - CFG, def-use graph, value numbering, call graph
//! - [`compiler`](self) - optimizer passes and the [`Pipeline`]
//! - [`crate::staging`] - staged execution driven by [`Pipeline::execute_build`]
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Pipeline                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  CompilerConfig           entry, enabled passes, limits,     │
//! │                           backend target                     │
//! │                                                              │
//! │  PassScheduler            fixpoint over the enabled passes   │
//! │    ├─ PropagationPass                                        │
//! │    ├─ ConstantFoldingPass                                    │
//! │    ├─ DeadBlockEliminationPass                               │
//! │    └─ DeadCodeEliminationPass                                │
//! │                                                              │
//! │  TacPass trait            one function at a time             │
//! │                                                              │
//! │  EventLog                 append-only journal of rewrites    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use stagecraft::compiler::{CompilerConfig, EventLog, PassScheduler};
//!
//! let config = CompilerConfig::new().with_dead_code_elimination(false);
//! let events = EventLog::new();
//! PassScheduler::from_config(&config).run(&mut program, &events)?;
//! println!("{}", events.summary());
//! ```

mod config;
mod events;
mod pass;
pub mod passes;
mod pipeline;
mod prune;
mod scheduler;

pub use config::{BackendTarget, CompilerConfig, StagingLimits};
pub use events::{DerivedStats, Event, EventBuilder, EventKind, EventLog};
pub use pass::TacPass;
pub use passes::{
    ConstantFoldingPass, DeadBlockEliminationPass, DeadCodeEliminationPass, PropagationPass,
};
pub use pipeline::Pipeline;
pub use prune::prune_build_symbols;
pub use scheduler::PassScheduler;
