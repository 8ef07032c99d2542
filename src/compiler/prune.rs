//! Removal of build-only symbols after staged execution.
//!
//! Once staging has finished, build functions, build regions and everything
//! declared inside build code are dead weight: no backend can render them. This
//! pass deletes the bodies of build functions and then drops every build-tagged
//! function, type, local and label from every scope.

use crate::{
    compiler::{EventKind, EventLog},
    program::Program,
    symbols::Symbol,
    Result,
};

fn is_build_symbol(symbol: &Symbol) -> bool {
    match symbol {
        Symbol::Function(f) => f.is_build,
        Symbol::Type(t) => t.is_build(),
        Symbol::Data(d) => d.is_build(),
        Symbol::Label(l) => l.is_build,
        Symbol::Literal(_) => false,
    }
}

/// Removes build-only functions and symbols from `program`.
///
/// # Returns
///
/// The number of symbols removed, function bodies included.
///
/// # Errors
///
/// Returns [`crate::Error::SymbolError`] if a build function vanishes while it is
/// being removed.
pub fn prune_build_symbols(program: &mut Program, events: &EventLog) -> Result<usize> {
    let mut pruned = 0;

    let build_functions: Vec<String> = program
        .functions()
        .filter(|f| f.is_build())
        .map(|f| f.name().to_string())
        .collect();
    for name in build_functions {
        let removed = program.remove_function(&name)?;
        events
            .record(EventKind::SymbolPruned)
            .function(name)
            .message(format!("function body, {} instructions", removed.tacs.len()));
        pruned += 1;
    }

    let root = program.symbols.root();
    for scope in program.symbols.traverse(root) {
        for symbol in program.symbols.retain(scope, |s| !is_build_symbol(s)) {
            events
                .record(EventKind::SymbolPruned)
                .message(format!("{} {}", symbol.kind(), symbol.name()));
            pruned += 1;
        }
    }

    Ok(pruned)
}
