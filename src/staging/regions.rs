//! Build region extraction.
//!
//! A build region is a span of a function bracketed by `BuildMark(Start, name)` and
//! `BuildMark(End, name)`. Before staged execution each span is lifted into a new
//! void, parameterless, build-only function called `name`:
//!
//! ```text
//! FunctionMark Start
//! <the span's instructions>
//! ReturnVoid
//! FunctionMark End
//! ```
//!
//! The new function shares the enclosing function's scope, so the lifted code
//! resolves the same locals. The marks stay where they are; the executor runs the
//! region function at the start mark and then deletes the span.

use crate::{
    compiler::{EventKind, EventLog},
    ir::{MarkOp, Tac, TacList},
    program::Program,
    symbols::{FunctionSymbol, TypeSymbol},
    Result,
};

/// A region found in a function body.
struct Region {
    name: String,
    position: usize,
    body: Vec<Tac>,
}

fn find_regions(tacs: &TacList) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut open: Option<Region> = None;

    for (position, tac) in tacs.tacs().enumerate() {
        let Tac::BuildMark { name, op } = tac else {
            if let Some(region) = open.as_mut() {
                region.body.push(tac.clone());
            }
            continue;
        };
        match (op, open.take()) {
            (MarkOp::Start, None) => {
                open = Some(Region {
                    name: name.clone(),
                    position,
                    body: Vec::new(),
                });
            }
            (MarkOp::End, Some(region)) if *name == region.name => regions.push(region),
            // Nested marks are flattened into the outer region.
            (_, region) => open = region,
        }
    }

    regions
}

/// Lifts every build region of `program` into its own function.
///
/// Regions whose function already exists are left alone, so running this twice
/// changes nothing.
///
/// # Returns
///
/// The number of functions created.
///
/// # Errors
///
/// Returns [`crate::Error::SymbolError`] if a region name collides with a symbol
/// that is not a function.
pub fn generate_build_regions(program: &mut Program, events: &EventLog) -> Result<usize> {
    let mut created = 0;

    for name in program.function_names() {
        let Some(function) = program.function(&name) else {
            continue;
        };
        let scope = function.scope;
        let regions = find_regions(&function.tacs);

        for region in regions {
            if program.find_function(&region.name).is_some() {
                continue;
            }

            let mut tacs = TacList::new();
            tacs.push_back(Tac::FunctionMark(MarkOp::Start));
            let inner = region.body.len();
            for tac in region.body {
                tacs.push_back(tac);
            }
            tacs.push_back(Tac::ReturnVoid);
            tacs.push_back(Tac::FunctionMark(MarkOp::End));

            let symbol = FunctionSymbol::new(region.name.clone(), TypeSymbol::VOID, vec![], true);
            program.declare_function_in(symbol, scope, tacs)?;
            created += 1;

            events
                .record(EventKind::RegionExtracted)
                .at(name.clone(), region.position)
                .message(format!("{} with {inner} instructions", region.name));
        }
    }

    Ok(created)
}
