//! Def-use graph over a function body.
//!
//! [`DefUseGraph`] maps every data symbol to the instructions reading it and the
//! instructions writing it. Symbols visible to the function are seeded up front, so a
//! declared-but-untouched local still shows up with empty reader and writer lists.
//!
//! # Basic Usage
//!
//! ```rust,ignore
//! use stagecraft::analysis::DefUseGraph;
//!
//! let graph = DefUseGraph::build(function, &program.symbols);
//! for (symbol, uses) in graph.iter() {
//!     if uses.readers.is_empty() && !uses.writers.is_empty() {
//!         println!("{symbol} is written but never read");
//!     }
//! }
//! ```

use std::collections::HashMap;

use crate::{
    ir::{Tac, TacId},
    program::SourceFunction,
    symbols::{DataSymbol, SymbolTable},
};

/// Readers and writers of one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataUse {
    /// Instructions reading the symbol, in stream order
    pub readers: Vec<TacId>,
    /// Instructions writing the symbol, in stream order
    pub writers: Vec<TacId>,
}

impl DataUse {
    /// Returns `true` if nothing reads or writes the symbol.
    #[must_use]
    pub fn is_unused(&self) -> bool {
        self.readers.is_empty() && self.writers.is_empty()
    }
}

/// Symbol to readers/writers mapping for one function.
///
/// Iteration follows insertion order: seeded symbols first, then symbols first seen
/// in the instruction stream.
#[derive(Debug, Clone, Default)]
pub struct DefUseGraph {
    index: HashMap<DataSymbol, usize>,
    entries: Vec<(DataSymbol, DataUse)>,
}

impl DefUseGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph for `function`.
    ///
    /// Seeds the data symbols and literals of the function's scope and every scope
    /// nested in it, then those of the enclosing scopes, then records each
    /// instruction of the body.
    #[must_use]
    pub fn build(function: &SourceFunction, symbols: &SymbolTable) -> Self {
        let mut graph = DefUseGraph::new();

        let inner = symbols.traverse(function.scope);
        let outer = symbols.ancestors(function.scope).into_iter().skip(1);
        for scope in inner.into_iter().chain(outer) {
            for data in symbols.data(scope) {
                graph.seed(data.clone());
            }
            for literal in symbols.literals(scope) {
                graph.seed(DataSymbol::Literal(literal.clone()));
            }
        }

        for (id, tac) in function.tacs.iter() {
            graph.add(id, tac);
        }
        graph
    }

    /// Ensures `symbol` has an entry.
    pub fn seed(&mut self, symbol: DataSymbol) {
        self.entry(symbol);
    }

    /// Records the reads and writes of instruction `id`.
    pub fn add(&mut self, id: TacId, tac: &Tac) {
        for symbol in tac.reads() {
            self.entry(symbol).readers.push(id);
        }
        for symbol in tac.writes() {
            self.entry(symbol).writers.push(id);
        }
    }

    /// Forgets the reads and writes of instruction `id`.
    pub fn remove(&mut self, id: TacId, tac: &Tac) {
        for symbol in tac.reads() {
            if let Some(uses) = self.get_mut(&symbol) {
                uses.readers.retain(|r| *r != id);
            }
        }
        for symbol in tac.writes() {
            if let Some(uses) = self.get_mut(&symbol) {
                uses.writers.retain(|w| *w != id);
            }
        }
    }

    /// Returns the uses of `symbol`.
    #[must_use]
    pub fn get(&self, symbol: &DataSymbol) -> Option<&DataUse> {
        self.index.get(symbol).map(|i| &self.entries[*i].1)
    }

    /// Returns the readers of `symbol`.
    #[must_use]
    pub fn readers(&self, symbol: &DataSymbol) -> &[TacId] {
        self.get(symbol).map_or(&[][..], |u| u.readers.as_slice())
    }

    /// Returns the writers of `symbol`.
    #[must_use]
    pub fn writers(&self, symbol: &DataSymbol) -> &[TacId] {
        self.get(symbol).map_or(&[][..], |u| u.writers.as_slice())
    }

    /// Returns `true` if nothing reads or writes `symbol`.
    #[must_use]
    pub fn is_unused(&self, symbol: &DataSymbol) -> bool {
        self.readers(symbol).is_empty() && self.writers(symbol).is_empty()
    }

    /// Iterates all symbols with their uses.
    pub fn iter(&self) -> impl Iterator<Item = (&DataSymbol, &DataUse)> + '_ {
        self.entries.iter().map(|(s, u)| (s, u))
    }

    /// Returns the number of tracked symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no symbol is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&mut self, symbol: DataSymbol) -> &mut DataUse {
        let index = match self.index.get(&symbol) {
            Some(i) => *i,
            None => {
                let i = self.entries.len();
                self.index.insert(symbol.clone(), i);
                self.entries.push((symbol, DataUse::default()));
                i
            }
        };
        &mut self.entries[index].1
    }

    fn get_mut(&mut self, symbol: &DataSymbol) -> Option<&mut DataUse> {
        let index = *self.index.get(symbol)?;
        Some(&mut self.entries[index].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ir::BinaryOp, symbols::TypeSymbol, test::Fixture};

    #[test]
    fn test_readers_and_writers() {
        let mut f = Fixture::new("main");
        let x = f.local("x", TypeSymbol::I32);
        let y = f.local("y", TypeSymbol::I32);
        let unused = f.local("unused", TypeSymbol::I32);
        let one = f.int(1);

        let w = f.push(Tac::assign(x.clone(), one.clone()));
        let r = f.push(Tac::Binary {
            op: BinaryOp::Add,
            result: y.clone(),
            lhs: x.clone(),
            rhs: one.clone(),
        });
        f.push(Tac::Return(y.clone()));

        let graph = DefUseGraph::build(f.function(), &f.program.symbols);
        assert_eq!(graph.writers(&x), &[w]);
        assert_eq!(graph.readers(&x), &[r]);
        assert_eq!(graph.readers(&one).len(), 2);
        assert!(graph.get(&unused).is_some());
        assert!(graph.is_unused(&unused));
        assert!(!graph.is_unused(&y));
    }

    #[test]
    fn test_written_but_unread_is_used() {
        let mut f = Fixture::new("main");
        let x = f.local("x", TypeSymbol::I32);
        let one = f.int(1);
        let w = f.push(Tac::assign(x.clone(), one));

        let graph = DefUseGraph::build(f.function(), &f.program.symbols);
        assert_eq!(graph.writers(&x), &[w]);
        assert!(graph.readers(&x).is_empty());
        assert!(!graph.is_unused(&x));
        assert!(!graph.get(&x).unwrap().is_unused());
    }

    #[test]
    fn test_seeds_enclosing_scopes() {
        let mut f = Fixture::new("main");
        let root = f.program.symbols.root();
        f.program
            .local(root, "global", TypeSymbol::STR)
            .unwrap();

        let graph = DefUseGraph::build(f.function(), &f.program.symbols);
        assert!(graph
            .get(&DataSymbol::local("global", TypeSymbol::STR))
            .is_some());
        // The canonical booleans of the global scope are seeded too.
        assert!(graph.len() >= 3);
    }

    #[test]
    fn test_remove_instruction() {
        let mut f = Fixture::new("main");
        let x = f.local("x", TypeSymbol::I32);
        let one = f.int(1);
        let tac = Tac::assign(x.clone(), one);
        let id = f.push(tac.clone());

        let mut graph = DefUseGraph::build(f.function(), &f.program.symbols);
        graph.remove(id, &tac);
        assert!(graph.writers(&x).is_empty());
    }
}
