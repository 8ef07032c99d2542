//! Local value numbering within one basic block.
//!
//! Every write to a symbol starts a new *generation* of that symbol. Each read is
//! resolved to the latest write of the symbol earlier in the block, or to "defined
//! before the block" when there is none. Propagation uses the resolution to find the
//! assignment that produced an operand, and the generations to check that the
//! assignment's own operands still hold the same values at the use.

use std::collections::HashMap;

use crate::{
    ir::{TacId, TacList},
    symbols::DataSymbol,
};

/// A resolved read: the symbol and the block position of its defining write.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Read {
    symbol: DataSymbol,
    writer: Option<usize>,
}

/// Value numbers of one basic block.
#[derive(Debug, Clone, Default)]
pub struct LocalValueNumbering {
    order: Vec<TacId>,
    positions: HashMap<TacId, usize>,
    writes: HashMap<DataSymbol, Vec<usize>>,
    reads: HashMap<TacId, Vec<Read>>,
}

impl LocalValueNumbering {
    /// Numbers the instructions `block` of `list`, in order.
    ///
    /// Handles that are no longer live in `list` are skipped.
    #[must_use]
    pub fn build(list: &TacList, block: &[TacId]) -> Self {
        let mut lvn = LocalValueNumbering::default();

        for &id in block {
            let Some(tac) = list.get(id) else {
                continue;
            };
            let position = lvn.order.len();
            lvn.order.push(id);
            lvn.positions.insert(id, position);

            let reads = tac
                .reads()
                .into_iter()
                .map(|symbol| {
                    let writer = lvn.writes.get(&symbol).and_then(|w| w.last()).copied();
                    Read { symbol, writer }
                })
                .collect();
            lvn.reads.insert(id, reads);

            for symbol in tac.writes() {
                lvn.writes.entry(symbol).or_default().push(position);
            }
        }
        lvn
    }

    /// Returns the generation of `symbol` just before instruction `at` executes:
    /// the number of writes to it earlier in the block.
    #[must_use]
    pub fn generation(&self, symbol: &DataSymbol, at: TacId) -> usize {
        let Some(&position) = self.positions.get(&at) else {
            return 0;
        };
        self.writes
            .get(symbol)
            .map_or(0, |w| w.iter().filter(|p| **p < position).count())
    }

    /// Returns the in-block instruction that wrote the value `id` reads from `symbol`.
    #[must_use]
    pub fn writer_of(&self, id: TacId, symbol: &DataSymbol) -> Option<TacId> {
        self.reads
            .get(&id)?
            .iter()
            .find(|r| &r.symbol == symbol)
            .and_then(|r| r.writer)
            .map(|p| self.order[p])
    }

    /// Returns the distinct in-block writers of the operands of `id`.
    #[must_use]
    pub fn operand_writers(&self, id: TacId) -> Vec<TacId> {
        let mut out: Vec<TacId> = Vec::new();
        if let Some(reads) = self.reads.get(&id) {
            for read in reads {
                if let Some(writer) = read.writer.map(|p| self.order[p]) {
                    if !out.contains(&writer) {
                        out.push(writer);
                    }
                }
            }
        }
        out
    }

    /// Returns `true` if no instruction strictly between `from` and `to` writes
    /// `symbol`.
    #[must_use]
    pub fn unchanged_between(&self, symbol: &DataSymbol, from: TacId, to: TacId) -> bool {
        let (Some(&start), Some(&end)) = (self.positions.get(&from), self.positions.get(&to))
        else {
            return false;
        };
        self.writes
            .get(symbol)
            .is_none_or(|w| !w.iter().any(|p| start < *p && *p < end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ir::Tac, symbols::TypeSymbol, test::Fixture};

    #[test]
    fn test_reads_resolve_to_latest_write() {
        let mut f = Fixture::new("main");
        let x = f.local("x", TypeSymbol::I32);
        let y = f.local("y", TypeSymbol::I32);
        let one = f.int(1);
        let two = f.int(2);

        let w1 = f.push(Tac::assign(x.clone(), one));
        let r1 = f.push(Tac::assign(y.clone(), x.clone()));
        let w2 = f.push(Tac::assign(x.clone(), two));
        let r2 = f.push(Tac::Return(x.clone()));

        let block = f.tacs().ids();
        let lvn = LocalValueNumbering::build(f.tacs(), &block);

        assert_eq!(lvn.writer_of(r1, &x), Some(w1));
        assert_eq!(lvn.writer_of(r2, &x), Some(w2));
        assert_eq!(lvn.operand_writers(r2), vec![w2]);
        assert_eq!(lvn.generation(&x, w1), 0);
        assert_eq!(lvn.generation(&x, r2), 2);
        assert!(lvn.operand_writers(w1).is_empty());
    }

    #[test]
    fn test_unchanged_between() {
        let mut f = Fixture::new("main");
        let a = f.local("a", TypeSymbol::I32);
        let b = f.local("b", TypeSymbol::I32);
        let c = f.local("c", TypeSymbol::I32);
        let five = f.int(5);

        let copy = f.push(Tac::assign(b.clone(), a.clone()));
        let clobber = f.push(Tac::assign(a.clone(), five));
        let use_b = f.push(Tac::assign(c, b.clone()));

        let block = f.tacs().ids();
        let lvn = LocalValueNumbering::build(f.tacs(), &block);

        assert!(!lvn.unchanged_between(&a, copy, use_b));
        assert!(lvn.unchanged_between(&a, copy, clobber));
        assert!(lvn.unchanged_between(&b, copy, use_b));
    }
}
