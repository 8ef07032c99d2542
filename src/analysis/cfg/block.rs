//! Basic blocks over a [`TacList`].

use crate::{
    ir::{Tac, TacId, TacList},
    Result,
};

/// A straight-line run of instructions.
///
/// Blocks hold handles into the function's [`TacList`] rather than instructions,
/// so the same block can be inspected before and after the list is edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    instructions: Vec<TacId>,
    order: usize,
}

impl BasicBlock {
    /// Creates an empty block at stream position `order`.
    #[must_use]
    pub fn new(order: usize) -> Self {
        BasicBlock {
            instructions: Vec::new(),
            order,
        }
    }

    /// Position of the block in the original instruction stream.
    ///
    /// Merged blocks keep the smaller position of their parts, so sorting by order
    /// reproduces stream order.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Instruction handles in block order.
    #[must_use]
    pub fn instructions(&self) -> &[TacId] {
        &self.instructions
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` for a block without instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub(crate) fn push(&mut self, id: TacId) {
        self.instructions.push(id);
    }

    /// Resolves the instructions against `list`, skipping handles no longer live.
    pub fn tacs<'l>(&'l self, list: &'l TacList) -> impl Iterator<Item = (TacId, &'l Tac)> + 'l {
        self.instructions
            .iter()
            .filter_map(move |id| list.get(*id).map(|tac| (*id, tac)))
    }

    /// Concatenates `a` and `b`.
    ///
    /// A leading label of `b` is dropped, since `a` is its only predecessor. A
    /// trailing `goto L` of `a` is dropped as well and must jump to that label.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotImplemented`] if `a` ends in a `goto` that does not
    /// target the label opening `b`.
    pub fn merge(a: &BasicBlock, b: &BasicBlock, list: &TacList) -> Result<BasicBlock> {
        let last = a.instructions.last().and_then(|id| list.get(*id));
        let first = b.instructions.first().and_then(|id| list.get(*id));

        let head = match (last, first) {
            (Some(Tac::Goto(target)), Some(Tac::Label(label))) if target == label => {
                &a.instructions[..a.instructions.len() - 1]
            }
            (Some(Tac::Goto(target)), first) => {
                return Err(invariant_error!(
                    "goto {} merged with a block opening on {}",
                    target,
                    first.map_or_else(|| "nothing".to_string(), ToString::to_string)
                ));
            }
            _ => &a.instructions[..],
        };
        let tail = match first {
            Some(Tac::Label(_)) => &b.instructions[1..],
            _ => &b.instructions[..],
        };

        Ok(BasicBlock {
            instructions: head.iter().chain(tail).copied().collect(),
            order: a.order.min(b.order),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::LabelSymbol;

    #[test]
    fn test_merge_drops_jump_pair() {
        let l = LabelSymbol::new("$L0");
        let mut list = TacList::new();
        let nop = list.push_back(Tac::Nop);
        let goto = list.push_back(Tac::Goto(l.clone()));
        let label = list.push_back(Tac::Label(l));
        let ret = list.push_back(Tac::ReturnVoid);

        let mut a = BasicBlock::new(3);
        a.push(nop);
        a.push(goto);
        let mut b = BasicBlock::new(1);
        b.push(label);
        b.push(ret);

        let merged = BasicBlock::merge(&a, &b, &list).unwrap();
        assert_eq!(merged.instructions(), &[nop, ret]);
        assert_eq!(merged.order(), 1);
    }

    #[test]
    fn test_merge_drops_fallthrough_label() {
        let mut list = TacList::new();
        let nop = list.push_back(Tac::Nop);
        let label = list.push_back(Tac::Label(LabelSymbol::new("$L0")));
        let ret = list.push_back(Tac::ReturnVoid);

        let mut a = BasicBlock::new(0);
        a.push(nop);
        let mut b = BasicBlock::new(1);
        b.push(label);
        b.push(ret);

        let merged = BasicBlock::merge(&a, &b, &list).unwrap();
        assert_eq!(merged.instructions(), &[nop, ret]);
    }

    #[test]
    fn test_merge_rejects_mismatched_goto() {
        let mut list = TacList::new();
        let goto = list.push_back(Tac::Goto(LabelSymbol::new("$L0")));
        let label = list.push_back(Tac::Label(LabelSymbol::new("$L1")));
        let ret = list.push_back(Tac::ReturnVoid);

        let mut a = BasicBlock::new(0);
        a.push(goto);
        let mut b = BasicBlock::new(1);
        b.push(label);
        assert!(matches!(
            BasicBlock::merge(&a, &b, &list),
            Err(crate::Error::NotImplemented { .. })
        ));

        let mut c = BasicBlock::new(2);
        c.push(ret);
        assert!(BasicBlock::merge(&a, &c, &list).is_err());
    }
}
