//! Editable instruction streams.
//!
//! [`TacList`] is a doubly linked list stored in a slot vector. Every instruction
//! gets a [`TacId`] that stays valid until that instruction is removed, regardless of
//! insertions and removals elsewhere. Analyses record `TacId`s and passes edit
//! through them.
//!
//! # Editing while walking
//!
//! Read the successor with [`TacList::next`] before removing the current
//! instruction; the removed id no longer links anywhere.
//!
//! ```rust,ignore
//! let mut cursor = list.first();
//! while let Some(id) = cursor {
//!     cursor = list.next(id);
//!     if matches!(list.get(id), Some(Tac::Nop)) {
//!         list.remove(id);
//!     }
//! }
//! ```

use std::fmt;

use crate::{ir::Tac, Error, Result};

/// Stable handle to one instruction of a [`TacList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TacId(usize);

impl TacId {
    /// Returns the slot index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TacId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    tac: Tac,
    prev: Option<TacId>,
    next: Option<TacId>,
}

/// An ordered instruction stream with stable handles.
#[derive(Debug, Clone, Default)]
pub struct TacList {
    slots: Vec<Option<Slot>>,
    head: Option<TacId>,
    tail: Option<TacId>,
    len: usize,
}

impl TacList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `id` refers to a live instruction.
    #[must_use]
    pub fn contains(&self, id: TacId) -> bool {
        self.slot(id).is_some()
    }

    /// Returns the instruction behind `id`.
    #[must_use]
    pub fn get(&self, id: TacId) -> Option<&Tac> {
        self.slot(id).map(|s| &s.tac)
    }

    /// Returns the first instruction's handle.
    #[must_use]
    pub fn first(&self) -> Option<TacId> {
        self.head
    }

    /// Returns the last instruction's handle.
    #[must_use]
    pub fn last(&self) -> Option<TacId> {
        self.tail
    }

    /// Returns the handle following `id`.
    #[must_use]
    pub fn next(&self, id: TacId) -> Option<TacId> {
        self.slot(id).and_then(|s| s.next)
    }

    /// Returns the handle preceding `id`.
    #[must_use]
    pub fn prev(&self, id: TacId) -> Option<TacId> {
        self.slot(id).and_then(|s| s.prev)
    }

    /// Appends `tac`.
    pub fn push_back(&mut self, tac: Tac) -> TacId {
        let id = self.alloc(tac, self.tail, None);
        match self.tail {
            Some(tail) => self.link_mut(tail).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// Prepends `tac`.
    pub fn push_front(&mut self, tac: Tac) -> TacId {
        let id = self.alloc(tac, None, self.head);
        match self.head {
            Some(head) => self.link_mut(head).prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        id
    }

    /// Inserts `tac` directly before `at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] if `at` is not live.
    pub fn insert_before(&mut self, at: TacId, tac: Tac) -> Result<TacId> {
        let prev = self.live(at)?.prev;
        let Some(prev) = prev else {
            return Ok(self.push_front(tac));
        };
        let id = self.alloc(tac, Some(prev), Some(at));
        self.link_mut(prev).next = Some(id);
        self.link_mut(at).prev = Some(id);
        Ok(id)
    }

    /// Inserts `tac` directly after `at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] if `at` is not live.
    pub fn insert_after(&mut self, at: TacId, tac: Tac) -> Result<TacId> {
        let next = self.live(at)?.next;
        let Some(next) = next else {
            return Ok(self.push_back(tac));
        };
        let id = self.alloc(tac, Some(at), Some(next));
        self.link_mut(at).next = Some(id);
        self.link_mut(next).prev = Some(id);
        Ok(id)
    }

    /// Replaces the instruction behind `id`, returning the old one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] if `id` is not live.
    pub fn replace(&mut self, id: TacId, tac: Tac) -> Result<Tac> {
        let slot = self
            .slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::InvalidHandle(id.to_string()))?;
        Ok(std::mem::replace(&mut slot.tac, tac))
    }

    /// Unlinks and returns the instruction behind `id`.
    pub fn remove(&mut self, id: TacId) -> Option<Tac> {
        let slot = self.slots.get_mut(id.0)?.take()?;
        match slot.prev {
            Some(prev) => self.link_mut(prev).next = slot.next,
            None => self.head = slot.next,
        }
        match slot.next {
            Some(next) => self.link_mut(next).prev = slot.prev,
            None => self.tail = slot.prev,
        }
        self.len -= 1;
        Some(slot.tac)
    }

    /// Removes every instruction, invalidating all handles.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates `(handle, instruction)` pairs in stream order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Returns a snapshot of all handles in stream order.
    #[must_use]
    pub fn ids(&self) -> Vec<TacId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Iterates the instructions in stream order.
    pub fn tacs(&self) -> impl Iterator<Item = &Tac> + '_ {
        self.iter().map(|(_, tac)| tac)
    }

    /// Builds a fresh list from the instructions behind `ids`, in the given order.
    ///
    /// Handles into the new list are unrelated to the handles of `self`.
    #[must_use]
    pub fn select(&self, ids: &[TacId]) -> TacList {
        ids.iter().filter_map(|id| self.get(*id).cloned()).collect()
    }

    fn slot(&self, id: TacId) -> Option<&Slot> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn live(&self, id: TacId) -> Result<&Slot> {
        self.slot(id)
            .ok_or_else(|| Error::InvalidHandle(id.to_string()))
    }

    // Neighbours of a live slot are live by construction.
    fn link_mut(&mut self, id: TacId) -> &mut Slot {
        match self.slots.get_mut(id.0).and_then(Option::as_mut) {
            Some(slot) => slot,
            None => unreachable!("linked slot {id} is not live"),
        }
    }

    fn alloc(&mut self, tac: Tac, prev: Option<TacId>, next: Option<TacId>) -> TacId {
        let id = TacId(self.slots.len());
        self.slots.push(Some(Slot { tac, prev, next }));
        self.len += 1;
        id
    }
}

/// Iterator over a [`TacList`] in stream order.
pub struct Iter<'a> {
    list: &'a TacList,
    cursor: Option<TacId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (TacId, &'a Tac);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let slot = self.list.slot(id)?;
        self.cursor = slot.next;
        Some((id, &slot.tac))
    }
}

impl<'a> IntoIterator for &'a TacList {
    type Item = (TacId, &'a Tac);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Tac> for TacList {
    fn from_iter<I: IntoIterator<Item = Tac>>(iter: I) -> Self {
        let mut list = TacList::new();
        list.extend(iter);
        list
    }
}

impl Extend<Tac> for TacList {
    fn extend<I: IntoIterator<Item = Tac>>(&mut self, iter: I) {
        for tac in iter {
            self.push_back(tac);
        }
    }
}

impl fmt::Display for TacList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tac in self.tacs() {
            writeln!(f, "{tac}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::MarkOp,
        symbols::LabelSymbol,
    };

    fn label(name: &str) -> Tac {
        Tac::Label(LabelSymbol::new(name))
    }

    fn names(list: &TacList) -> Vec<String> {
        list.tacs().map(ToString::to_string).collect()
    }

    #[test]
    fn test_push_and_iterate() {
        let mut list = TacList::new();
        let b = list.push_back(label("b"));
        list.push_front(label("a"));
        list.push_back(label("c"));

        assert_eq!(list.len(), 3);
        assert_eq!(names(&list), vec!["LabelTac: a", "LabelTac: b", "LabelTac: c"]);
        assert_eq!(list.get(b), Some(&label("b")));
    }

    #[test]
    fn test_insert_relative() {
        let mut list: TacList = [label("a"), label("c")].into_iter().collect();
        let ids = list.ids();
        list.insert_after(ids[0], label("b")).unwrap();
        list.insert_before(ids[0], label("start")).unwrap();
        list.insert_after(ids[1], label("end")).unwrap();

        assert_eq!(
            names(&list),
            vec![
                "LabelTac: start",
                "LabelTac: a",
                "LabelTac: b",
                "LabelTac: c",
                "LabelTac: end"
            ]
        );
    }

    #[test]
    fn test_remove_while_walking() {
        let mut list: TacList = [Tac::Nop, label("a"), Tac::Nop, Tac::Nop, label("b"), Tac::Nop]
            .into_iter()
            .collect();

        let mut cursor = list.first();
        while let Some(id) = cursor {
            cursor = list.next(id);
            if matches!(list.get(id), Some(Tac::Nop)) {
                list.remove(id);
            }
        }

        assert_eq!(names(&list), vec!["LabelTac: a", "LabelTac: b"]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(list.first().unwrap()), Some(&label("a")));
        assert_eq!(list.get(list.last().unwrap()), Some(&label("b")));
    }

    #[test]
    fn test_stale_handles() {
        let mut list = TacList::new();
        let id = list.push_back(Tac::FunctionMark(MarkOp::Start));
        assert_eq!(list.remove(id), Some(Tac::FunctionMark(MarkOp::Start)));
        assert!(list.remove(id).is_none());
        assert!(list.insert_before(id, Tac::Nop).is_err());
        assert!(list.replace(id, Tac::Nop).is_err());
        assert!(list.is_empty());
        assert!(list.first().is_none());
    }

    #[test]
    fn test_replace_and_select() {
        let mut list: TacList = [label("a"), label("b"), label("c")].into_iter().collect();
        let ids = list.ids();
        let old = list.replace(ids[1], Tac::Nop).unwrap();
        assert_eq!(old, label("b"));

        let picked = list.select(&[ids[2], ids[0]]);
        assert_eq!(names(&picked), vec!["LabelTac: c", "LabelTac: a"]);
    }
}
