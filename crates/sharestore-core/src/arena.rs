//! Clause arena — owned clause copies behind explicit handles
//!
//! `Clause::copy` places a deep copy here instead of handing out ad hoc heap
//! allocations. Each copy is addressed by an [`ArenaSlot`]; freed slots are
//! reused, and a generation counter makes stale handles resolve to `None`
//! instead of aliasing the clause that reused the slot.

use crate::clause::{Clause, OwnedClause};

/// Handle to a clause copy stored in a [`ClauseArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaSlot {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    clause: Option<OwnedClause>,
}

/// Slab of owned clause copies.
#[derive(Debug, Default)]
pub struct ClauseArena {
    entries: Vec<Entry>,
    free: Vec<u32>,
    live: usize,
    live_ints: usize,
}

impl ClauseArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep-copy `clause` into the arena.
    pub fn allocate(&mut self, clause: &Clause<'_>) -> ArenaSlot {
        let owned = clause.to_owned_clause();
        self.live += 1;
        self.live_ints += owned.len();

        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.clause = Some(owned);
            return ArenaSlot { index, generation: entry.generation };
        }

        let index = self.entries.len() as u32;
        self.entries.push(Entry { generation: 0, clause: Some(owned) });
        ArenaSlot { index, generation: 0 }
    }

    /// Release a copy. Returns the clause if the handle was still live.
    pub fn deallocate(&mut self, slot: ArenaSlot) -> Option<OwnedClause> {
        let entry = self.entries.get_mut(slot.index as usize)?;
        if entry.generation != slot.generation {
            return None;
        }
        let clause = entry.clause.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(slot.index);
        self.live -= 1;
        self.live_ints -= clause.len();
        Some(clause)
    }

    /// Borrow a live copy.
    pub fn get(&self, slot: ArenaSlot) -> Option<Clause<'_>> {
        let entry = self.entries.get(slot.index as usize)?;
        if entry.generation != slot.generation {
            return None;
        }
        entry.clause.as_ref().map(OwnedClause::as_clause)
    }

    /// Number of live copies.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total ints held by live copies.
    pub fn live_ints(&self) -> usize {
        self.live_ints
    }
}
