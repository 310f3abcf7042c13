//! Clause metadata prefix layout
//!
//! A clause may carry a fixed-size prefix of ints in front of its literals:
//! a 64-bit clause id split over two ints (low word first), optionally
//! followed by a signature of further ints. The width is the same for every
//! clause in a process and is read, never mutated, by the store.

/// Number of ints used by the clause id.
pub const ID_INTS: usize = 2;

/// Layout of the metadata prefix shared by all clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClauseMetadata {
    width: usize,
}

impl ClauseMetadata {
    /// No metadata: clauses consist of literals only.
    pub const fn none() -> Self {
        Self { width: 0 }
    }

    /// A 64-bit clause id in front of every clause.
    pub const fn with_id() -> Self {
        Self { width: ID_INTS }
    }

    /// A 64-bit clause id followed by a signature of `signature_ints` ints.
    pub const fn with_signature(signature_ints: usize) -> Self {
        Self { width: ID_INTS + signature_ints }
    }

    /// Number of ints in the prefix.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Whether clauses carry metadata at all.
    pub const fn enabled(&self) -> bool {
        self.width > 0
    }

    /// Whether a signature follows the clause id.
    pub const fn has_signature(&self) -> bool {
        self.width > ID_INTS
    }

    /// Decode the clause id from the start of a clause.
    pub fn read_id(prefix: &[i32]) -> u64 {
        let lo = prefix[0] as u32 as u64;
        let hi = prefix[1] as u32 as u64;
        (hi << 32) | lo
    }

    /// Encode a clause id into the start of a clause.
    pub fn write_id(prefix: &mut [i32], id: u64) {
        prefix[0] = id as u32 as i32;
        prefix[1] = (id >> 32) as u32 as i32;
    }
}
