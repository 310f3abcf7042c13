//! Clause views and the canonical clause order
//!
//! A [`Clause`] is a borrowed view over a run of ints: an optional metadata
//! prefix followed by non-zero literals, plus the clause's LBD. Views are
//! `Copy` and never own memory, so a view produced inside the store cannot
//! escape the lock scope that produced it. [`OwnedClause`] is the heap-owned
//! counterpart used when a clause must outlive its source.
//!
//! The canonical order sorts by length, then LBD, then the literals after the
//! metadata prefix. It drives sorting before export, and equality derived from
//! it ignores metadata.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::arena::{ArenaSlot, ClauseArena};
use crate::config::MAX_CLAUSE_INTS;
use crate::error::{ShareError, ShareResult};
use crate::hash::ClauseHash;
use crate::metadata::{ClauseMetadata, ID_INTS};

/// Whether `lbd` is a legal LBD for a clause of `len` ints.
pub fn lbd_in_range(len: usize, lbd: u32) -> bool {
    let lbd = lbd as usize;
    lbd >= len.min(2) && lbd <= len
}

/// Borrowed, non-owning view of a clause.
#[derive(Debug, Clone, Copy)]
pub struct Clause<'a> {
    literals: &'a [i32],
    lbd: u16,
    prefix: u16,
}

impl<'a> Clause<'a> {
    /// Build a view, validating every clause invariant.
    ///
    /// `literals` is the full run including the metadata prefix described by
    /// `metadata`.
    pub fn new(literals: &'a [i32], lbd: u32, metadata: ClauseMetadata) -> ShareResult<Self> {
        let invalid = |reason: String| ShareError::InvalidClause {
            length: literals.len(),
            lbd,
            reason,
        };

        let width = metadata.width();
        if literals.len() < width {
            return Err(invalid(format!("shorter than metadata prefix of {} ints", width)));
        }
        if literals.len() > MAX_CLAUSE_INTS {
            return Err(invalid(format!("longer than {} ints", MAX_CLAUSE_INTS)));
        }
        if !lbd_in_range(literals.len(), lbd) {
            return Err(invalid(format!(
                "lbd must be in [{}, {}]",
                literals.len().min(2),
                literals.len()
            )));
        }
        if let Some(pos) = literals[width..].iter().position(|&lit| lit == 0) {
            return Err(invalid(format!("zero literal at position {}", width + pos)));
        }

        Ok(Self::from_parts(literals, lbd as u16, width as u16))
    }

    /// Build a view from parts whose invariants the caller already upholds.
    pub(crate) fn from_parts(literals: &'a [i32], lbd: u16, prefix: u16) -> Self {
        debug_assert!(literals.len() >= prefix as usize);
        Self { literals, lbd, prefix }
    }

    /// The full int run, metadata prefix included.
    pub fn literals(&self) -> &'a [i32] {
        self.literals
    }

    /// The metadata prefix (empty without metadata).
    pub fn metadata(&self) -> &'a [i32] {
        &self.literals[..self.prefix as usize]
    }

    /// The literals after the metadata prefix.
    pub fn body(&self) -> &'a [i32] {
        &self.literals[self.prefix as usize..]
    }

    /// Number of ints, metadata prefix included.
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// Whether the clause has no ints at all.
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Number of literals after the metadata prefix.
    pub fn effective_len(&self) -> usize {
        self.literals.len() - self.prefix as usize
    }

    pub fn lbd(&self) -> u32 {
        self.lbd as u32
    }

    /// Width of the metadata prefix this view was built with.
    pub fn prefix_width(&self) -> usize {
        self.prefix as usize
    }

    /// Clause id stored in the metadata prefix, if there is one.
    pub fn id(&self) -> Option<u64> {
        if (self.prefix as usize) < ID_INTS {
            return None;
        }
        Some(ClauseMetadata::read_id(self.literals))
    }

    /// Deep-copy this clause into `arena`.
    pub fn copy(&self, arena: &mut ClauseArena) -> ArenaSlot {
        arena.allocate(self)
    }

    /// Heap-owned deep copy of this clause.
    pub fn to_owned_clause(&self) -> OwnedClause {
        OwnedClause {
            literals: self.literals.to_vec(),
            lbd: self.lbd,
            prefix: self.prefix,
        }
    }

    /// Human-readable rendering for logs and assertion messages.
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

impl Ord for Clause<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then(self.lbd.cmp(&other.lbd))
            .then_with(|| self.body().cmp(other.body()))
    }
}

impl PartialOrd for Clause<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Clause<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Clause<'_> {}

impl Hash for Clause<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.clause_hash());
    }
}

impl fmt::Display for Clause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(len={} lbd={}", self.effective_len(), self.lbd)?;
        if let Some(id) = self.id() {
            write!(f, " id={}", id)?;
            let signature = &self.metadata()[ID_INTS..];
            if !signature.is_empty() {
                write!(f, " sig=")?;
                for word in signature {
                    for byte in word.to_le_bytes() {
                        write!(f, "{:02x}", byte)?;
                    }
                }
            }
        }
        write!(f, ")")?;
        for lit in self.body() {
            write!(f, " {}", lit)?;
        }
        Ok(())
    }
}

/// Heap-owned clause with the same ordering and hashing as [`Clause`].
#[derive(Debug, Clone)]
pub struct OwnedClause {
    literals: Vec<i32>,
    lbd: u16,
    prefix: u16,
}

impl OwnedClause {
    /// Validate and take ownership of a clause.
    pub fn new(literals: Vec<i32>, lbd: u32, metadata: ClauseMetadata) -> ShareResult<Self> {
        Clause::new(&literals, lbd, metadata)?;
        Ok(Self { literals, lbd: lbd as u16, prefix: metadata.width() as u16 })
    }

    /// Borrow as a view.
    pub fn as_clause(&self) -> Clause<'_> {
        Clause::from_parts(&self.literals, self.lbd, self.prefix)
    }

    /// Mutable access to the ints, metadata prefix included.
    ///
    /// Literals must stay non-zero; the LBD is not re-validated.
    pub fn literals_mut(&mut self) -> &mut [i32] {
        &mut self.literals
    }

    pub fn literals(&self) -> &[i32] {
        &self.literals
    }

    pub fn body(&self) -> &[i32] {
        &self.literals[self.prefix as usize..]
    }

    pub fn lbd(&self) -> u32 {
        self.lbd as u32
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

impl Ord for OwnedClause {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_clause().cmp(&other.as_clause())
    }
}

impl PartialOrd for OwnedClause {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OwnedClause {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OwnedClause {}

impl Hash for OwnedClause {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_clause().hash(state);
    }
}

impl fmt::Display for OwnedClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_clause().fmt(f)
    }
}
