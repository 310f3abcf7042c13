//! Clause filters — admission policy in front of the store
//!
//! A filter decides whether a produced clause reaches the store. The set of
//! filters is closed: [`NoopFilter`] passes every valid clause straight to the
//! store, [`DedupFilter`] additionally turns away clauses whose literal
//! multiset it has already let through. [`AnyFilter`] selects one at runtime.

use std::sync::Arc;

use hashbrown::HashSet;
use parking_lot::Mutex;

use crate::clause::Clause;
use crate::hash::{BuildClauseHasher, ClauseHash};
use crate::store::BucketStore;

/// Outcome of offering a produced clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionResult {
    /// Stored for export
    Admitted,
    /// The store declined (busy or full)
    Dropped,
    /// Rejected by the filter's policy
    Filtered,
    /// Already seen by the filter
    Duplicate,
}

/// Bitset of producer (solver thread) ids, at most 64.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProducerSet(u64);

impl ProducerSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, producer: u32) {
        self.0 |= 1u64 << (producer % 64);
    }

    pub fn contains(&self, producer: u32) -> bool {
        self.0 & (1u64 << (producer % 64)) != 0
    }
}

/// A clause as handed over by a solver thread.
#[derive(Debug, Clone, Copy)]
pub struct ProducedClause<'a> {
    /// Full int run, metadata prefix included
    pub literals: &'a [i32],
    pub lbd: u32,
    /// Id of the producing solver thread
    pub producer_id: u32,
    /// Sharing epoch the clause was produced in
    pub epoch: u32,
}

/// Admission policy in front of a [`BucketStore`].
pub trait ClauseFilter {
    /// Offer a produced clause to `store`, or to the filter's own store if
    /// `None`.
    fn try_register_and_insert(
        &self,
        candidate: ProducedClause<'_>,
        store: Option<&BucketStore>,
    ) -> AdmissionResult;

    /// Producers credited for `clause` in `epoch`.
    fn confirm_sharing_and_get_producers(&self, clause: &Clause<'_>, epoch: u32) -> ProducerSet;

    /// Whether `clause` may be shared in `epoch`. Query only.
    fn admit_sharing(&self, clause: &Clause<'_>, epoch: u32) -> bool;

    /// Footprint estimate for one clause length class.
    fn size_estimate(&self, clause_length: usize) -> usize;
}

/// Build a view over a candidate under `store`'s metadata layout.
fn candidate_view<'a>(candidate: &ProducedClause<'a>, store: &BucketStore) -> Option<Clause<'a>> {
    match Clause::new(candidate.literals, candidate.lbd, store.config().metadata) {
        Ok(clause) => Some(clause),
        Err(e) => {
            tracing::debug!(producer = candidate.producer_id, error = %e, "filtered invalid clause");
            None
        }
    }
}

/// Pass-through filter: every clause goes straight to the store, and the
/// only outcomes are `Admitted` and `Dropped`.
///
/// Candidates are trusted to be valid clauses. One that is not (a zero
/// literal, an lbd out of range) is an invariant violation and panics.
pub struct NoopFilter {
    store: Arc<BucketStore>,
}

impl NoopFilter {
    pub fn new(store: Arc<BucketStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<BucketStore> {
        &self.store
    }
}

impl ClauseFilter for NoopFilter {
    fn try_register_and_insert(
        &self,
        candidate: ProducedClause<'_>,
        store: Option<&BucketStore>,
    ) -> AdmissionResult {
        let store = store.unwrap_or(&self.store);
        let clause = Clause::new(candidate.literals, candidate.lbd, store.config().metadata)
            .unwrap_or_else(|e| {
                panic!("producer {} offered an invalid clause: {}", candidate.producer_id, e)
            });
        if store.add_clause(&clause) {
            AdmissionResult::Admitted
        } else {
            AdmissionResult::Dropped
        }
    }

    fn confirm_sharing_and_get_producers(&self, _clause: &Clause<'_>, _epoch: u32) -> ProducerSet {
        ProducerSet::empty()
    }

    fn admit_sharing(&self, _clause: &Clause<'_>, _epoch: u32) -> bool {
        true
    }

    fn size_estimate(&self, _clause_length: usize) -> usize {
        0
    }
}

/// Literal multiset of a clause: sorted body, metadata stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MultisetKey(Vec<i32>);

impl MultisetKey {
    fn of(clause: &Clause<'_>) -> Self {
        let mut lits = clause.body().to_vec();
        lits.sort_unstable();
        Self(lits)
    }
}

impl std::hash::Hash for MultisetKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.clause_hash());
    }
}

/// Filter that lets each literal multiset through once.
///
/// A clause the store declines is forgotten again so that a later offer
/// can retry it. Memory is bounded by the store's `dedup_capacity`: once
/// that many multisets are remembered, the whole set is forgotten before
/// the next one is recorded.
pub struct DedupFilter {
    store: Arc<BucketStore>,
    seen: Mutex<HashSet<MultisetKey, BuildClauseHasher>>,
    capacity: usize,
}

impl DedupFilter {
    pub fn new(store: Arc<BucketStore>) -> Self {
        let capacity = store.config().dedup_capacity;
        Self {
            store,
            seen: Mutex::new(HashSet::default()),
            capacity,
        }
    }

    /// Maximum number of remembered clauses.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn store(&self) -> &Arc<BucketStore> {
        &self.store
    }

    /// Number of remembered clauses.
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    /// Forget every remembered clause.
    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

impl ClauseFilter for DedupFilter {
    fn try_register_and_insert(
        &self,
        candidate: ProducedClause<'_>,
        store: Option<&BucketStore>,
    ) -> AdmissionResult {
        let store = store.unwrap_or(&self.store);
        let Some(clause) = candidate_view(&candidate, store) else {
            return AdmissionResult::Filtered;
        };

        let key = MultisetKey::of(&clause);
        {
            let mut seen = self.seen.lock();
            if seen.contains(&key) {
                return AdmissionResult::Duplicate;
            }
            if seen.len() >= self.capacity {
                tracing::debug!(entries = seen.len(), "dedup set full, forgetting remembered clauses");
                seen.clear();
            }
            seen.insert(key.clone());
        }
        // The set lock is released here; add_clause never waits
        if store.add_clause(&clause) {
            AdmissionResult::Admitted
        } else {
            self.seen.lock().remove(&key);
            AdmissionResult::Dropped
        }
    }

    fn confirm_sharing_and_get_producers(&self, _clause: &Clause<'_>, _epoch: u32) -> ProducerSet {
        ProducerSet::empty()
    }

    fn admit_sharing(&self, _clause: &Clause<'_>, _epoch: u32) -> bool {
        true
    }

    fn size_estimate(&self, clause_length: usize) -> usize {
        self.seen
            .lock()
            .iter()
            .filter(|key| key.0.len() == clause_length)
            .count()
    }
}

/// The closed set of filters.
pub enum AnyFilter {
    Noop(NoopFilter),
    Dedup(DedupFilter),
}

impl AnyFilter {
    fn inner(&self) -> &dyn ClauseFilter {
        match self {
            AnyFilter::Noop(f) => f,
            AnyFilter::Dedup(f) => f,
        }
    }
}

impl ClauseFilter for AnyFilter {
    fn try_register_and_insert(
        &self,
        candidate: ProducedClause<'_>,
        store: Option<&BucketStore>,
    ) -> AdmissionResult {
        self.inner().try_register_and_insert(candidate, store)
    }

    fn confirm_sharing_and_get_producers(&self, clause: &Clause<'_>, epoch: u32) -> ProducerSet {
        self.inner().confirm_sharing_and_get_producers(clause, epoch)
    }

    fn admit_sharing(&self, clause: &Clause<'_>, epoch: u32) -> bool {
        self.inner().admit_sharing(clause, epoch)
    }

    fn size_estimate(&self, clause_length: usize) -> usize {
        self.inner().size_estimate(clause_length)
    }
}
