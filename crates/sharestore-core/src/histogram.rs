//! Clause histogram — lock-free per-length statistics
//!
//! Counters are advisory: every update uses `Ordering::Relaxed`, no ordering
//! is established against store mutations, and `report()` is a best-effort
//! snapshot. Concurrent increments may be observed out of program order but
//! are never lost.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Append-only clause counts per length.
#[derive(Debug)]
pub struct ClauseHistogram {
    /// One counter per clause length, index = length - 1
    counts: Box<[AtomicU64]>,
    /// Running total across all lengths
    total: AtomicU64,
    /// Leading counters skipped by `report()`
    metadata_width: usize,
}

impl ClauseHistogram {
    /// Create a histogram with `capacity` counters. Lengths beyond the
    /// capacity are folded into the last counter.
    pub fn new(capacity: usize, metadata_width: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            counts: (0..capacity).map(|_| AtomicU64::new(0)).collect(),
            total: AtomicU64::new(0),
            metadata_width,
        }
    }

    /// Number of counters.
    pub fn capacity(&self) -> usize {
        self.counts.len()
    }

    fn slot(&self, length: usize) -> &AtomicU64 {
        let idx = length.clamp(1, self.counts.len()) - 1;
        &self.counts[idx]
    }

    /// Count one clause of the given length.
    pub fn increment(&self, length: usize) {
        self.slot(length).fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count `by` clauses of the given length.
    pub fn increase(&self, length: usize, by: u64) {
        self.slot(length).fetch_add(by, Ordering::Relaxed);
        self.total.fetch_add(by, Ordering::Relaxed);
    }

    /// Clauses counted so far.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Clauses counted for one length (folded like `increment`).
    pub fn count(&self, length: usize) -> u64 {
        self.slot(length).load(Ordering::Relaxed)
    }

    /// `"total:<total> <c> <c> ..."`, counters from index `metadata_width` up to
    /// the last non-zero one.
    pub fn report(&self) -> String {
        let mut end = self.counts.len() - 1;
        while end > 0 && self.counts[end].load(Ordering::Relaxed) == 0 {
            end -= 1;
        }

        let mut out = format!("total:{}", self.total());
        for counter in self.counts.iter().take(end + 1).skip(self.metadata_width) {
            out.push(' ');
            out.push_str(&counter.load(Ordering::Relaxed).to_string());
        }
        out
    }
}

impl fmt::Display for ClauseHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}
