//! Bucket store — the heart of ShareStore.
//!
//! Clauses are kept in one fixed-capacity bucket per clause length, stored
//! back to back as `length` ints followed by their LBD. A single mutex gates
//! all bucket state:
//!
//! **Insert path**: `try_lock`, never waits. A busy store or a full bucket
//! answers `false`, which callers treat as backpressure.
//! **Export path**: blocking `lock` for the whole drain/sort/encode pass.
//! Exports are rare and bounded by their literal budget.
//!
//! Clause views handed out internally borrow bucket memory and never outlive
//! the lock guard that produced them.

use parking_lot::Mutex;

use crate::buffer::{BufferBuilder, BufferReader};
use crate::clause::{lbd_in_range, Clause};
use crate::config::Config;
use crate::error::{ShareError, ShareResult};
use crate::histogram::ClauseHistogram;

/// Which length classes an export may drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    /// Every non-empty bucket
    #[default]
    Any,
    /// Unit clauses only
    Units,
    /// Everything except unit clauses
    NonUnits,
}

/// Result of a draining export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedBuffer {
    /// Serialized clauses
    pub data: Vec<i32>,
    /// Number of clauses in `data`
    pub num_clauses: usize,
    /// Number of literals in `data`, metadata prefixes excluded
    pub num_literals: usize,
}

/// Fixed-capacity storage for clauses of one length.
struct Bucket {
    data: Box<[i32]>,
    /// Occupied ints
    size: usize,
    /// Ints per clause, metadata included, lbd excluded
    clause_length: usize,
}

impl Bucket {
    fn new(capacity: usize, clause_length: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
            size: 0,
            clause_length,
        }
    }

    /// Append literals then lbd. Writes nothing if the clause does not fit.
    fn push(&mut self, clause: &Clause<'_>) -> bool {
        let top = self.size;
        if top + self.clause_length + 1 > self.data.len() {
            return false;
        }
        self.data[top..top + self.clause_length].copy_from_slice(clause.literals());
        self.data[top + self.clause_length] = clause.lbd() as i32;
        self.size += self.clause_length + 1;
        true
    }

    /// Read the lbd stored after the clause at `offset`, checking its range.
    fn lbd_at(&self, offset: usize) -> u16 {
        let lbd = self.data[offset + self.clause_length];
        assert!(
            lbd >= 0 && lbd_in_range(self.clause_length, lbd as u32),
            "corrupted bucket: lbd {} at offset {} for clause length {}",
            lbd, offset, self.clause_length
        );
        lbd as u16
    }

    fn num_clauses(&self) -> usize {
        self.size / (self.clause_length + 1)
    }
}

/// Length-bucketed clause store shared by producer and exporter threads.
///
/// All public methods take `&self`; share the store through an `Arc`.
pub struct BucketStore {
    /// Bucket for length `l` at index `l - 1`, created on first use
    buckets: Mutex<Vec<Option<Bucket>>>,
    /// Store configuration
    config: Config,
}

impl BucketStore {
    /// Create an empty store. No bucket memory is allocated until the first
    /// clause of a given length arrives.
    pub fn new(config: Config) -> ShareResult<Self> {
        config
            .validate()
            .map_err(|reason| ShareError::InvalidConfig { reason })?;

        Ok(Self {
            buckets: Mutex::new(Vec::new()),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Offer one clause.
    ///
    /// Returns `false` without waiting if another thread holds the store, if
    /// the clause is empty, longer than `max_eff_clause_length` or built for
    /// another metadata layout, or if its bucket is full. Previously admitted
    /// clauses are never evicted.
    pub fn add_clause(&self, clause: &Clause<'_>) -> bool {
        let Some(mut buckets) = self.buckets.try_lock() else {
            return false;
        };

        if clause.prefix_width() != self.config.metadata.width() {
            return false;
        }
        let eff = clause.effective_len();
        if eff == 0 || eff > self.config.max_eff_clause_length {
            return false;
        }

        let len = clause.len();
        if buckets.len() < len {
            buckets.resize_with(len, || None);
        }
        let bucket_size = self.config.bucket_size;
        let bucket = buckets[len - 1].get_or_insert_with(|| {
            tracing::trace!(clause_length = len, bucket_size, "creating clause bucket");
            Bucket::new(bucket_size, len)
        });
        bucket.push(clause)
    }

    /// Offer every clause of an incoming buffer. Clauses that are declined
    /// are skipped; there is no batch atomicity. Returns the number admitted.
    pub fn add_clauses(
        &self,
        reader: &mut BufferReader<'_>,
        histogram: Option<&ClauseHistogram>,
    ) -> usize {
        let mut admitted = 0;
        while let Some(clause) = reader.decode_next() {
            if self.add_clause(&clause) {
                admitted += 1;
                if let Some(hist) = histogram {
                    hist.increment(clause.len());
                }
            }
        }
        admitted
    }

    /// Drain up to `literal_budget` ints worth of clauses into a serialized
    /// buffer.
    ///
    /// Buckets are visited shortest first; within a bucket the most recently
    /// admitted clauses leave first. `transform` may rewrite each exported
    /// clause's ints (e.g. metadata ids) in place. Exported clauses are
    /// removed from the store.
    ///
    /// # Panics
    /// If a bucket holds an out-of-range lbd, if the sorted sequence is not
    /// in canonical order, or if the encoder rejects a clause that was
    /// budgeted for. Each indicates internal corruption.
    pub fn export_buffer(
        &self,
        literal_budget: usize,
        mode: ExportMode,
        sort: bool,
        mut transform: Option<&mut dyn FnMut(&mut [i32])>,
    ) -> ExportedBuffer {
        let width = self.config.metadata.width();
        let reset_lbd = self.config.reset_lbd_at_export;

        let mut buckets = self.buckets.lock();

        let mut remaining = literal_budget;
        let mut clauses: Vec<Clause<'_>> = Vec::new();
        for slot in buckets.iter_mut() {
            let Some(bucket) = slot else { continue };
            let len = bucket.clause_length;
            if remaining < len {
                break;
            }
            let eff = len - width;
            if eff == 1 && mode == ExportMode::NonUnits {
                continue;
            }
            if eff > 1 && mode == ExportMode::Units {
                break;
            }

            let mut popped: Vec<(usize, u16)> = Vec::new();
            while bucket.size > 0 && remaining >= len {
                let offset = bucket.size - (len + 1);
                let lbd = if reset_lbd { len as u16 } else { bucket.lbd_at(offset) };
                if let Some(f) = transform.as_deref_mut() {
                    f(&mut bucket.data[offset..offset + len]);
                }
                popped.push((offset, lbd));
                remaining -= len;
                bucket.size -= len + 1;
            }

            // Drained ints stay in place until the next insert, which the
            // held lock rules out
            let bucket: &Bucket = bucket;
            clauses.extend(popped.into_iter().map(|(offset, lbd)| {
                Clause::from_parts(&bucket.data[offset..offset + len], lbd, width as u16)
            }));
        }

        let mut builder = BufferBuilder::new(
            literal_budget,
            self.config.max_eff_clause_length,
            self.config.metadata,
        )
        .with_checksum(self.config.buffer_checksums);
        let num_literals = encode(&mut builder, &mut clauses, sort);
        let num_clauses = builder.count_added();
        let data = builder.finalize();

        tracing::debug!(
            num_clauses,
            num_literals,
            literal_budget,
            ?mode,
            "exported clause buffer"
        );

        ExportedBuffer { data, num_clauses, num_literals }
    }

    /// Serialize every resident clause without removing anything.
    pub fn read_buffer(&self) -> Vec<i32> {
        let width = self.config.metadata.width() as u16;
        let buckets = self.buckets.lock();

        let mut clauses: Vec<Clause<'_>> = Vec::new();
        for bucket in buckets.iter().flatten() {
            let len = bucket.clause_length;
            for offset in (0..bucket.size).step_by(len + 1) {
                let lbd = bucket.lbd_at(offset);
                clauses.push(Clause::from_parts(&bucket.data[offset..offset + len], lbd, width));
            }
        }

        let mut builder = BufferBuilder::new(
            usize::MAX,
            self.config.max_eff_clause_length,
            self.config.metadata,
        )
        .with_checksum(self.config.buffer_checksums);
        encode(&mut builder, &mut clauses, true);

        tracing::debug!(num_clauses = builder.count_added(), "read clause snapshot");
        builder.finalize()
    }

    /// Decoder for a buffer produced under this store's configuration.
    pub fn make_reader<'a>(
        &self,
        data: &'a [i32],
        use_checksums: bool,
    ) -> ShareResult<BufferReader<'a>> {
        BufferReader::new(
            data,
            self.config.max_eff_clause_length,
            self.config.metadata,
            use_checksums,
        )
        .map_err(|e| {
            tracing::warn!(error = %e, len = data.len(), "rejected incoming clause buffer");
            e
        })
    }

    /// Number of resident clauses.
    pub fn num_clauses(&self) -> usize {
        let buckets = self.buckets.lock();
        buckets.iter().flatten().map(Bucket::num_clauses).sum()
    }

    /// Number of resident clause ints, metadata included, lbds excluded.
    pub fn num_literals(&self) -> usize {
        let buckets = self.buckets.lock();
        buckets
            .iter()
            .flatten()
            .map(|b| b.num_clauses() * b.clause_length)
            .sum()
    }

    /// Returns true if no clause is resident.
    pub fn is_empty(&self) -> bool {
        let buckets = self.buckets.lock();
        buckets.iter().flatten().all(|b| b.size == 0)
    }
}

/// Optionally sort, then append every clause. Returns the number of
/// literals appended, metadata excluded.
fn encode(builder: &mut BufferBuilder, clauses: &mut [Clause<'_>], sort: bool) -> usize {
    if sort {
        clauses.sort();
        for pair in clauses.windows(2) {
            assert!(
                pair[0] <= pair[1],
                "clause export out of order: {} > {}",
                pair[0], pair[1]
            );
        }
    }

    let mut num_literals = 0;
    for clause in clauses.iter() {
        if !builder.append(clause) {
            panic!("clause buffer rejected budgeted clause {}", clause);
        }
        num_literals += clause.effective_len();
    }
    num_literals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ClauseMetadata;
    use std::sync::Arc;

    fn test_config() -> Config {
        let mut config = Config::budget();
        config.max_eff_clause_length = 8;
        config.bucket_size = 64;
        config
    }

    fn test_store() -> BucketStore {
        BucketStore::new(test_config()).unwrap()
    }

    fn add(store: &BucketStore, lits: &[i32], lbd: u32) -> bool {
        let clause = Clause::new(lits, lbd, store.config().metadata).unwrap();
        store.add_clause(&clause)
    }

    fn decode(store: &BucketStore, data: &[i32]) -> Vec<(Vec<i32>, u32)> {
        store
            .make_reader(data, store.config().buffer_checksums)
            .unwrap()
            .map(|c| (c.literals().to_vec(), c.lbd()))
            .collect()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.bucket_size = 1;
        assert!(matches!(
            BucketStore::new(config),
            Err(ShareError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_open_empty() {
        let store = test_store();
        assert!(store.is_empty());
        assert_eq!(store.num_clauses(), 0);
        assert!(store.read_buffer().is_empty());
    }

    #[test]
    fn test_add_and_count() {
        let store = test_store();
        assert!(add(&store, &[1, 2, 3], 2));
        assert!(add(&store, &[4], 1));
        assert_eq!(store.num_clauses(), 2);
        assert_eq!(store.num_literals(), 4);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_bucket_capacity() {
        // 64 ints per bucket, 4 ints per length-3 clause: exactly 16 fit
        let store = test_store();
        for i in 0..16 {
            assert!(add(&store, &[1, 2, 3 + i], 3), "clause {} should fit", i);
        }
        assert!(!add(&store, &[7, 8, 9], 3));
        // Another length still has room
        assert!(add(&store, &[7, 8], 2));
        assert_eq!(store.num_clauses(), 17);
    }

    #[test]
    fn test_rejection_keeps_old_clauses() {
        let store = test_store();
        for i in 0..16 {
            assert!(add(&store, &[1, 2, 3 + i], 3));
        }
        let before = store.read_buffer();
        assert!(!add(&store, &[1, 2, 1000], 2));
        assert_eq!(store.read_buffer(), before);
    }

    #[test]
    fn test_overlong_clause_declined() {
        let store = test_store();
        let lits: Vec<i32> = (1..=9).collect();
        assert!(!add(&store, &lits, 5));
        assert!(store.is_empty());
    }

    #[test]
    fn test_metadata_mismatch_declined() {
        let store = test_store();
        let lits = [0, 0, 1, 2];
        let clause = Clause::new(&lits, 2, ClauseMetadata::with_id()).unwrap();
        assert!(!store.add_clause(&clause));
    }

    #[test]
    fn test_try_lock_fails_fast_while_held() {
        let store = test_store();
        let _guard = store.buckets.lock();
        let lits = [1, 2];
        let clause = Clause::new(&lits, 2, ClauseMetadata::none()).unwrap();
        assert!(!store.add_clause(&clause));
    }

    #[test]
    fn test_export_is_sorted_and_draining() {
        let store = test_store();
        assert!(add(&store, &[5, 6, 7], 3));
        assert!(add(&store, &[1, 2, 3], 2));
        assert!(add(&store, &[9], 1));
        assert!(add(&store, &[3, 4], 2));

        let out = store.export_buffer(100, ExportMode::Any, true, None);
        assert_eq!(out.num_clauses, 4);
        assert_eq!(out.num_literals, 9);
        assert_eq!(
            decode(&store, &out.data),
            vec![
                (vec![9], 1),
                (vec![3, 4], 2),
                (vec![1, 2, 3], 2),
                (vec![5, 6, 7], 3),
            ]
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_export_budget_and_lifo() {
        let store = test_store();
        assert!(add(&store, &[1, 2], 2));
        assert!(add(&store, &[3, 4], 2));
        assert!(add(&store, &[5, 6], 2));

        // Room for two clauses: the two most recent leave first
        let out = store.export_buffer(5, ExportMode::Any, true, None);
        assert_eq!(out.num_clauses, 2);
        assert_eq!(decode(&store, &out.data), vec![(vec![3, 4], 2), (vec![5, 6], 2)]);

        let rest = store.export_buffer(5, ExportMode::Any, true, None);
        assert_eq!(decode(&store, &rest.data), vec![(vec![1, 2], 2)]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_export_stops_when_budget_below_length() {
        let store = test_store();
        assert!(add(&store, &[1], 1));
        assert!(add(&store, &[2, 3, 4], 3));
        let out = store.export_buffer(2, ExportMode::Any, true, None);
        assert_eq!(out.num_clauses, 1);
        assert_eq!(store.num_clauses(), 1);
    }

    #[test]
    fn test_export_modes() {
        let store = test_store();
        assert!(add(&store, &[1], 1));
        assert!(add(&store, &[-2], 1));
        assert!(add(&store, &[3, 4], 2));
        assert!(add(&store, &[5, 6, 7], 3));

        let units = store.export_buffer(100, ExportMode::Units, true, None);
        assert_eq!(decode(&store, &units.data), vec![(vec![-2], 1), (vec![1], 1)]);
        assert_eq!(store.num_clauses(), 2);

        assert!(add(&store, &[8], 1));
        let nonunits = store.export_buffer(100, ExportMode::NonUnits, true, None);
        assert_eq!(
            decode(&store, &nonunits.data),
            vec![(vec![3, 4], 2), (vec![5, 6, 7], 3)]
        );
        assert_eq!(store.num_clauses(), 1);
    }

    #[test]
    fn test_export_transform_rewrites_metadata() {
        let mut config = test_config();
        config.metadata = ClauseMetadata::with_id();
        let store = BucketStore::new(config).unwrap();
        assert!(add(&store, &[1, 0, 5, 6], 2));
        assert!(add(&store, &[2, 0, 7], 2));

        let mut next_id = 100u64;
        let mut renumber = |lits: &mut [i32]| {
            ClauseMetadata::write_id(lits, next_id);
            next_id += 1;
        };
        let out = store.export_buffer(100, ExportMode::Any, true, Some(&mut renumber));
        assert_eq!(out.num_literals, 3);

        let ids: Vec<u64> = store
            .make_reader(&out.data, false)
            .unwrap()
            .map(|c| c.id().unwrap())
            .collect();
        // Length-3 bucket drains first, then length 4
        assert_eq!(ids, vec![100, 101]);
    }

    #[test]
    fn test_reset_lbd_at_export() {
        let mut config = test_config();
        config.reset_lbd_at_export = true;
        let store = BucketStore::new(config).unwrap();
        assert!(add(&store, &[1, 2, 3], 2));
        let out = store.export_buffer(100, ExportMode::Any, true, None);
        assert_eq!(decode(&store, &out.data), vec![(vec![1, 2, 3], 3)]);
    }

    #[test]
    fn test_unsorted_export_keeps_bucket_order() {
        let store = test_store();
        assert!(add(&store, &[1, 2], 2));
        assert!(add(&store, &[9], 1));
        let out = store.export_buffer(100, ExportMode::Any, false, None);
        assert_eq!(decode(&store, &out.data), vec![(vec![9], 1), (vec![1, 2], 2)]);
    }

    #[test]
    fn test_read_buffer_does_not_drain() {
        let store = test_store();
        assert!(add(&store, &[4, 5], 2));
        assert!(add(&store, &[1, 2, 3], 3));
        assert!(add(&store, &[1, 2], 2));

        let snapshot = store.read_buffer();
        assert_eq!(
            decode(&store, &snapshot),
            vec![(vec![1, 2], 2), (vec![4, 5], 2), (vec![1, 2, 3], 3)]
        );
        assert_eq!(store.num_clauses(), 3);
        assert_eq!(store.read_buffer(), snapshot);
    }

    #[test]
    fn test_add_clauses_with_histogram() {
        let source = test_store();
        assert!(add(&source, &[1], 1));
        assert!(add(&source, &[2, 3], 2));
        assert!(add(&source, &[4, 5], 2));
        let out = source.export_buffer(100, ExportMode::Any, true, None);

        let target = test_store();
        let hist = ClauseHistogram::new(8, 0);
        let mut reader = target.make_reader(&out.data, false).unwrap();
        assert_eq!(target.add_clauses(&mut reader, Some(&hist)), 3);
        assert_eq!(target.num_clauses(), 3);
        assert_eq!(hist.report(), "total:3 1 2");
    }

    #[test]
    fn test_add_clauses_partial_when_full() {
        let mut config = test_config();
        config.bucket_size = 1024;
        let source = BucketStore::new(config).unwrap();
        for i in 0..10 {
            assert!(add(&source, &[1, 2, 3, 4, 5, 6, 7, 8 + i], 8));
        }
        let out = source.export_buffer(1000, ExportMode::Any, true, None);

        // 64 ints, 9 per clause of length 8: seven fit
        let target = test_store();
        let mut reader = target.make_reader(&out.data, false).unwrap();
        assert_eq!(target.add_clauses(&mut reader, None), 7);
    }

    #[test]
    fn test_checksummed_buffers() {
        let mut config = test_config();
        config.buffer_checksums = true;
        let store = BucketStore::new(config).unwrap();
        assert!(add(&store, &[1, 2], 2));
        let mut out = store.export_buffer(100, ExportMode::Any, true, None);
        assert!(store.make_reader(&out.data, true).is_ok());

        out.data[2] = 42;
        assert!(matches!(
            store.make_reader(&out.data, true),
            Err(ShareError::ChecksumMismatch { .. })
        ));
    }

    /// Overwrite the lbd of the first length-2 clause with an illegal value.
    fn corrupt_first_pair_lbd(store: &BucketStore) {
        let mut buckets = store.buckets.lock();
        let bucket = buckets[1].as_mut().unwrap();
        bucket.data[2] = 7;
    }

    #[test]
    #[should_panic(expected = "corrupted bucket")]
    fn test_export_panics_on_corrupted_lbd() {
        let store = test_store();
        assert!(add(&store, &[1, 2], 2));
        corrupt_first_pair_lbd(&store);
        store.export_buffer(100, ExportMode::Any, true, None);
    }

    #[test]
    #[should_panic(expected = "corrupted bucket")]
    fn test_read_buffer_panics_on_corrupted_lbd() {
        let store = test_store();
        assert!(add(&store, &[1, 2], 2));
        corrupt_first_pair_lbd(&store);
        store.read_buffer();
    }

    #[test]
    #[should_panic(expected = "rejected budgeted clause")]
    fn test_encode_panics_when_budget_too_small() {
        let lits = [1, 2, 3];
        let clause = Clause::new(&lits, 2, ClauseMetadata::none()).unwrap();
        let mut builder = BufferBuilder::new(2, 8, ClauseMetadata::none());
        encode(&mut builder, &mut [clause], true);
    }

    #[test]
    #[should_panic(expected = "rejected budgeted clause")]
    fn test_encode_panics_on_descending_lengths() {
        let long = [1, 2, 3];
        let short = [4, 5];
        let mut clauses = [
            Clause::new(&long, 2, ClauseMetadata::none()).unwrap(),
            Clause::new(&short, 2, ClauseMetadata::none()).unwrap(),
        ];
        let mut builder = BufferBuilder::new(100, 8, ClauseMetadata::none());
        encode(&mut builder, &mut clauses, false);
    }

    #[test]
    fn test_encode_sorts_before_appending() {
        let long = [1, 2, 3];
        let short = [4, 5];
        let mut clauses = [
            Clause::new(&long, 2, ClauseMetadata::none()).unwrap(),
            Clause::new(&short, 2, ClauseMetadata::none()).unwrap(),
        ];
        let mut builder = BufferBuilder::new(100, 8, ClauseMetadata::none());
        assert_eq!(encode(&mut builder, &mut clauses, true), 5);
        assert_eq!(builder.count_added(), 2);
    }

    #[test]
    fn test_concurrent_producers_and_exporter() {
        let mut config = test_config();
        config.bucket_size = 1 << 16;
        let store = Arc::new(BucketStore::new(config).unwrap());

        let mut handles = vec![];
        for t in 0..4i32 {
            let s = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                let mut admitted = 0usize;
                for i in 0..500i32 {
                    let lits = [t + 1, 100 + i];
                    let clause = Clause::new(&lits, 2, ClauseMetadata::none()).unwrap();
                    // Retry on backpressure so every clause lands eventually
                    while !s.add_clause(&clause) {
                        std::thread::yield_now();
                    }
                    admitted += 1;
                }
                admitted
            }));
        }

        let mut exported = 0usize;
        for _ in 0..20 {
            exported += store.export_buffer(50, ExportMode::Any, true, None).num_clauses;
        }
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        exported += store.export_buffer(usize::MAX, ExportMode::Any, true, None).num_clauses;

        assert_eq!(admitted, 2000);
        assert_eq!(exported, 2000);
        assert!(store.is_empty());
    }
}
