//! Clause buffer codec
//!
//! A serialized buffer is a flat `i32` run grouped by effective clause length
//! (literals after the metadata prefix):
//!
//! ```text
//! [checksum]                  optional: CRC32C of the little-endian bytes
//!                             of everything that follows, as i32 bits
//! for eff_len in 1..=last:
//!     count                   clauses in this length class
//!     count x (prefix ints, eff_len literals, lbd)
//! ```
//!
//! Classes must be appended in ascending length order, which the store
//! guarantees by sorting (or by draining buckets in ascending order).
//! The reader validates the whole buffer up front, so decoding itself never
//! fails and yields clauses whose invariants already hold.

use crate::clause::Clause;
use crate::error::{ShareError, ShareResult};
use crate::metadata::ClauseMetadata;

/// CRC32C of a slice of ints, little-endian.
fn checksum(data: &[i32]) -> u32 {
    let bytes: Vec<u8> = data.iter().flat_map(|x| x.to_le_bytes()).collect();
    crc32c::crc32c(&bytes)
}

/// Outgoing encoder with a literal budget.
#[derive(Debug)]
pub struct BufferBuilder {
    /// Maximum ints (metadata included, lbd excluded) over all clauses
    literal_budget: usize,
    max_eff_len: usize,
    metadata: ClauseMetadata,
    with_checksum: bool,
    data: Vec<i32>,
    /// Effective length of the open class (0 before the first append)
    class: usize,
    /// Position of the open class's count
    count_pos: usize,
    num_added: usize,
    num_ints: usize,
}

impl BufferBuilder {
    pub fn new(literal_budget: usize, max_eff_len: usize, metadata: ClauseMetadata) -> Self {
        Self {
            literal_budget,
            max_eff_len,
            metadata,
            with_checksum: false,
            data: Vec::new(),
            class: 0,
            count_pos: 0,
            num_added: 0,
            num_ints: 0,
        }
    }

    /// Prepend a CRC32C checksum when finalizing.
    pub fn with_checksum(mut self, enabled: bool) -> Self {
        self.with_checksum = enabled;
        self
    }

    /// Append a clause. Returns `false` (and writes nothing) if the clause is
    /// out of length order, too long, built for another metadata layout, or
    /// would exceed the literal budget.
    pub fn append(&mut self, clause: &Clause<'_>) -> bool {
        if clause.prefix_width() != self.metadata.width() {
            return false;
        }
        let eff = clause.effective_len();
        if eff == 0 || eff > self.max_eff_len || eff < self.class {
            return false;
        }
        if self.num_ints + clause.len() > self.literal_budget {
            return false;
        }

        while self.class < eff {
            self.class += 1;
            self.count_pos = self.data.len();
            self.data.push(0);
        }
        self.data.extend_from_slice(clause.literals());
        self.data.push(clause.lbd() as i32);
        self.data[self.count_pos] += 1;

        self.num_added += 1;
        self.num_ints += clause.len();
        true
    }

    /// Number of clauses appended.
    pub fn count_added(&self) -> usize {
        self.num_added
    }

    /// Ints appended so far, metadata included.
    pub fn num_ints(&self) -> usize {
        self.num_ints
    }

    /// Finish the buffer.
    pub fn finalize(self) -> Vec<i32> {
        if !self.with_checksum {
            return self.data;
        }
        let mut out = Vec::with_capacity(self.data.len() + 1);
        out.push(checksum(&self.data) as i32);
        out.extend_from_slice(&self.data);
        out
    }
}

/// Incoming decoder over a serialized buffer.
#[derive(Debug, Clone)]
pub struct BufferReader<'a> {
    data: &'a [i32],
    pos: usize,
    prefix: usize,
    /// Effective length of the current class
    class: usize,
    left_in_class: usize,
    remaining: usize,
}

impl<'a> BufferReader<'a> {
    /// Validate `data` and position the reader at its first clause.
    pub fn new(
        data: &'a [i32],
        max_eff_len: usize,
        metadata: ClauseMetadata,
        use_checksums: bool,
    ) -> ShareResult<Self> {
        let (data, base) = if use_checksums {
            let (&stored, body) = data.split_first().ok_or(ShareError::TruncatedBuffer {
                offset: 0,
                needed: 1,
                available: 0,
            })?;
            let actual = checksum(body);
            if actual != stored as u32 {
                return Err(ShareError::ChecksumMismatch { expected: stored as u32, actual });
            }
            (body, 1)
        } else {
            (data, 0)
        };

        let remaining = Self::validate(data, base, max_eff_len, metadata)?;

        Ok(Self {
            data,
            pos: 0,
            prefix: metadata.width(),
            class: 0,
            left_in_class: 0,
            remaining,
        })
    }

    /// Walk the class structure once; returns the number of clauses.
    /// `base` shifts reported offsets past a leading checksum.
    fn validate(
        data: &[i32],
        base: usize,
        max_eff_len: usize,
        metadata: ClauseMetadata,
    ) -> ShareResult<usize> {
        let width = metadata.width();
        let mut pos = 0usize;
        let mut eff = 0usize;
        let mut total = 0usize;

        while pos < data.len() {
            eff += 1;
            if eff > max_eff_len {
                return Err(ShareError::MalformedBuffer {
                    offset: base + pos,
                    reason: format!("clause class {} exceeds maximum length {}", eff, max_eff_len),
                });
            }
            let count = data[pos];
            if count < 0 {
                return Err(ShareError::MalformedBuffer {
                    offset: base + pos,
                    reason: format!("negative clause count {}", count),
                });
            }
            pos += 1;

            let clause_ints = width + eff + 1;
            let needed = (count as usize).checked_mul(clause_ints).ok_or_else(|| {
                ShareError::MalformedBuffer {
                    offset: base + pos - 1,
                    reason: format!("clause count {} overflows", count),
                }
            })?;
            if needed > data.len() - pos {
                return Err(ShareError::TruncatedBuffer {
                    offset: base + pos,
                    needed,
                    available: data.len() - pos,
                });
            }

            for chunk in data[pos..pos + needed].chunks_exact(clause_ints) {
                if let Some((lbd, lits)) = chunk.split_last() {
                    Clause::new(lits, *lbd as u32, metadata)?;
                }
            }
            pos += needed;
            total += count as usize;
        }

        Ok(total)
    }

    /// Next clause, or `None` once the buffer is exhausted.
    pub fn decode_next(&mut self) -> Option<Clause<'a>> {
        while self.left_in_class == 0 {
            if self.pos >= self.data.len() {
                return None;
            }
            self.class += 1;
            self.left_in_class = self.data[self.pos] as usize;
            self.pos += 1;
        }

        let len = self.prefix + self.class;
        let lits = &self.data[self.pos..self.pos + len];
        let lbd = self.data[self.pos + len];
        self.pos += len + 1;
        self.left_in_class -= 1;
        self.remaining -= 1;

        Some(Clause::from_parts(lits, lbd as u16, self.prefix as u16))
    }

    /// Clauses not yet decoded.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl<'a> Iterator for BufferReader<'a> {
    type Item = Clause<'a>;

    fn next(&mut self) -> Option<Clause<'a>> {
        self.decode_next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for BufferReader<'_> {}
