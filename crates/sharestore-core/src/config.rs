//! Configuration management for ShareStore
//!
//! Provides bucket sizing presets for different hardware classes. All
//! fields are public so callers can start from a preset and adjust it.

use crate::metadata::ClauseMetadata;

/// Largest supported clause length in ints (metadata prefix included).
pub const MAX_CLAUSE_INTS: usize = u16::MAX as usize;

/// ShareStore configuration with bucket sizing presets
#[derive(Debug, Clone)]
pub struct Config {
    /// Longest clause (literals only, metadata excluded) the store admits
    pub max_eff_clause_length: usize,
    /// Capacity of every length bucket in ints (literals + one lbd int per clause)
    pub bucket_size: usize,
    /// Report each exported clause with lbd = length
    pub reset_lbd_at_export: bool,
    /// Metadata prefix carried by every clause
    pub metadata: ClauseMetadata,
    /// Prefix exported buffers with a CRC32C checksum
    pub buffer_checksums: bool,
    /// Clauses a dedup filter remembers before it forgets them all
    pub dedup_capacity: usize,
}

impl Config {
    /// Server-class: long clauses, 4MB per bucket
    pub fn server() -> Self {
        Self {
            max_eff_clause_length: 60,
            bucket_size: 1 << 20,
            reset_lbd_at_export: false,
            metadata: ClauseMetadata::none(),
            buffer_checksums: false,
            dedup_capacity: 1 << 20,
        }
    }

    /// Desktop-class: 512KB per bucket
    pub fn desktop() -> Self {
        Self {
            max_eff_clause_length: 30,
            bucket_size: 1 << 17,
            reset_lbd_at_export: false,
            metadata: ClauseMetadata::none(),
            buffer_checksums: false,
            dedup_capacity: 1 << 18,
        }
    }

    /// Budget-class: short clauses only, 64KB per bucket
    pub fn budget() -> Self {
        Self {
            max_eff_clause_length: 20,
            bucket_size: 1 << 14,
            reset_lbd_at_export: false,
            metadata: ClauseMetadata::none(),
            buffer_checksums: false,
            dedup_capacity: 1 << 16,
        }
    }

    /// Longest clause in ints, metadata prefix included.
    pub fn max_clause_ints(&self) -> usize {
        self.max_eff_clause_length + self.metadata.width()
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.max_eff_clause_length == 0 {
            return Err("max_eff_clause_length must be > 0".into());
        }
        if self.max_clause_ints() > MAX_CLAUSE_INTS {
            return Err(format!(
                "max_eff_clause_length + metadata width must be <= {}",
                MAX_CLAUSE_INTS
            ));
        }
        // A bucket must hold at least one clause of maximum length plus its lbd
        if self.bucket_size < self.max_clause_ints() + 1 {
            return Err(format!(
                "bucket_size must be >= {} (one clause of maximum length)",
                self.max_clause_ints() + 1
            ));
        }
        if self.bucket_size > i32::MAX as usize {
            return Err("bucket_size must fit in an i32".into());
        }
        if self.dedup_capacity == 0 {
            return Err("dedup_capacity must be > 0".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self { Self::server() }
}
