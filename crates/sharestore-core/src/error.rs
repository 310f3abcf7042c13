//! Error types for ShareStore operations
//!
//! Ordinary backpressure (a busy store, a full bucket) is never an error and
//! is reported through `bool` results. `ShareError` covers recoverable input
//! problems: malformed candidate clauses, corrupted incoming buffers and
//! invalid configurations.

use std::error::Error;
use std::fmt;

/// ShareStore error types with detailed context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// A clause violates one of the clause invariants
    InvalidClause {
        /// Number of ints in the clause, metadata prefix included
        length: usize,
        /// LBD value the clause was offered with
        lbd: u32,
        /// Human-readable description of the violated invariant
        reason: String,
    },

    /// Checksum verification of an incoming buffer failed
    ChecksumMismatch {
        /// Checksum stored in the buffer
        expected: u32,
        /// Checksum computed over the buffer payload
        actual: u32,
    },

    /// Incoming buffer ends in the middle of a clause class
    TruncatedBuffer {
        /// Int offset where the missing data should start
        offset: usize,
        /// Number of ints required
        needed: usize,
        /// Number of ints actually available
        available: usize,
    },

    /// Incoming buffer is structurally invalid
    MalformedBuffer {
        /// Int offset where the problem was detected
        offset: usize,
        /// Description of the problem
        reason: String,
    },

    /// Configuration rejected by `Config::validate`
    InvalidConfig {
        /// Reason reported by validation
        reason: String,
    },
}

impl fmt::Display for ShareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareError::InvalidClause { length, lbd, reason } => {
                write!(f, "Invalid clause (length {}, lbd {}): {}", length, lbd, reason)
            }

            ShareError::ChecksumMismatch { expected, actual } => {
                write!(f, "Buffer checksum mismatch: expected 0x{:08x}, got 0x{:08x}",
                       expected, actual)
            }

            ShareError::TruncatedBuffer { offset, needed, available } => {
                write!(f, "Truncated buffer at offset {}: need {} ints, only {} available",
                       offset, needed, available)
            }

            ShareError::MalformedBuffer { offset, reason } => {
                write!(f, "Malformed buffer at offset {}: {}", offset, reason)
            }

            ShareError::InvalidConfig { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
        }
    }
}

impl Error for ShareError {}

/// Result type alias for ShareStore operations
pub type ShareResult<T> = Result<T, ShareError>;
