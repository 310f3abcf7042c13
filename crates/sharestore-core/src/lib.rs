//! ShareStore Core — Concurrent Clause-Sharing Store
//!
//! The store between the solver threads of a parallel portfolio SAT solver
//! and the clause exchange with peer solvers. Producers offer short learned
//! clauses concurrently; an exporter periodically drains a budgeted,
//! canonically ordered, serialized buffer for broadcast.
//!
//! # Architecture
//!
//! - **Insert path**: filter → `BucketStore::add_clause`, a non-blocking
//!   try-lock into a fixed-capacity bucket per clause length
//! - **Export path**: `BucketStore::export_buffer` drains shortest clauses
//!   first, sorts them canonically and encodes them with `BufferBuilder`
//! - **Import path**: `BucketStore::add_clauses` decodes an incoming buffer
//!   with `BufferReader` and offers every clause
//!
//! # Opaque Literals
//!
//! Literals are non-zero `i32`s with no solver semantics attached, optionally
//! preceded by a fixed-width metadata prefix (clause id, signature).

pub mod arena;
pub mod buffer;
pub mod clause;
pub mod config;
pub mod error;
pub mod filter;
pub mod hash;
pub mod histogram;
pub mod metadata;
pub mod store;

// Re-export key types for convenience
pub use arena::{ArenaSlot, ClauseArena};
pub use buffer::{BufferBuilder, BufferReader};
pub use clause::{Clause, OwnedClause};
pub use config::Config;
pub use error::{ShareError, ShareResult};
pub use filter::{AdmissionResult, AnyFilter, ClauseFilter, DedupFilter, NoopFilter, ProducedClause, ProducerSet};
pub use hash::{order_independent_hash, order_sensitive_hash, ClauseHash, ExactClause};
pub use histogram::ClauseHistogram;
pub use metadata::ClauseMetadata;
pub use store::{BucketStore, ExportMode, ExportedBuffer};
