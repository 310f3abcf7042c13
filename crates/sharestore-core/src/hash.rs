//! Clause hashing
//!
//! Two contracts feed different consumers:
//!
//! - [`order_independent_hash`] XOR-folds a per-literal mix, so any
//!   permutation of the same literal multiset hashes identically. Dedup
//!   containers use it so learn order does not matter.
//! - [`order_sensitive_hash`] folds literals sequentially, so it keys exact
//!   sequence identity.
//!
//! Both skip the metadata prefix. [`ClauseHash`] routes units, raw literal
//! sequences and clause views through the order-independent hash with the
//! same default salt, keeping every dedup container interoperable.

use std::hash::{BuildHasherDefault, Hash, Hasher};

use crate::clause::{Clause, OwnedClause};

/// Salt used by every [`ClauseHash`] implementation.
pub const DEFAULT_SALT: i32 = 3;

const PRIMES: [u32; 16] = [
    2038072819, 2038073287, 2038073761, 2038074317,
    2038072823, 2038073321, 2038073767, 2038074319,
    2038072847, 2038073341, 2038073789, 2038074329,
    2038074751, 2038075231, 2038075751, 2038076267,
];

/// Permutation-invariant hash of the literals after `prefix`.
///
/// Each literal is multiplied by its prime as a 32-bit unsigned product and
/// zero-extended before folding.
pub fn order_independent_hash(literals: &[i32], prefix: usize, salt: i32) -> u64 {
    let mut res = 1u64;
    for &lit in &literals[prefix..] {
        let prime = PRIMES[((lit ^ salt) & 15) as usize];
        res ^= (lit as u32).wrapping_mul(prime) as u64;
    }
    res
}

/// Sequence-sensitive hash of the literals after `prefix`.
pub fn order_sensitive_hash(literals: &[i32], prefix: usize, salt: i32) -> u64 {
    let mut res = mix64((literals.len() as i64).wrapping_mul(salt as i64) as u64);
    for &lit in &literals[prefix..] {
        hash_combine(&mut res, lit);
    }
    res
}

/// 64-bit finalizer (murmur3 fmix64).
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

fn hash_combine(seed: &mut u64, lit: i32) {
    let h = mix64(lit as i64 as u64);
    *seed ^= h
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}

/// Order-independent clause hash with the shared default salt.
pub trait ClauseHash {
    fn clause_hash_salted(&self, salt: i32) -> u64;

    fn clause_hash(&self) -> u64 {
        self.clause_hash_salted(DEFAULT_SALT)
    }
}

/// A unit clause.
impl ClauseHash for i32 {
    fn clause_hash_salted(&self, salt: i32) -> u64 {
        order_independent_hash(std::slice::from_ref(self), 0, salt)
    }
}

/// A raw literal sequence without metadata.
impl ClauseHash for [i32] {
    fn clause_hash_salted(&self, salt: i32) -> u64 {
        order_independent_hash(self, 0, salt)
    }
}

impl ClauseHash for Vec<i32> {
    fn clause_hash_salted(&self, salt: i32) -> u64 {
        self.as_slice().clause_hash_salted(salt)
    }
}

impl ClauseHash for Clause<'_> {
    fn clause_hash_salted(&self, salt: i32) -> u64 {
        order_independent_hash(self.literals(), self.prefix_width(), salt)
    }
}

impl ClauseHash for OwnedClause {
    fn clause_hash_salted(&self, salt: i32) -> u64 {
        self.as_clause().clause_hash_salted(salt)
    }
}

/// Key for exact-content containers: equal iff same length and the same
/// literal sequence after the metadata prefix. LBD and metadata are ignored.
#[derive(Debug, Clone, Copy)]
pub struct ExactClause<'a>(pub Clause<'a>);

impl PartialEq for ExactClause<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.body() == other.0.body()
    }
}

impl Eq for ExactClause<'_> {}

impl Hash for ExactClause<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(order_sensitive_hash(
            self.0.literals(),
            self.0.prefix_width(),
            DEFAULT_SALT,
        ));
    }
}

/// Hasher for keys that already wrote a finished 64-bit clause hash.
///
/// Clause keys hash themselves through `write_u64`; the value is run through
/// the 64-bit finalizer so the top bits hashbrown uses as slot tags are
/// populated. Other inputs are folded with FNV-1a and the same finalizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClauseHasher {
    state: u64,
}

impl Hasher for ClauseHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        let mut h = 0xcbf2_9ce4_8422_2325u64 ^ self.state;
        for &b in bytes {
            h ^= b as u64;
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        self.state = mix64(h);
    }

    fn write_u64(&mut self, value: u64) {
        self.state = mix64(self.state ^ value);
    }
}

/// `BuildHasher` for hash containers keyed by clauses.
pub type BuildClauseHasher = BuildHasherDefault<ClauseHasher>;
