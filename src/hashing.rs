//! This module provides a deterministic hasher and `HashMap` and `HashSet` variants that use
//! it. The hashing data structures in the standard library are not deterministic:
//!
//! > By default, HashMap uses a hashing algorithm selected to provide
//! > resistance against HashDoS attacks. The algorithm is randomly seeded, and a
//! > reasonable best-effort is made to generate this seed from a high quality,
//! > secure source of randomness provided by the host without blocking the program.
//!
//! Two runs with the same seed must produce byte-identical results, so anything that is
//! iterated during a run uses these types instead.
//!
//! The `hash_str` and `hash_key` free functions are used in `crate::random` to derive the seed of
//! each named random number stream and of each keyed sub-stream.

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

/// A convenience method to compute the hash of a `&str`.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

/// Mixes a 64-bit key into a seed. Distinct keys give unrelated outputs, which is what keyed
/// random sub-streams need.
#[must_use]
pub fn hash_key(seed: u64, key: u64) -> u64 {
    xxh3_64_with_seed(&key.to_le_bytes(), seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_strings() {
        let a = hash_str("hello");
        let b = hash_str("hello");
        let c = hash_str("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hashes_keys() {
        assert_eq!(hash_key(7, 42), hash_key(7, 42));
        assert_ne!(hash_key(7, 42), hash_key(7, 43));
        assert_ne!(hash_key(7, 42), hash_key(8, 42));
    }
}
