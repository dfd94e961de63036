// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Folds per-track hashes into the single values AF-KDF and the
//! temporal-bound key expect.
//!
//! Neither `feature_hash` nor `temporal_hash` has a defined multi-track
//! combination rule: a single-track ritual degenerates to "use that
//! track's hash directly", and for two or more tracks this folds them,
//! in declared order, into one domain-separated digest — the same
//! hash-chaining idiom used throughout this crate's cryptographic
//! primitives, rather than inventing a second mixing scheme.

use sha2::{Digest, Sha256};

/// Folds `hashes` (one per track, in ritual order) into a single 32-byte
/// value. A single hash is returned unchanged; two or more are chained as
/// `SHA256(domain || h_0 || h_1 || ...)`.
#[must_use]
pub fn fold_hashes(domain: &[u8], hashes: &[[u8; 32]]) -> [u8; 32] {
    match hashes {
        [] => [0u8; 32],
        [single] => *single,
        many => {
            let mut hasher = Sha256::new();
            hasher.update(domain);
            for h in many {
                hasher.update(h);
            }
            hasher.finalize().into()
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn single_hash_passes_through_unchanged() {
        let h = [7u8; 32];
        assert_eq!(fold_hashes(b"domain", &[h]), h);
    }

    #[test]
    fn multiple_hashes_are_order_sensitive() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let forward = fold_hashes(b"domain", &[a, b]);
        let reversed = fold_hashes(b"domain", &[b, a]);
        assert_ne!(forward, reversed);
    }

    #[test]
    fn different_domains_diverge() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let x = fold_hashes(b"domain-a", &[a, b]);
        let y = fold_hashes(b"domain-b", &[a, b]);
        assert_ne!(x, y);
    }
}
