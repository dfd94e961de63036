// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Content-addressed hashing of raw audio, independent of `feature_hash`.
//!
//! `feature_hash` (in [`crate::features`]) summarizes derived spectral
//! statistics and is what AF-KDF mixes into the master key. `audio_hash`
//! is a plain content hash of the samples a ritual certificate binds to,
//! used only to detect whether the claimed audio file has changed at all.

use sha2::{Digest, Sha256};

const AUDIO_HASH_DOMAIN: &[u8] = b"echotome-audio-hash-v1";

/// `SHA256(domain || samples as float32-LE)`.
#[must_use]
pub fn audio_hash(samples: &[f32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(AUDIO_HASH_DOMAIN);
    for sample in samples {
        hasher.update(sample.to_le_bytes());
    }
    hasher.finalize().into()
}
