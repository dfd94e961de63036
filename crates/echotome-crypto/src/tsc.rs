// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! [C4] Temporal Salt Chain: a SHA-256 hash chain over active frames in
//! order, salted by the device public key and track length.

use echotome_core::error::{EchotomeError, Result};
use ed25519_dalek::VerifyingKey;
use sha2::{Digest, Sha256};
use std::time::Duration;
use subtle::ConstantTimeEq;

const TSC_DOMAIN: &[u8] = b"echotome-tsc-v1";

/// Per-frame digest: SHA-256 over the frame's float32-LE samples.
fn per_frame_digest(frame: &[f32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for sample in frame {
        hasher.update(sample.to_le_bytes());
    }
    hasher.finalize().into()
}

/// A single step of the Temporal Salt Chain streaming state machine.
///
/// Frame indices fed via [`Self::add_frame`] must be strictly increasing;
/// out-of-order or duplicated indices fail with
/// [`EchotomeError::OrderingError`].
pub struct TscStreamer {
    state: [u8; 32],
    last_index: Option<u32>,
}

impl TscStreamer {
    /// Initializes the chain: `h = SHA256(domain || owner_pub || track_length_le)`.
    #[must_use]
    pub fn init(owner_pub: &VerifyingKey, track_length_samples: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(TSC_DOMAIN);
        hasher.update(owner_pub.as_bytes());
        hasher.update(track_length_samples.to_le_bytes());
        Self { state: hasher.finalize().into(), last_index: None }
    }

    /// Folds frame `index` (starting time `t_ms` from the region origin)
    /// into the chain.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::OrderingError`] if `index` is not
    /// strictly greater than the previously added index.
    pub fn add_frame(&mut self, index: u32, t_ms: u64, frame: &[f32]) -> Result<()> {
        if let Some(last) = self.last_index {
            if index <= last {
                return Err(EchotomeError::OrderingError { index });
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(self.state);
        hasher.update(index.to_le_bytes());
        hasher.update(t_ms.to_le_bytes());
        hasher.update(per_frame_digest(frame));
        self.state = hasher.finalize().into();
        self.last_index = Some(index);
        Ok(())
    }

    /// Finalizes the chain, returning the 32-byte TemporalHash.
    #[must_use]
    pub fn finalize(self) -> [u8; 32] {
        self.state
    }
}

/// Computes the TemporalHash in one call over `frames` (in active-region
/// order), with frame `i`'s start time `i * hop_ms` milliseconds from the
/// region origin. Delegates to [`TscStreamer`] so the one-shot and
/// streaming paths can never diverge.
///
/// # Errors
///
/// Propagates [`EchotomeError::OrderingError`] (unreachable in practice
/// since indices here are generated in order, but kept so the streaming
/// invariant is enforced identically in both paths).
pub fn temporal_salt_chain(
    owner_pub: &VerifyingKey,
    track_length_samples: u64,
    hop_size: usize,
    sample_rate: u32,
    frames: &[Vec<f32>],
) -> Result<[u8; 32]> {
    let mut streamer = TscStreamer::init(owner_pub, track_length_samples);
    let ms_per_hop = (f64::from(hop_size as u32) * 1000.0) / f64::from(sample_rate);
    for (i, frame) in frames.iter().enumerate() {
        let t_ms = (i as f64 * ms_per_hop) as u64;
        streamer.add_frame(i as u32, t_ms, frame)?;
    }
    Ok(streamer.finalize())
}

/// Result of [`verify_temporal_consistency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalVerification {
    pub hash_matches: bool,
    pub speed_ratio: f64,
    pub speed_in_range: bool,
}

impl TemporalVerification {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.hash_matches && self.speed_in_range
    }
}

/// Lower bound of the accepted playback-speed ratio.
pub const SPEED_RATIO_MIN: f64 = 0.8;
/// Upper bound of the accepted playback-speed ratio.
pub const SPEED_RATIO_MAX: f64 = 1.2;

/// Re-runs the Temporal Salt Chain over a live active region and compares
/// it against `expected_hash` in constant time, then independently checks
/// the elapsed wall-clock ratio against `track_length_samples / sample_rate`.
///
/// # Errors
///
/// Returns [`EchotomeError::TemporalMismatch`] if the hash doesn't match
/// or the speed ratio falls outside `[0.8, 1.2]`.
pub fn verify_temporal_consistency(
    expected_hash: &[u8; 32],
    owner_pub: &VerifyingKey,
    track_length_samples: u64,
    sample_rate: u32,
    hop_size: usize,
    live_region_frames: &[Vec<f32>],
    elapsed: Duration,
) -> Result<TemporalVerification> {
    let live_hash =
        temporal_salt_chain(owner_pub, track_length_samples, hop_size, sample_rate, live_region_frames)?;
    let hash_matches = bool::from(live_hash.ct_eq(expected_hash));

    let expected_duration_secs = track_length_samples as f64 / f64::from(sample_rate);
    let speed_ratio = if expected_duration_secs <= f64::EPSILON {
        0.0
    } else {
        expected_duration_secs / elapsed.as_secs_f64()
    };
    let speed_in_range = (SPEED_RATIO_MIN..=SPEED_RATIO_MAX).contains(&speed_ratio);

    let result = TemporalVerification { hash_matches, speed_ratio, speed_in_range };
    if result.is_consistent() {
        Ok(result)
    } else {
        Err(EchotomeError::TemporalMismatch)
    }
}
