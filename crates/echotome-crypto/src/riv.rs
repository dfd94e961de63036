// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! [C5] Ritual Imprint Vector: a 256-bit fold of audio features and the
//! TemporalHash, used for cross-verification between the ROC and the
//! steganographic payload.

use echotome_audio::AudioFeatures;
use sha2::{Digest, Sha256};

const RIV_DOMAIN: &[u8] = b"echotome-riv-v1";
/// Length, in bytes, of the coarse spectral signature.
const SPECTRAL_SIGNATURE_LEN: usize = 32;
/// Length, in bytes, of the coarse rhythm signature.
const RHYTHM_SIGNATURE_LEN: usize = 16;

fn scale_to_u8(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Reduces the spectral map to a fixed 32-byte signature: each of 32
/// equal-width spectral-bin bands is averaged across all frames, then
/// scaled to `u8` (the fixed, documented recipe).
#[must_use]
pub fn coarse_spectral_signature(spectral_map: &[Vec<f32>]) -> [u8; SPECTRAL_SIGNATURE_LEN] {
    let mut out = [0u8; SPECTRAL_SIGNATURE_LEN];
    let n_bins = spectral_map.first().map_or(0, Vec::len);
    if n_bins == 0 {
        return out;
    }

    let band_width = n_bins.div_ceil(SPECTRAL_SIGNATURE_LEN).max(1);
    for (band, slot) in out.iter_mut().enumerate() {
        let lo = band * band_width;
        let hi = (lo + band_width).min(n_bins);
        if lo >= hi {
            continue;
        }
        let mut acc = 0.0f64;
        let mut count = 0u64;
        for frame in spectral_map {
            for mag in &frame[lo..hi.min(frame.len())] {
                acc += f64::from(*mag);
                count += 1;
            }
        }
        let avg = if count == 0 { 0.0 } else { acc / count as f64 };
        *slot = scale_to_u8(avg);
    }
    out
}

/// Reduces the flux envelope to a fixed 16-byte signature: 16 equal-width
/// time bands, each averaged then scaled to `u8`.
#[must_use]
pub fn coarse_rhythm_signature(flux_series: &[f32]) -> [u8; RHYTHM_SIGNATURE_LEN] {
    let mut out = [0u8; RHYTHM_SIGNATURE_LEN];
    let n = flux_series.len();
    if n == 0 {
        return out;
    }
    let band_width = n.div_ceil(RHYTHM_SIGNATURE_LEN).max(1);
    for (band, slot) in out.iter_mut().enumerate() {
        let lo = band * band_width;
        let hi = (lo + band_width).min(n);
        if lo >= hi {
            continue;
        }
        let avg: f64 = flux_series[lo..hi].iter().map(|&v| f64::from(v)).sum::<f64>()
            / (hi - lo) as f64;
        *slot = scale_to_u8(avg);
    }
    out
}

/// Computes the Ritual Imprint Vector:
/// `SHA256(domain || feature_hash || temporal_hash || spectral_sig || rhythm_sig)`.
#[must_use]
pub fn compute_riv(features: &AudioFeatures, temporal_hash: &[u8; 32]) -> [u8; 32] {
    let spectral_sig = coarse_spectral_signature(&features.spectral_map);
    let rhythm_sig = coarse_rhythm_signature(&features.spectral_flux_series);

    let mut hasher = Sha256::new();
    hasher.update(RIV_DOMAIN);
    hasher.update(features.feature_hash);
    hasher.update(temporal_hash);
    hasher.update(spectral_sig);
    hasher.update(rhythm_sig);
    hasher.finalize().into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use echotome_audio::compute_audio_features;

    fn sine_burst(n: usize, sample_rate: u32, freq: f32) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn riv_is_deterministic() {
        let samples = sine_burst(16_000, 16_000, 440.0);
        let features = compute_audio_features(&samples, 16_000, 512, 256).expect("computes");
        let temporal_hash = [9u8; 32];
        let a = compute_riv(&features, &temporal_hash);
        let b = compute_riv(&features, &temporal_hash);
        assert_eq!(a, b);
    }

    #[test]
    fn riv_differs_for_different_temporal_hash() {
        let samples = sine_burst(16_000, 16_000, 440.0);
        let features = compute_audio_features(&samples, 16_000, 512, 256).expect("computes");
        let a = compute_riv(&features, &[1u8; 32]);
        let b = compute_riv(&features, &[2u8; 32]);
        assert_ne!(a, b);
    }

    #[test]
    fn signatures_have_fixed_length() {
        let samples = sine_burst(16_000, 16_000, 440.0);
        let features = compute_audio_features(&samples, 16_000, 512, 256).expect("computes");
        assert_eq!(coarse_spectral_signature(&features.spectral_map).len(), 32);
        assert_eq!(coarse_rhythm_signature(&features.spectral_flux_series).len(), 16);
    }
}
