// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! [C2] Active Region Detection: hysteresis over a composite activity
//! score to find the single contiguous span of meaningful audio content.

use crate::features::AudioFeatures;
use echotome_core::error::{EchotomeError, Result};

/// Weight of normalized RMS in the composite activity score.
pub const WEIGHT_RMS: f64 = 0.5;
/// Weight of normalized spectral flux in the composite activity score.
pub const WEIGHT_FLUX: f64 = 0.3;
/// Weight of normalized centroid delta in the composite activity score.
pub const WEIGHT_CENTROID: f64 = 0.2;
/// A frame becomes "hot" once its score crosses this threshold.
pub const HIGH_THRESHOLD: f64 = 0.35;
/// A hot frame stays hot until its score drops below this threshold.
pub const LOW_THRESHOLD: f64 = 0.20;
/// Consecutive below-`LOW_THRESHOLD` frames required to release a hot run.
pub const RELEASE_FRAMES: usize = 4;
/// Maximum frame gap between two hot runs that still get merged.
pub const GAP_FRAMES: usize = 8;

/// Minimum number of frames a surviving active region must contain
/// (approximately 100ms of audio at the given sample rate/hop size).
#[must_use]
pub fn min_active_frames(sample_rate: u32, hop_size: usize) -> usize {
    let frames = (0.1 * f64::from(sample_rate)) / hop_size as f64;
    frames.ceil() as usize
}

/// A contiguous, meaningful span of audio, `[start_frame, end_frame)`.
#[derive(Debug, Clone)]
pub struct ActiveRegion {
    pub start_frame: usize,
    pub end_frame: usize,
    /// The frames making up this region (copied from the parent framing).
    pub frames: Vec<Vec<f32>>,
}

impl ActiveRegion {
    /// Number of frames in the region.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end_frame - self.start_frame
    }

    /// Whether the region is empty (always `false` for a validly detected region).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start_frame >= self.end_frame
    }
}

fn min_max_normalize(values: &[f32]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = f64::from(max - min);
    if range <= f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|&v| (f64::from(v) - f64::from(min)) / range).collect()
}

fn centroid_deltas(centroid: &[f32]) -> Vec<f32> {
    let mut deltas = vec![0.0f32; centroid.len()];
    for i in 1..centroid.len() {
        deltas[i] = (centroid[i] - centroid[i - 1]).abs();
    }
    deltas
}

fn composite_scores(features: &AudioFeatures) -> Vec<f64> {
    let rms_norm = min_max_normalize(&features.rms_envelope);
    let flux_norm = min_max_normalize(&features.spectral_flux_series);
    let centroid_deltas = centroid_deltas(&features.spectral_centroid_series);
    let centroid_norm = min_max_normalize(&centroid_deltas);

    (0..features.n_frames())
        .map(|i| {
            WEIGHT_RMS * rms_norm[i] + WEIGHT_FLUX * flux_norm[i] + WEIGHT_CENTROID * centroid_norm[i]
        })
        .collect()
}

/// Applies two-threshold hysteresis to `scores`, returning disjoint
/// `[start, end)` runs of "hot" frames.
fn hysteresis_runs(scores: &[f64]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut hot = false;
    let mut run_start = 0usize;
    let mut below_low_count = 0usize;

    for (i, &score) in scores.iter().enumerate() {
        if hot {
            if score < LOW_THRESHOLD {
                below_low_count += 1;
                if below_low_count >= RELEASE_FRAMES {
                    runs.push((run_start, i + 1 - below_low_count));
                    hot = false;
                    below_low_count = 0;
                }
            } else {
                below_low_count = 0;
            }
        } else if score >= HIGH_THRESHOLD {
            hot = true;
            run_start = i;
            below_low_count = 0;
        }
    }
    if hot {
        runs.push((run_start, scores.len()));
    }
    runs
}

/// Merges hot runs separated by at most [`GAP_FRAMES`].
fn merge_runs(runs: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in runs {
        if let Some(last) = merged.last_mut() {
            if start.saturating_sub(last.1) <= GAP_FRAMES {
                last.1 = end;
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

/// Runs active-region detection over `features`, using the frames in `frames`.
///
/// # Errors
///
/// Returns [`EchotomeError::NoActiveRegion`] if no surviving run reaches
/// [`min_active_frames`].
pub fn detect_active_region(
    features: &AudioFeatures,
    frames: &[Vec<f32>],
) -> Result<ActiveRegion> {
    let scores = composite_scores(features);
    let runs = merge_runs(hysteresis_runs(&scores));

    let min_len = min_active_frames(features.sample_rate, features.hop_size);

    let longest = runs.into_iter().max_by_key(|(start, end)| end - start);

    match longest {
        Some((start, end)) if end - start >= min_len => {
            tracing::debug!(start, end, "active region detected");
            Ok(ActiveRegion { start_frame: start, end_frame: end, frames: frames[start..end].to_vec() })
        },
        _ => Err(EchotomeError::NoActiveRegion),
    }
}
