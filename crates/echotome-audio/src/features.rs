// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! [C1] Audio Features: framing, RMS, spectral centroid/flux, and the
//! canonical `feature_hash`.

use crate::framing::{frame_signal, hann_window};
use echotome_core::error::{EchotomeError, Result};
use rustfft::{num_complex::Complex32, FftPlanner};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Default sample rate, in Hz, that all enrolled audio is resampled to upstream.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
/// Default frame size, in samples.
pub const DEFAULT_FRAME_SIZE: usize = 512;
/// Default hop size, in samples.
pub const DEFAULT_HOP_SIZE: usize = 256;
/// Minimum number of frames required to compute a `feature_hash`.
pub const MIN_FRAMES_FOR_HASH: usize = 4;
/// Number of low spectral bins averaged into the `feature_hash` recipe.
const HASH_SPECTRAL_BINS: usize = 32;

/// Derived audio features over a full signal.
#[derive(Debug, Clone)]
pub struct AudioFeatures {
    pub sample_rate: u32,
    pub frame_size: usize,
    pub hop_size: usize,
    /// Per-frame magnitude spectrum, length `frame_size / 2 + 1` each.
    pub spectral_map: Vec<Vec<f32>>,
    /// Per-frame RMS energy.
    pub rms_envelope: Vec<f32>,
    /// Per-frame magnitude-weighted mean bin frequency, in Hz.
    pub spectral_centroid_series: Vec<f32>,
    /// Per-frame L2 norm of the positive spectral difference; `flux[0] == 0.0`.
    pub spectral_flux_series: Vec<f32>,
    /// SHA-256 of the canonical reduced-feature serialization.
    pub feature_hash: [u8; 32],
}

impl AudioFeatures {
    /// Number of frames the signal was split into.
    #[must_use]
    pub fn n_frames(&self) -> usize {
        self.rms_envelope.len()
    }
}

fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = frame.iter().map(|&x| x * x).sum();
    (sum_sq / frame.len() as f32).sqrt()
}

fn magnitude_spectrum(frame: &[f32], window: &[f32], fft: &dyn rustfft::Fft<f32>) -> Vec<f32> {
    let mut buf: Vec<Complex32> =
        frame.iter().zip(window).map(|(&s, &w)| Complex32::new(s * w, 0.0)).collect();
    fft.process(&mut buf);
    let half = frame.len() / 2 + 1;
    buf[..half].iter().map(Complex32::norm).collect()
}

fn spectral_centroid(spectrum: &[f32], sample_rate: u32, frame_size: usize) -> f32 {
    let mut weighted_sum = 0.0f64;
    let mut mag_sum = 0.0f64;
    for (k, &mag) in spectrum.iter().enumerate() {
        let freq = (k as f64) * f64::from(sample_rate) / frame_size as f64;
        weighted_sum += freq * f64::from(mag);
        mag_sum += f64::from(mag);
    }
    if mag_sum <= f64::EPSILON {
        0.0
    } else {
        (weighted_sum / mag_sum) as f32
    }
}

fn spectral_flux(prev: &[f32], curr: &[f32]) -> f32 {
    let sum_sq: f32 =
        prev.iter().zip(curr).map(|(&p, &c)| { let d = (c - p).max(0.0); d * d }).sum();
    sum_sq.sqrt()
}

fn mean(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64
}

fn variance(values: &[f32], m: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| (f64::from(v) - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// The fixed, normative canonical-bytes recipe for `feature_hash`: sample
/// rate/frame size/hop size as u32 LE,
/// then float32-LE means/variances of RMS, centroid, flux, then the
/// frame-averaged magnitude of the first 32 spectral bins.
fn canonical_feature_bytes(
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
    rms_envelope: &[f32],
    centroid_series: &[f32],
    flux_series: &[f32],
    spectral_map: &[Vec<f32>],
) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(frame_size as u32).to_le_bytes());
    bytes.extend_from_slice(&(hop_size as u32).to_le_bytes());

    let rms_mean = mean(rms_envelope);
    let rms_var = variance(rms_envelope, rms_mean);
    let cen_mean = mean(centroid_series);
    let cen_var = variance(centroid_series, cen_mean);
    let flux_mean = mean(flux_series);
    let flux_var = variance(flux_series, flux_mean);

    for v in [rms_mean, rms_var, cen_mean, cen_var, flux_mean, flux_var] {
        bytes.extend_from_slice(&(v as f32).to_le_bytes());
    }

    for bin in 0..HASH_SPECTRAL_BINS {
        let mut acc = 0.0f64;
        let mut count = 0u32;
        for frame in spectral_map {
            if let Some(&mag) = frame.get(bin) {
                acc += f64::from(mag);
                count += 1;
            }
        }
        let avg = if count == 0 { 0.0 } else { (acc / f64::from(count)) as f32 };
        bytes.extend_from_slice(&avg.to_le_bytes());
    }

    bytes
}

/// Computes [`AudioFeatures`] for a mono PCM signal.
///
/// # Errors
///
/// Returns [`EchotomeError::InvalidInput`] if fewer than
/// [`MIN_FRAMES_FOR_HASH`] frames are available.
pub fn compute_audio_features(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
) -> Result<AudioFeatures> {
    let frames = frame_signal(samples, frame_size, hop_size);
    if frames.len() < MIN_FRAMES_FOR_HASH {
        return Err(EchotomeError::InvalidInput(format!(
            "audio yields {} frames, need at least {MIN_FRAMES_FOR_HASH}",
            frames.len()
        )));
    }

    let window = hann_window(frame_size);
    let mut planner = FftPlanner::<f32>::new();
    let fft: Arc<dyn rustfft::Fft<f32>> = planner.plan_fft_forward(frame_size);

    let rms_envelope: Vec<f32> = frames.iter().map(|f| rms(f)).collect();
    let spectral_map: Vec<Vec<f32>> =
        frames.iter().map(|f| magnitude_spectrum(f, &window, fft.as_ref())).collect();
    let spectral_centroid_series: Vec<f32> = spectral_map
        .iter()
        .map(|s| spectral_centroid(s, sample_rate, frame_size))
        .collect();

    let mut spectral_flux_series = vec![0.0f32; spectral_map.len()];
    for i in 1..spectral_map.len() {
        spectral_flux_series[i] = spectral_flux(&spectral_map[i - 1], &spectral_map[i]);
    }

    let canonical = canonical_feature_bytes(
        sample_rate,
        frame_size,
        hop_size,
        &rms_envelope,
        &spectral_centroid_series,
        &spectral_flux_series,
        &spectral_map,
    );
    let feature_hash: [u8; 32] = Sha256::digest(&canonical).into();

    tracing::debug!(
        n_frames = frames.len(),
        sample_rate,
        frame_size,
        hop_size,
        "computed audio features"
    );

    Ok(AudioFeatures {
        sample_rate,
        frame_size,
        hop_size,
        spectral_map,
        rms_envelope,
        spectral_centroid_series,
        spectral_flux_series,
        feature_hash,
    })
}
