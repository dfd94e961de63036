// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Fixed-size framing of mono PCM over a sliding window.

/// Splits `samples` into `frame_size`-sample windows advanced by `hop_size`.
///
/// The final partial frame (if any samples remain once no full frame can be
/// taken) is zero-padded to `frame_size`. Always returns at least one frame
/// unless `samples` is empty.
#[must_use]
pub fn frame_signal(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<Vec<f32>> {
    if samples.is_empty() || frame_size == 0 {
        return Vec::new();
    }

    let mut frames = Vec::new();
    let mut start = 0usize;
    loop {
        let end = start + frame_size;
        let mut frame = vec![0.0f32; frame_size];
        if start >= samples.len() {
            break;
        }
        let available_end = end.min(samples.len());
        frame[..available_end - start].copy_from_slice(&samples[start..available_end]);
        frames.push(frame);
        if end >= samples.len() {
            break;
        }
        start += hop_size;
    }
    frames
}

/// A periodic Hann window of length `n`, `w[i] = 0.5 * (1 - cos(2*pi*i/(n-1)))`.
#[must_use]
pub fn hann_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f32;
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * (i as f32) / denom;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}
