// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! A minimal row-major RGB pixel buffer. PNG/format codecs are out of
//! scope here — callers decode whatever image format upstream and hand in
//! raw RGB bytes.

/// Row-major RGB pixel data, 3 bytes per pixel, no alpha channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbImage {
    /// Builds an image from `width × height × 3` row-major RGB bytes.
    ///
    /// # Panics
    ///
    /// Panics if `pixels.len() != width * height * 3`.
    #[must_use]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), width as usize * height as usize * 3, "pixel buffer size mismatch");
        Self { width, height, pixels }
    }

    /// Total number of channel bytes (`3 · width · height`) available as LSB slots.
    #[must_use]
    pub fn channel_capacity(&self) -> u64 {
        3 * u64::from(self.width) * u64::from(self.height)
    }
}
