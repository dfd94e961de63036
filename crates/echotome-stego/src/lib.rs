// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! LSB steganographic payload embedding/extraction over RGB images.

pub mod image;
pub mod lsb;

pub use image::RgbImage;
pub use lsb::{embed, extract};
