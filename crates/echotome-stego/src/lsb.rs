// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! LSB embed/extract of a framed payload over an [`RgbImage`]'s channel bytes.

use crate::image::RgbImage;
use echotome_core::error::{EchotomeError, Result};

const MAGIC: &[u8; 4] = b"ECHS";
const HEADER_LEN: usize = 4 + 4 + 4; // magic + u32 len + crc32

fn frame_payload(payload: &[u8]) -> Vec<u8> {
    let crc = crc32fast::hash(payload);
    let mut framed = Vec::with_capacity(HEADER_LEN + payload.len());
    framed.extend_from_slice(MAGIC);
    framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    framed.extend_from_slice(&crc.to_le_bytes());
    framed.extend_from_slice(payload);
    framed
}

fn bits_msb_first(bytes: &[u8]) -> impl Iterator<Item = u8> + '_ {
    bytes.iter().flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1))
}

/// Embeds UTF-8 `payload` into `image`'s pixel LSBs, in place, row-major,
/// `(R, G, B)` per pixel.
///
/// # Errors
///
/// Returns [`EchotomeError::CapacityExceeded`] if the framed payload
/// (header + bytes) needs more bits than the image has channel bytes.
pub fn embed(image: &mut RgbImage, payload: &[u8]) -> Result<()> {
    let framed = frame_payload(payload);
    let needed_bits = 8u64 * framed.len() as u64;
    if needed_bits > image.channel_capacity() {
        return Err(EchotomeError::CapacityExceeded);
    }

    for (bit, channel_byte) in bits_msb_first(&framed).zip(image.pixels.iter_mut()) {
        *channel_byte = (*channel_byte & !1) | bit;
    }

    tracing::debug!(payload_len = payload.len(), "embedded steganographic payload");
    Ok(())
}

/// Extracts and validates the payload embedded by [`embed`].
///
/// # Errors
///
/// Returns [`EchotomeError::PayloadTruncated`] if the declared length
/// exceeds the image's remaining capacity, and
/// [`EchotomeError::PayloadCorrupt`] if the magic or CRC does not match.
pub fn extract(image: &RgbImage) -> Result<Vec<u8>> {
    let total_bits = image.channel_capacity();
    if total_bits < 8 * HEADER_LEN as u64 {
        return Err(EchotomeError::PayloadTruncated);
    }

    let header_bytes = bits_to_bytes(image, 0, HEADER_LEN);
    if &header_bytes[..4] != MAGIC {
        return Err(EchotomeError::PayloadCorrupt);
    }
    let declared_len = u32::from_le_bytes(header_bytes[4..8].try_into().expect("4 bytes")) as u64;
    let declared_crc = u32::from_le_bytes(header_bytes[8..12].try_into().expect("4 bytes"));

    let needed_bits = 8 * (HEADER_LEN as u64 + declared_len);
    if needed_bits > total_bits {
        return Err(EchotomeError::PayloadTruncated);
    }

    let payload = bits_to_bytes(image, 8 * HEADER_LEN, declared_len as usize);
    if crc32fast::hash(&payload) != declared_crc {
        return Err(EchotomeError::PayloadCorrupt);
    }

    Ok(payload)
}

fn bits_to_bytes(image: &RgbImage, start_bit: u64, n_bytes: usize) -> Vec<u8> {
    let mut out = vec![0u8; n_bytes];
    let mut bit_index = start_bit;
    for byte in &mut out {
        let mut value = 0u8;
        for _ in 0..8 {
            let channel = image.pixels[bit_index as usize] & 1;
            value = (value << 1) | channel;
            bit_index += 1;
        }
        *byte = value;
    }
    out
}
