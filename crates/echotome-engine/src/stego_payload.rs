// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The small JSON document embedded in a sigil image: enough to recover
//! the master key and cross-check against the Ritual Ownership
//! Certificate, without storing anything that survives on its own.

use echotome_core::canonical::b64url;
use echotome_core::error::{EchotomeError, Result};
use echotome_stego::{embed, extract, RgbImage};
use serde::{Deserialize, Serialize};

/// The only `version` value this build understands.
pub const STEGO_PAYLOAD_VERSION: &str = "steg-1";

/// The document embedded into a vault's sigil image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StegoPayload {
    pub rune_id: String,
    /// The master key, sealed under the ritual's effective encryption key.
    #[serde(with = "b64url")]
    pub enc_mk: Vec<u8>,
    /// `SHA256` of the canonical Ritual Ownership Certificate bytes, for
    /// cross-checking against the certificate loaded from `rituals_dir`.
    #[serde(with = "b64url")]
    pub roc_hash: Vec<u8>,
    /// The first track's Ritual Imprint Vector, matched bit-for-bit
    /// against the certificate's own copy.
    #[serde(with = "b64url")]
    pub riv: Vec<u8>,
    pub version: String,
}

/// Serializes `payload` to canonical JSON and embeds it into `image`'s
/// pixel LSBs, in place.
///
/// # Errors
///
/// Propagates [`EchotomeError::CapacityExceeded`] from
/// [`echotome_stego::embed`] if `image` is too small.
pub fn embed_payload(image: &mut RgbImage, payload: &StegoPayload) -> Result<()> {
    let bytes = serde_json::to_vec(payload)
        .map_err(|e| EchotomeError::InvalidInput(format!("payload is not serializable: {e}")))?;
    embed(image, &bytes)
}

/// Extracts and parses the payload embedded by [`embed_payload`].
///
/// # Errors
///
/// Propagates [`EchotomeError::PayloadCorrupt`]/[`EchotomeError::PayloadTruncated`]
/// from [`echotome_stego::extract`], or [`EchotomeError::InvalidInput`] if
/// the recovered bytes aren't a well-formed payload.
pub fn extract_payload(image: &RgbImage) -> Result<StegoPayload> {
    let bytes = extract(image)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| EchotomeError::InvalidInput(format!("malformed steganographic payload: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn blank_image(width: u32, height: u32) -> RgbImage {
        RgbImage::new(width, height, vec![0u8; (width * height * 3) as usize])
    }

    #[test]
    fn embed_then_extract_round_trips() {
        let mut image = blank_image(64, 64);
        let payload = StegoPayload {
            rune_id: "ECH-ABCD1234".to_string(),
            enc_mk: vec![1, 2, 3, 4],
            roc_hash: vec![5u8; 32],
            riv: vec![6u8; 32],
            version: STEGO_PAYLOAD_VERSION.to_string(),
        };
        embed_payload(&mut image, &payload).expect("embeds");
        let extracted = extract_payload(&image).expect("extracts");
        assert_eq!(extracted, payload);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut image = blank_image(2, 2);
        let payload = StegoPayload {
            rune_id: "ECH-ABCD1234".to_string(),
            enc_mk: vec![0u8; 4096],
            roc_hash: vec![0u8; 32],
            riv: vec![0u8; 32],
            version: STEGO_PAYLOAD_VERSION.to_string(),
        };
        let err = embed_payload(&mut image, &payload).unwrap_err();
        assert!(matches!(err, EchotomeError::CapacityExceeded));
    }
}
