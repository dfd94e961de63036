// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! AEAD envelope: the on-disk ciphertext container wrapping either
//! XChaCha20-Poly1305 or AES-256-GCM, framed with associated data binding
//! the profile and rune identity to the ciphertext.

use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::XChaCha20Poly1305;
use echotome_core::error::{EchotomeError, Result};
use echotome_core::profile::PrivacyProfile;
use rand_core::RngCore;

const MAGIC: &[u8; 4] = b"ECHO";
const ENVELOPE_VERSION: u8 = 1;
const NONCE_LEN: usize = 24;

/// Algorithm identifiers persisted in the envelope header. XChaCha20-Poly1305
/// is the normative default; AES-256-GCM is wired for explicit opt-in only,
/// there is no automatic fallback between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgorithm {
    XChaCha20Poly1305 = 1,
    Aes256Gcm = 2,
}

impl AeadAlgorithm {
    fn from_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(Self::XChaCha20Poly1305),
            2 => Ok(Self::Aes256Gcm),
            _ => Err(EchotomeError::PayloadCorrupt),
        }
    }
}

/// Builds the associated-data header: `profile_id || rune_id || version`.
fn build_associated_data(profile: PrivacyProfile, rune_id: &str, version: u8) -> Vec<u8> {
    let mut ad = Vec::with_capacity(1 + rune_id.len() + 1);
    ad.push(profile.id());
    ad.extend_from_slice(rune_id.as_bytes());
    ad.push(version);
    ad
}

/// Encrypts `plaintext` under `key`, binding `profile` and `rune_id` as
/// associated data, and frames the result in the envelope wire format:
/// `magic || version || algo_id || profile_id || nonce(24) || ad_len(u32le)
/// || ad || ct_len(u32le) || ciphertext‖tag`.
///
/// # Errors
///
/// Returns [`EchotomeError::AeadFailure`] if encryption fails (should not
/// happen for well-formed keys and plaintext).
pub fn seal(
    key: &[u8; 32],
    algorithm: AeadAlgorithm,
    profile: PrivacyProfile,
    rune_id: &str,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let ad = build_associated_data(profile, rune_id, ENVELOPE_VERSION);
    let ciphertext = encrypt_with(algorithm, key, &nonce, plaintext, &ad)?;

    let mut envelope = Vec::with_capacity(
        4 + 1 + 1 + 1 + NONCE_LEN + 4 + ad.len() + 4 + ciphertext.len(),
    );
    envelope.extend_from_slice(MAGIC);
    envelope.push(ENVELOPE_VERSION);
    envelope.push(algorithm as u8);
    envelope.push(profile.id());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&(ad.len() as u32).to_le_bytes());
    envelope.extend_from_slice(&ad);
    envelope.extend_from_slice(&(ciphertext.len() as u32).to_le_bytes());
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Parses and decrypts an envelope produced by [`seal`].
///
/// # Errors
///
/// Returns [`EchotomeError::PayloadTruncated`] if the envelope is shorter
/// than its declared field lengths, [`EchotomeError::PayloadCorrupt`] if
/// the magic/version/algorithm fields are invalid, and
/// [`EchotomeError::AeadFailure`] if authentication fails.
pub fn open(key: &[u8; 32], envelope: &[u8]) -> Result<Vec<u8>> {
    let mut cursor = 0usize;
    let take = |cursor: &mut usize, n: usize, envelope: &[u8]| -> Result<std::ops::Range<usize>> {
        let end = cursor.checked_add(n).ok_or(EchotomeError::PayloadCorrupt)?;
        if end > envelope.len() {
            return Err(EchotomeError::PayloadTruncated);
        }
        let range = *cursor..end;
        *cursor = end;
        Ok(range)
    };

    let magic_range = take(&mut cursor, 4, envelope)?;
    if &envelope[magic_range] != MAGIC {
        return Err(EchotomeError::PayloadCorrupt);
    }

    let version_range = take(&mut cursor, 1, envelope)?;
    if envelope[version_range][0] != ENVELOPE_VERSION {
        return Err(EchotomeError::PayloadCorrupt);
    }

    let algo_range = take(&mut cursor, 1, envelope)?;
    let algorithm = AeadAlgorithm::from_id(envelope[algo_range][0])?;

    let _profile_range = take(&mut cursor, 1, envelope)?;

    let nonce_range = take(&mut cursor, NONCE_LEN, envelope)?;
    let nonce: [u8; NONCE_LEN] = envelope[nonce_range].try_into().expect("exact length slice");

    let ad_len_range = take(&mut cursor, 4, envelope)?;
    let ad_len = u32::from_le_bytes(envelope[ad_len_range].try_into().expect("4 bytes")) as usize;
    let ad_range = take(&mut cursor, ad_len, envelope)?;
    let ad = &envelope[ad_range];

    let ct_len_range = take(&mut cursor, 4, envelope)?;
    let ct_len = u32::from_le_bytes(envelope[ct_len_range].try_into().expect("4 bytes")) as usize;
    let ct_range = take(&mut cursor, ct_len, envelope)?;
    let ciphertext = &envelope[ct_range];

    if cursor != envelope.len() {
        return Err(EchotomeError::PayloadCorrupt);
    }

    decrypt_with(algorithm, key, &nonce, ciphertext, ad)
}

fn encrypt_with(
    algorithm: AeadAlgorithm,
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    ad: &[u8],
) -> Result<Vec<u8>> {
    let payload = Payload { msg: plaintext, aad: ad };
    match algorithm {
        AeadAlgorithm::XChaCha20Poly1305 => {
            let cipher = XChaCha20Poly1305::new_from_slice(key)
                .map_err(|_| EchotomeError::AeadFailure)?;
            cipher
                .encrypt(nonce.into(), payload)
                .map_err(|_| EchotomeError::AeadFailure)
        }
        AeadAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EchotomeError::AeadFailure)?;
            // AES-GCM nonces are 12 bytes; the envelope always carries 24,
            // so only the first 12 are used when this algorithm is selected.
            cipher
                .encrypt((&nonce[..12]).into(), payload)
                .map_err(|_| EchotomeError::AeadFailure)
        }
    }
}

fn decrypt_with(
    algorithm: AeadAlgorithm,
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    ad: &[u8],
) -> Result<Vec<u8>> {
    let payload = Payload { msg: ciphertext, aad: ad };
    match algorithm {
        AeadAlgorithm::XChaCha20Poly1305 => {
            let cipher = XChaCha20Poly1305::new_from_slice(key)
                .map_err(|_| EchotomeError::AeadFailure)?;
            cipher
                .decrypt(nonce.into(), payload)
                .map_err(|_| EchotomeError::AeadFailure)
        }
        AeadAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EchotomeError::AeadFailure)?;
            cipher
                .decrypt((&nonce[..12]).into(), payload)
                .map_err(|_| EchotomeError::AeadFailure)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn xchacha_round_trip() {
        let key = [7u8; 32];
        let envelope = seal(
            &key,
            AeadAlgorithm::XChaCha20Poly1305,
            PrivacyProfile::RitualLock,
            "ECH-ABCD1234",
            b"the ritual is complete",
        )
        .expect("seals");
        let plaintext = open(&key, &envelope).expect("opens");
        assert_eq!(plaintext, b"the ritual is complete");
    }

    #[test]
    fn aes_gcm_round_trip() {
        let key = [9u8; 32];
        let envelope = seal(
            &key,
            AeadAlgorithm::Aes256Gcm,
            PrivacyProfile::QuickLock,
            "ECH-DEADBEEF",
            b"quicklock payload",
        )
        .expect("seals");
        let plaintext = open(&key, &envelope).expect("opens");
        assert_eq!(plaintext, b"quicklock payload");
    }

    #[test]
    fn tampered_ciphertext_fails_to_open() {
        let key = [1u8; 32];
        let mut envelope = seal(
            &key,
            AeadAlgorithm::XChaCha20Poly1305,
            PrivacyProfile::BlackVault,
            "ECH-00000000",
            b"sensitive",
        )
        .expect("seals");
        let last = envelope.len() - 1;
        envelope[last] ^= 0xFF;
        assert!(matches!(open(&key, &envelope), Err(EchotomeError::AeadFailure)));
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let envelope = seal(
            &[1u8; 32],
            AeadAlgorithm::XChaCha20Poly1305,
            PrivacyProfile::RitualLock,
            "ECH-11111111",
            b"payload",
        )
        .expect("seals");
        assert!(matches!(open(&[2u8; 32], &envelope), Err(EchotomeError::AeadFailure)));
    }

    #[test]
    fn truncated_envelope_is_rejected() {
        let envelope = seal(
            &[3u8; 32],
            AeadAlgorithm::XChaCha20Poly1305,
            PrivacyProfile::QuickLock,
            "ECH-22222222",
            b"payload",
        )
        .expect("seals");
        let truncated = &envelope[..envelope.len() - 5];
        assert!(matches!(open(&[3u8; 32], truncated), Err(EchotomeError::PayloadTruncated)));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut envelope = seal(
            &[4u8; 32],
            AeadAlgorithm::XChaCha20Poly1305,
            PrivacyProfile::QuickLock,
            "ECH-33333333",
            b"payload",
        )
        .expect("seals");
        envelope[0] = b'X';
        assert!(matches!(open(&[4u8; 32], &envelope), Err(EchotomeError::PayloadCorrupt)));
    }
}
