// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! [C6] AF-KDF: passphrase + audio-feature derivation of a 32-byte master key.

use argon2::{Algorithm, Argon2, Params, Version};
use echotome_core::error::{EchotomeError, Result};
use echotome_core::profile::ProfileConstants;
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

const AFKDF_DOMAIN: &[u8] = b"echotome-afkdf-v1";
const AUDIO_INFO: &[u8] = b"echotome-audio";
const TBK_DOMAIN: &[u8] = b"echotome-tbk-v1";

/// `salt = SHA256(domain || feature_hash)[:16]`.
fn derive_salt(feature_hash: &[u8; 32]) -> [u8; 16] {
    let mut hasher = Sha256::new();
    hasher.update(AFKDF_DOMAIN);
    hasher.update(feature_hash);
    let digest = hasher.finalize();
    let mut salt = [0u8; 16];
    salt.copy_from_slice(&digest[..16]);
    salt
}

fn derive_k_pw(passphrase: &str, salt: &[u8; 16], params: &ProfileConstants) -> Result<[u8; 32]> {
    let argon2_params = Params::new(
        params.argon2.mem_cost_kib,
        params.argon2.time_cost,
        params.argon2.parallelism,
        Some(32),
    )
    .map_err(|e| EchotomeError::InvalidInput(format!("invalid argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut out = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut out)
        .map_err(|e| EchotomeError::InvalidInput(format!("argon2id failed: {e}")))?;
    Ok(out)
}

fn derive_k_audio(salt: &[u8; 16], feature_hash: &[u8; 32]) -> [u8; 32] {
    let (_prk, hk) = Hkdf::<Sha256>::extract(Some(salt), feature_hash);
    let mut out = [0u8; 32];
    hk.expand(AUDIO_INFO, &mut out).expect("32 bytes is a valid HKDF-SHA256 output length");
    out
}

/// The fixed, normative deterministic bit mask for weighted XOR mixing
/// (the fixed, documented recipe): byte `i`'s mask
/// is all-ones iff `(i + 0.5) / 32.0 < w`, so increasing `w` folds in
/// audio influence one whole byte at a time, always starting from byte 0.
fn mixing_mask(weight: f64) -> [u8; 32] {
    let mut mask = [0u8; 32];
    for (i, slot) in mask.iter_mut().enumerate() {
        let threshold = (i as f64 + 0.5) / 32.0;
        *slot = if threshold < weight { 0xFF } else { 0x00 };
    }
    mask
}

/// Derives the 32-byte master key from a passphrase, the audio
/// `feature_hash`, and profile constants.
///
/// # Errors
///
/// Returns [`EchotomeError::InvalidInput`] if the passphrase is empty or
/// Argon2id parameters are invalid.
pub fn derive_master_key(
    passphrase: &str,
    feature_hash: &[u8; 32],
    profile: &ProfileConstants,
) -> Result<[u8; 32]> {
    if passphrase.is_empty() {
        return Err(EchotomeError::InvalidInput("passphrase must not be empty".into()));
    }

    let salt = derive_salt(feature_hash);
    let mut k_pw = derive_k_pw(passphrase, &salt, profile)?;
    let mut k_audio = derive_k_audio(&salt, feature_hash);
    let mask = mixing_mask(profile.audio_weight);

    let mut mixed = [0u8; 32];
    for i in 0..32 {
        mixed[i] = k_pw[i] ^ (k_audio[i] & mask[i]);
    }

    let master: [u8; 32] = Sha256::digest(mixed).into();

    k_pw.zeroize();
    k_audio.zeroize();
    mixed.zeroize();

    Ok(master)
}

/// Derives the temporal-bound effective encryption key for profiles that
/// use temporal binding (RitualLock/BlackVault): `HKDF-Expand(master,
/// "echotome-tbk-v1" || temporal_hash, 32)`.
#[must_use]
pub fn derive_temporal_bound_key(master: &[u8; 32], temporal_hash: &[u8; 32]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::from_prk(master).expect("master key is a valid HKDF PRK");
    let mut info = Vec::with_capacity(TBK_DOMAIN.len() + temporal_hash.len());
    info.extend_from_slice(TBK_DOMAIN);
    info.extend_from_slice(temporal_hash);
    let mut out = [0u8; 32];
    hk.expand(&info, &mut out).expect("32 bytes is a valid HKDF-SHA256 output length");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use echotome_core::profile::PrivacyProfile;

    #[test]
    fn deterministic_for_same_inputs() {
        let profile = PrivacyProfile::RitualLock.constants();
        let hash = [3u8; 32];
        let a = derive_master_key("correct horse battery staple", &hash, &profile).expect("derives");
        let b = derive_master_key("correct horse battery staple", &hash, &profile).expect("derives");
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_passphrase_changes_key() {
        let profile = PrivacyProfile::RitualLock.constants();
        let hash = [3u8; 32];
        let a = derive_master_key("correct horse battery staple", &hash, &profile).expect("derives");
        let b = derive_master_key("incorrect horse battery staple", &hash, &profile).expect("derives");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_passphrase_is_rejected() {
        let profile = PrivacyProfile::QuickLock.constants();
        let err = derive_master_key("", &[0u8; 32], &profile).unwrap_err();
        assert!(matches!(err, EchotomeError::InvalidInput(_)));
    }

    #[test]
    fn quicklock_mask_is_all_zero() {
        let mask = mixing_mask(PrivacyProfile::QuickLock.constants().audio_weight);
        assert_eq!(mask, [0u8; 32]);
    }

    #[test]
    fn blackvault_mask_is_all_one() {
        let mask = mixing_mask(PrivacyProfile::BlackVault.constants().audio_weight);
        assert_eq!(mask, [0xFFu8; 32]);
    }

    #[test]
    fn ritual_lock_mask_folds_roughly_seventy_percent() {
        let mask = mixing_mask(PrivacyProfile::RitualLock.constants().audio_weight);
        let folded = mask.iter().filter(|&&b| b == 0xFF).count();
        assert_eq!(folded, 22); // round(32 * 0.7)
    }

    #[test]
    fn temporal_bound_key_differs_from_master() {
        let master = [5u8; 32];
        let temporal_hash = [6u8; 32];
        let tbk = derive_temporal_bound_key(&master, &temporal_hash);
        assert_ne!(tbk, master);
        let tbk2 = derive_temporal_bound_key(&master, &temporal_hash);
        assert_eq!(tbk, tbk2);
    }
}
