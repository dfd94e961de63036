// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The unlock pipeline: a sigil image plus a live ritual performance
//! recovers a vault's master key, opens a time-limited session, and
//! decrypts the vault's blobs into the session directory.

use crate::hashfold::fold_hashes;
use crate::stego_payload::extract_payload;
use crate::vault::{Vault, VaultStore};
use echotome_audio::{compute_audio_features, detect_active_region, framing::frame_signal};
use echotome_certificate::{load_certificate, RitualCertificate};
use echotome_core::canonical::to_canonical_bytes;
use echotome_core::error::{EchotomeError, Result};
use echotome_core::ids::{RuneId, SessionId, VaultId};
use echotome_core::profile::PrivacyProfile;
use echotome_core::EchotomeConfig;
use echotome_crypto::{
    aead_open, derive_master_key, derive_temporal_bound_key, verify_temporal_consistency,
    IdentityKeystore,
};
use echotome_session::SessionManager;
use echotome_stego::RgbImage;
use ed25519_dalek::VerifyingKey;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const FEATURE_FOLD_DOMAIN: &[u8] = b"echotome-engine-feature-fold-v1";
const TEMPORAL_FOLD_DOMAIN: &[u8] = b"echotome-engine-temporal-fold-v1";
const FRAME_SIZE: usize = echotome_audio::features::DEFAULT_FRAME_SIZE;
const HOP_SIZE: usize = echotome_audio::features::DEFAULT_HOP_SIZE;

/// One live-performed track's samples, sample rate, and the wall-clock
/// time it took to play.
#[derive(Debug, Clone, Copy)]
pub struct LiveTrack<'a> {
    pub samples: &'a [f32],
    pub sample_rate: u32,
    pub elapsed: Duration,
}

/// Everything needed to attempt an unlock.
pub struct UnlockRequest<'a> {
    pub vault_id: &'a VaultId,
    pub passphrase: &'a str,
    pub sigil_image: &'a RgbImage,
    /// Live performances, in the order the caller claims to have performed them.
    pub live_tracks: &'a [LiveTrack<'a>],
}

/// The artifacts of a successful unlock.
pub struct UnlockResult {
    pub session_id: SessionId,
    pub session_dir: PathBuf,
    pub vault: Vault,
}

/// Per-track temporal-consistency check: recomputes each live track's
/// feature hash and verifies its Temporal Salt Chain against the
/// certificate track at the same position. A ritual performed out of
/// order is caught here, since a live track zipped against the wrong
/// certificate track will not reproduce that track's expected hash.
fn verify_live_tracks_temporal(
    certificate: &RitualCertificate,
    owner_pub: &VerifyingKey,
    live_tracks: &[LiveTrack<'_>],
) -> Result<Vec<[u8; 32]>> {
    let mut feature_hashes = Vec::with_capacity(live_tracks.len());
    for (live, cert_track) in live_tracks.iter().zip(&certificate.payload.tracks) {
        let features = compute_audio_features(live.samples, live.sample_rate, FRAME_SIZE, HOP_SIZE)?;
        let frames = frame_signal(live.samples, FRAME_SIZE, HOP_SIZE);
        let active_region = detect_active_region(&features, &frames)?;

        let expected_temporal_hash: [u8; 32] = cert_track.temporal_hash.as_slice().try_into().map_err(|_| {
            EchotomeError::InvalidInput("certificate temporal_hash has wrong length".into())
        })?;

        verify_temporal_consistency(
            &expected_temporal_hash,
            owner_pub,
            cert_track.track_length,
            live.sample_rate,
            HOP_SIZE,
            &active_region.frames,
            live.elapsed,
        )?;

        feature_hashes.push(features.feature_hash);
    }
    Ok(feature_hashes)
}

fn recover_effective_key(
    certificate: &RitualCertificate,
    passphrase: &str,
    profile: PrivacyProfile,
    enc_mk: &[u8],
    feature_hashes: &[[u8; 32]],
) -> Result<([u8; 32], [u8; 32])> {
    let temporal_hashes: Vec<[u8; 32]> = certificate
        .payload
        .tracks
        .iter()
        .map(|t| -> Result<[u8; 32]> {
            t.temporal_hash
                .as_slice()
                .try_into()
                .map_err(|_| EchotomeError::InvalidInput("certificate temporal_hash has wrong length".into()))
        })
        .collect::<Result<_>>()?;

    let combined_feature_hash = fold_hashes(FEATURE_FOLD_DOMAIN, feature_hashes);
    let combined_temporal_hash = fold_hashes(TEMPORAL_FOLD_DOMAIN, &temporal_hashes);

    let master_candidate = derive_master_key(passphrase, &combined_feature_hash, &profile.constants())?;
    let effective_key = if profile.uses_temporal_binding() {
        derive_temporal_bound_key(&master_candidate, &combined_temporal_hash)
    } else {
        master_candidate
    };

    let master_bytes = aead_open(&effective_key, enc_mk)?;
    let master: [u8; 32] = master_bytes
        .try_into()
        .map_err(|_| EchotomeError::InvalidInput("recovered master key has wrong length".into()))?;

    Ok((effective_key, master))
}

/// Runs the full unlock pipeline.
///
/// # Errors
///
/// Returns [`EchotomeError::InvalidInput`] if the sigil doesn't name this
/// vault, [`EchotomeError::PayloadCorrupt`] if the sigil's embedded hashes
/// don't match the loaded certificate, [`EchotomeError::CertificateInvalid`]
/// if the certificate itself fails verification against the live audio,
/// [`EchotomeError::TemporalMismatch`] if the ritual was reordered,
/// accelerated, or replayed with the wrong audio, and
/// [`EchotomeError::AeadFailure`] if the passphrase is wrong.
pub fn unlock(
    config: &EchotomeConfig,
    keystore: &IdentityKeystore,
    session_manager: &SessionManager,
    request: UnlockRequest<'_>,
) -> Result<UnlockResult> {
    let vault_store = VaultStore::new(config.vaults_dir());
    let vault = vault_store.load(request.vault_id)?;
    let certificate = load_certificate(&config.rituals_dir(), &vault.rune_id)?;
    let (_, owner_pub) = keystore.ensure_identity_keypair()?;
    let payload = extract_payload(request.sigil_image)?;

    if payload.rune_id != vault.rune_id {
        return Err(EchotomeError::InvalidInput("sigil does not belong to this vault".into()));
    }

    let roc_hash: [u8; 32] = Sha256::digest(
        to_canonical_bytes(&certificate)
            .map_err(|e| EchotomeError::InvalidInput(format!("certificate is not serializable: {e}")))?,
    )
    .into();
    if roc_hash.as_slice() != payload.roc_hash.as_slice() {
        return Err(EchotomeError::PayloadCorrupt);
    }
    let certificate_riv = certificate.payload.tracks.first().map(|t| t.riv.as_slice());
    if certificate_riv != Some(payload.riv.as_slice()) {
        return Err(EchotomeError::PayloadCorrupt);
    }

    // Temporal consistency (including track ordering) is checked before the
    // certificate's audio-hash verification: a reordered or accelerated
    // performance should report `TemporalMismatch`, not a certificate error.
    let feature_hashes = verify_live_tracks_temporal(&certificate, &owner_pub, request.live_tracks)?;

    let claimed_audio: Vec<&[f32]> = request.live_tracks.iter().map(|t| t.samples).collect();
    certificate.verify(&claimed_audio)?;

    let dir_token = SessionId::generate().0;
    let session_dir = config.sessions_dir().join(&dir_token);
    let session_id = session_manager.begin_unlock(vault.profile, session_dir.clone());

    let (effective_key, master) = match recover_effective_key(
        &certificate,
        request.passphrase,
        vault.profile,
        &payload.enc_mk,
        &feature_hashes,
    ) {
        Ok(keys) => keys,
        Err(error) => {
            let _ = session_manager.abort_unlock(&session_id);
            return Err(error);
        },
    };

    if RuneId::from_master_key(&master).as_str() != vault.rune_id {
        let _ = session_manager.abort_unlock(&session_id);
        return Err(EchotomeError::AeadFailure);
    }

    session_manager.activate(&session_id, effective_key)?;

    if let Err(error) = decrypt_blobs_into_session(&vault_store, &vault, session_manager, &session_id, &session_dir) {
        let _ = session_manager.lock(&session_id);
        return Err(error);
    }

    tracing::info!(session_id = %session_id.0, rune_id = %vault.rune_id, "vault unlocked");

    Ok(UnlockResult { session_id, session_dir, vault })
}

fn decrypt_blobs_into_session(
    vault_store: &VaultStore,
    vault: &Vault,
    session_manager: &SessionManager,
    session_id: &SessionId,
    session_dir: &std::path::Path,
) -> Result<()> {
    fs::create_dir_all(session_dir)?;
    set_session_dir_permissions(session_dir)?;
    for blob in &vault.encrypted_blobs {
        let envelope = vault_store.read_blob(&vault.id, &blob.file_name)?;
        let plaintext = session_manager.with_master_key(session_id, |key| aead_open(key, &envelope))??;
        fs::write(session_dir.join(&blob.label), plaintext)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_session_dir_permissions(dir: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(dir)?.permissions();
    perms.set_mode(0o700);
    fs::set_permissions(dir, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_session_dir_permissions(_dir: &std::path::Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::enroll::{enroll, EnrollRequest, PlaintextBlob, TrackInput};
    use echotome_core::profile::PrivacyProfile;
    use tempfile::tempdir;

    fn sine_burst(n: usize, sample_rate: u32, freq: f32) -> Vec<f32> {
        let mut v = vec![0.0f32; sample_rate as usize / 4];
        v.extend((0..n).map(|i| {
            (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
        }));
        v.extend(vec![0.0f32; sample_rate as usize / 4]);
        v
    }

    fn blank_image(width: u32, height: u32) -> RgbImage {
        RgbImage::new(width, height, vec![0u8; (width * height * 3) as usize])
    }

    fn track_duration(samples: &[f32], sample_rate: u32) -> Duration {
        Duration::from_secs_f64(samples.len() as f64 / f64::from(sample_rate))
    }

    #[test]
    fn unlock_after_matching_enrollment_succeeds() {
        let dir = tempdir().expect("tempdir");
        let config = EchotomeConfig { data_root: dir.path().to_path_buf(), ..Default::default() };
        let keystore = IdentityKeystore::new(config.identity_dir());
        let session_manager = SessionManager::new();

        let samples = sine_burst(16_000, 16_000, 440.0);
        let tracks = [TrackInput { samples: &samples, sample_rate: 16_000 }];
        let blobs = [PlaintextBlob { label: "diary.txt".to_string(), data: b"dear diary".to_vec() }];

        let enroll_request = EnrollRequest {
            name: "Diary".to_string(),
            profile: PrivacyProfile::RitualLock,
            passphrase: "correct horse battery staple",
            tracks: &tracks,
            blobs: &blobs,
            carrier_image: blank_image(64, 64),
        };
        let enrolled = enroll(&config, &keystore, enroll_request).expect("enrolls");

        let live_tracks = [LiveTrack {
            samples: &samples,
            sample_rate: 16_000,
            elapsed: track_duration(&samples, 16_000),
        }];
        let unlock_request = UnlockRequest {
            vault_id: &enrolled.vault.id,
            passphrase: "correct horse battery staple",
            sigil_image: &enrolled.sigil_image,
            live_tracks: &live_tracks,
        };
        let unlocked =
            unlock(&config, &keystore, &session_manager, unlock_request).expect("unlocks");

        let decrypted = fs::read(unlocked.session_dir.join("diary.txt")).expect("reads decrypted file");
        assert_eq!(decrypted, b"dear diary");
    }

    #[test]
    fn wrong_passphrase_fails_before_touching_plaintext() {
        let dir = tempdir().expect("tempdir");
        let config = EchotomeConfig { data_root: dir.path().to_path_buf(), ..Default::default() };
        let keystore = IdentityKeystore::new(config.identity_dir());
        let session_manager = SessionManager::new();

        let samples = sine_burst(16_000, 16_000, 440.0);
        let tracks = [TrackInput { samples: &samples, sample_rate: 16_000 }];
        let blobs = [PlaintextBlob { label: "diary.txt".to_string(), data: b"dear diary".to_vec() }];

        let enroll_request = EnrollRequest {
            name: "Diary".to_string(),
            profile: PrivacyProfile::RitualLock,
            passphrase: "correct horse battery staple",
            tracks: &tracks,
            blobs: &blobs,
            carrier_image: blank_image(64, 64),
        };
        let enrolled = enroll(&config, &keystore, enroll_request).expect("enrolls");

        let live_tracks = [LiveTrack {
            samples: &samples,
            sample_rate: 16_000,
            elapsed: track_duration(&samples, 16_000),
        }];
        let unlock_request = UnlockRequest {
            vault_id: &enrolled.vault.id,
            passphrase: "wrong passphrase entirely",
            sigil_image: &enrolled.sigil_image,
            live_tracks: &live_tracks,
        };
        let err = unlock(&config, &keystore, &session_manager, unlock_request).unwrap_err();
        assert!(matches!(err, EchotomeError::AeadFailure));
    }

    #[test]
    fn accelerated_playback_fails_temporal_check() {
        let dir = tempdir().expect("tempdir");
        let config = EchotomeConfig { data_root: dir.path().to_path_buf(), ..Default::default() };
        let keystore = IdentityKeystore::new(config.identity_dir());
        let session_manager = SessionManager::new();

        let samples = sine_burst(16_000, 16_000, 440.0);
        let tracks = [TrackInput { samples: &samples, sample_rate: 16_000 }];
        let blobs = [PlaintextBlob { label: "diary.txt".to_string(), data: b"dear diary".to_vec() }];

        let enroll_request = EnrollRequest {
            name: "Diary".to_string(),
            profile: PrivacyProfile::RitualLock,
            passphrase: "correct horse battery staple",
            tracks: &tracks,
            blobs: &blobs,
            carrier_image: blank_image(64, 64),
        };
        let enrolled = enroll(&config, &keystore, enroll_request).expect("enrolls");

        let fast_elapsed = track_duration(&samples, 16_000).mul_f64(0.5);
        let live_tracks =
            [LiveTrack { samples: &samples, sample_rate: 16_000, elapsed: fast_elapsed }];
        let unlock_request = UnlockRequest {
            vault_id: &enrolled.vault.id,
            passphrase: "correct horse battery staple",
            sigil_image: &enrolled.sigil_image,
            live_tracks: &live_tracks,
        };
        let err = unlock(&config, &keystore, &session_manager, unlock_request).unwrap_err();
        assert!(matches!(err, EchotomeError::TemporalMismatch));
        assert!(!enrolled.vault.encrypted_blobs.is_empty());
    }
}
