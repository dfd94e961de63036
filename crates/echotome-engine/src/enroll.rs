// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The enrollment pipeline: turns one or more performed tracks, a
//! passphrase, and plaintext files into a vault, a signed Ritual
//! Ownership Certificate, and a sigil image.

use crate::hashfold::fold_hashes;
use crate::stego_payload::{embed_payload, StegoPayload, STEGO_PAYLOAD_VERSION};
use crate::vault::{blob_file_name, EncryptedBlob, Vault, VaultStore};
use echotome_audio::{compute_audio_features, detect_active_region, framing::frame_signal};
use echotome_certificate::{store_certificate, CertificatePayload, RitualCertificate, RitualTrack};
use echotome_core::canonical::to_canonical_bytes;
use echotome_core::error::{EchotomeError, Result};
use echotome_core::ids::{RuneId, VaultId};
use echotome_core::profile::PrivacyProfile;
use echotome_core::EchotomeConfig;
use echotome_crypto::{
    aead_seal, compute_riv, derive_master_key, derive_temporal_bound_key, temporal_salt_chain,
    AeadAlgorithm, IdentityKeystore,
};
use echotome_stego::RgbImage;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::Zeroize;

const FEATURE_FOLD_DOMAIN: &[u8] = b"echotome-engine-feature-fold-v1";
const TEMPORAL_FOLD_DOMAIN: &[u8] = b"echotome-engine-temporal-fold-v1";

/// One performed track's raw mono samples and the sample rate they were
/// captured at.
#[derive(Debug, Clone, Copy)]
pub struct TrackInput<'a> {
    pub samples: &'a [f32],
    pub sample_rate: u32,
}

/// One plaintext file to be sealed into the new vault.
#[derive(Debug, Clone)]
pub struct PlaintextBlob {
    pub label: String,
    pub data: Vec<u8>,
}

/// Everything needed to enroll a new vault.
pub struct EnrollRequest<'a> {
    pub name: String,
    pub profile: PrivacyProfile,
    pub passphrase: &'a str,
    /// Tracks in ritual order; at least one is required.
    pub tracks: &'a [TrackInput<'a>],
    pub blobs: &'a [PlaintextBlob],
    /// Carrier image the sigil payload is embedded into. Consumed and
    /// returned, modified, as `sigil_image`.
    pub carrier_image: RgbImage,
}

/// The artifacts produced by a successful enrollment.
pub struct EnrollResult {
    pub vault: Vault,
    pub certificate: RitualCertificate,
    pub sigil_image: RgbImage,
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

const FRAME_SIZE: usize = echotome_audio::features::DEFAULT_FRAME_SIZE;
const HOP_SIZE: usize = echotome_audio::features::DEFAULT_HOP_SIZE;

struct TrackMaterial {
    track: RitualTrack,
    feature_hash: [u8; 32],
    temporal_hash: [u8; 32],
}

fn process_track(
    input: &TrackInput<'_>,
    owner_pub: &ed25519_dalek::VerifyingKey,
) -> Result<TrackMaterial> {
    let features = compute_audio_features(input.samples, input.sample_rate, FRAME_SIZE, HOP_SIZE)?;
    let frames = frame_signal(input.samples, FRAME_SIZE, HOP_SIZE);
    let active_region = detect_active_region(&features, &frames)?;

    let temporal_hash = temporal_salt_chain(
        owner_pub,
        input.samples.len() as u64,
        HOP_SIZE,
        input.sample_rate,
        &active_region.frames,
    )?;
    let riv = compute_riv(&features, &temporal_hash);

    let track = RitualTrack {
        audio_hash: echotome_audio::audio_hash(input.samples).to_vec(),
        active_start: active_region.start_frame as u32,
        active_end: active_region.end_frame as u32,
        track_length: input.samples.len() as u64,
        riv: riv.to_vec(),
        temporal_hash: temporal_hash.to_vec(),
    };

    Ok(TrackMaterial { track, feature_hash: features.feature_hash, temporal_hash })
}

/// Runs the full enrollment pipeline.
///
/// # Errors
///
/// Returns [`EchotomeError::InvalidInput`] if `request.tracks` is empty,
/// and otherwise propagates whatever error the first failing stage of the
/// pipeline (audio analysis, certificate creation, sealing, or
/// steganographic embedding) produces.
pub fn enroll(config: &EchotomeConfig, keystore: &IdentityKeystore, mut request: EnrollRequest<'_>) -> Result<EnrollResult> {
    if request.tracks.is_empty() {
        return Err(EchotomeError::InvalidInput("a ritual needs at least one track".into()));
    }

    let (signing_key, owner_pub) = keystore.ensure_identity_keypair()?;

    let mut materials = Vec::with_capacity(request.tracks.len());
    for input in request.tracks {
        materials.push(process_track(input, &owner_pub)?);
    }

    let feature_hashes: Vec<[u8; 32]> = materials.iter().map(|m| m.feature_hash).collect();
    let temporal_hashes: Vec<[u8; 32]> = materials.iter().map(|m| m.temporal_hash).collect();
    let combined_feature_hash = fold_hashes(FEATURE_FOLD_DOMAIN, &feature_hashes);
    let combined_temporal_hash = fold_hashes(TEMPORAL_FOLD_DOMAIN, &temporal_hashes);

    let mut master = derive_master_key(request.passphrase, &combined_feature_hash, &request.profile.constants())?;
    let rune_id = RuneId::from_master_key(&master);

    let effective_key = if request.profile.uses_temporal_binding() {
        derive_temporal_bound_key(&master, &combined_temporal_hash)
    } else {
        master
    };

    let vault_id = VaultId(rune_id.as_str().to_string());
    let store = VaultStore::new(config.vaults_dir());

    let mut encrypted_blobs = Vec::with_capacity(request.blobs.len());
    for (index, blob) in request.blobs.iter().enumerate() {
        let envelope = aead_seal(&effective_key, AeadAlgorithm::XChaCha20Poly1305, request.profile, rune_id.as_str(), &blob.data)?;
        let file_name = blob_file_name(&blob.label, index);
        store.write_blob(&vault_id, &file_name, &envelope)?;
        encrypted_blobs.push(EncryptedBlob { label: blob.label.clone(), file_name });
    }

    let now = unix_now();
    let payload = CertificatePayload {
        rune_id: rune_id.to_string(),
        owner_pub: owner_pub.to_bytes().to_vec(),
        profile: request.profile,
        tracks: materials.iter().map(|m| m.track.clone()).collect(),
        version_info: 1,
        created_at: now,
    };
    let certificate = RitualCertificate::create(payload, &signing_key)?;
    store_certificate(&config.rituals_dir(), &certificate)?;

    let roc_hash: [u8; 32] = Sha256::digest(
        to_canonical_bytes(&certificate)
            .map_err(|e| EchotomeError::InvalidInput(format!("certificate is not serializable: {e}")))?,
    )
    .into();

    let enc_mk = aead_seal(&effective_key, AeadAlgorithm::XChaCha20Poly1305, request.profile, rune_id.as_str(), &master)?;

    let stego_payload = StegoPayload {
        rune_id: rune_id.to_string(),
        enc_mk,
        roc_hash: roc_hash.to_vec(),
        riv: materials[0].track.riv.clone(),
        version: STEGO_PAYLOAD_VERSION.to_string(),
    };
    embed_payload(&mut request.carrier_image, &stego_payload)?;

    let vault = Vault {
        id: vault_id,
        name: request.name,
        profile: request.profile,
        rune_id: rune_id.to_string(),
        created_at: now,
        updated_at: now,
        certificate_ref: Some(rune_id.to_string()),
        encrypted_blobs,
    };
    store.save(&vault)?;

    tracing::info!(rune_id = %rune_id, tracks = materials.len(), "enrollment complete");

    master.zeroize();

    Ok(EnrollResult { vault, certificate, sigil_image: request.carrier_image })
}
