// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Ritual Ownership Certificate: a signed, canonical document binding a
//! vault to one or more tracks and a device public key.

use echotome_audio::audio_hash;
use echotome_core::canonical::{b64url, to_canonical_bytes};
use echotome_core::error::{CertificateInvalidReason, EchotomeError, Result};
use echotome_core::profile::PrivacyProfile;
use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Certificates whose `version_info` falls outside this range are rejected.
pub const ACCEPTED_VERSION_RANGE: std::ops::RangeInclusive<u32> = 1..=1;

/// One enrolled track within a certificate, in the order it must be
/// performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RitualTrack {
    #[serde(with = "b64url")]
    pub audio_hash: Vec<u8>,
    pub active_start: u32,
    pub active_end: u32,
    pub track_length: u64,
    #[serde(with = "b64url")]
    pub riv: Vec<u8>,
    #[serde(with = "b64url")]
    pub temporal_hash: Vec<u8>,
}

/// The signed payload of a Ritual Ownership Certificate, prior to signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePayload {
    pub rune_id: String,
    #[serde(with = "b64url")]
    pub owner_pub: Vec<u8>,
    pub profile: PrivacyProfile,
    pub tracks: Vec<RitualTrack>,
    pub version_info: u32,
    pub created_at: u64,
}

/// A complete, signed Ritual Ownership Certificate as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RitualCertificate {
    pub payload: CertificatePayload,
    #[serde(with = "b64url")]
    pub signature: Vec<u8>,
    #[serde(with = "b64url")]
    pub signer_pub: Vec<u8>,
}

impl RitualCertificate {
    /// Signs `payload` with `signing_key`, producing a complete certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if `payload` cannot be canonically serialized.
    pub fn create(payload: CertificatePayload, signing_key: &SigningKey) -> Result<Self> {
        if payload.tracks.is_empty() {
            return Err(EchotomeError::CertificateInvalid {
                reason: CertificateInvalidReason::EmptyTracks,
            });
        }
        let canonical = canonical_payload_bytes(&payload)?;
        let signature = ed25519_dalek::Signer::sign(signing_key, &canonical);
        Ok(Self {
            payload,
            signature: signature.to_bytes().to_vec(),
            signer_pub: signing_key.verifying_key().to_bytes().to_vec(),
        })
    }

    /// Verifies the certificate against the audio each track claims to
    /// bind to: the signature, the recomputed per-track `audio_hash`, that
    /// `owner_pub == signer_pub`, and that `version_info` is accepted.
    ///
    /// `claimed_audio` must supply one sample slice per track, in order.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::CertificateInvalid`] with the first
    /// sub-reason encountered, checked in signature → audio → owner →
    /// version order.
    pub fn verify(&self, claimed_audio: &[&[f32]]) -> Result<()> {
        use CertificateInvalidReason as Reason;

        let canonical = canonical_payload_bytes(&self.payload)
            .map_err(|_| EchotomeError::CertificateInvalid { reason: Reason::BadSignature })?;
        let signer_pub = parse_verifying_key(&self.signer_pub)
            .ok_or(EchotomeError::CertificateInvalid { reason: Reason::BadSignature })?;
        let signature = parse_signature(&self.signature)
            .ok_or(EchotomeError::CertificateInvalid { reason: Reason::BadSignature })?;

        if ed25519_dalek::Verifier::verify(&signer_pub, &canonical, &signature).is_err() {
            return Err(EchotomeError::CertificateInvalid { reason: Reason::BadSignature });
        }

        if claimed_audio.len() != self.payload.tracks.len() {
            return Err(EchotomeError::CertificateInvalid { reason: Reason::AudioHashMismatch });
        }
        for (track, samples) in self.payload.tracks.iter().zip(claimed_audio) {
            if audio_hash(samples).as_slice() != track.audio_hash.as_slice() {
                return Err(EchotomeError::CertificateInvalid {
                    reason: Reason::AudioHashMismatch,
                });
            }
        }

        if self.payload.owner_pub != self.signer_pub {
            return Err(EchotomeError::CertificateInvalid { reason: Reason::OwnerMismatch });
        }

        if !ACCEPTED_VERSION_RANGE.contains(&self.payload.version_info) {
            return Err(EchotomeError::CertificateInvalid {
                reason: Reason::UnsupportedVersion,
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn rune_id(&self) -> &str {
        &self.payload.rune_id
    }
}

fn canonical_payload_bytes(payload: &CertificatePayload) -> Result<Vec<u8>> {
    to_canonical_bytes(payload)
        .map_err(|e| EchotomeError::InvalidInput(format!("certificate payload is not serializable: {e}")))
}

fn parse_verifying_key(bytes: &[u8]) -> Option<VerifyingKey> {
    let array: [u8; 32] = bytes.try_into().ok()?;
    VerifyingKey::from_bytes(&array).ok()
}

fn parse_signature(bytes: &[u8]) -> Option<Signature> {
    let array: [u8; 64] = bytes.try_into().ok()?;
    Some(Signature::from_bytes(&array))
}
