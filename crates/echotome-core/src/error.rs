// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Shared error taxonomy for the Echotome engine.
//!
//! Every component returns one of these categories rather than an
//! untyped string, so callers can dispatch on the failure kind without
//! parsing messages. Display text is deliberately categorical — it never
//! reveals cryptographic internals (which byte mismatched, partial key
//! material, timing deltas beyond the ratio check itself).

use thiserror::Error;

/// Sub-reason attached to [`EchotomeError::CertificateInvalid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateInvalidReason {
    /// The Ed25519 signature did not verify under `signer_pub`.
    BadSignature,
    /// A track's recomputed `audio_hash` did not match the claimed value.
    AudioHashMismatch,
    /// `owner_pub` does not equal `signer_pub`.
    OwnerMismatch,
    /// `version_info` falls outside the accepted range.
    UnsupportedVersion,
    /// The certificate's track list was empty.
    EmptyTracks,
}

impl std::fmt::Display for CertificateInvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::BadSignature => "signature does not verify",
            Self::AudioHashMismatch => "audio hash mismatch",
            Self::OwnerMismatch => "owner/signer mismatch",
            Self::UnsupportedVersion => "unsupported version",
            Self::EmptyTracks => "certificate has no tracks",
        };
        f.write_str(s)
    }
}

/// The top-level error type for the Echotome engine.
///
/// This core recovers nothing silently: every failure surfaces to the
/// caller with its category intact. Messages shown to end users should
/// come from [`EchotomeError::user_message`], not from `Display`, which
/// is meant for logs/debugging.
#[derive(Debug, Error)]
pub enum EchotomeError {
    /// Malformed audio, empty passphrase, oversized input, etc.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Active-region detection found no contiguous span of meaningful content.
    #[error("no active region found in audio")]
    NoActiveRegion,

    /// Temporal Salt Chain frames were fed out of order.
    #[error("temporal salt chain ordering error at frame index {index}")]
    OrderingError {
        /// The out-of-order frame index that triggered the failure.
        index: u32,
    },

    /// TSC hash mismatch or playback speed outside the accepted ratio.
    #[error("temporal consistency check failed")]
    TemporalMismatch,

    /// Ritual Certificate failed verification.
    #[error("ritual certificate invalid: {reason}")]
    CertificateInvalid {
        /// The specific reason verification failed.
        reason: CertificateInvalidReason,
    },

    /// Steganographic payload failed magic/CRC validation.
    #[error("steganographic payload corrupt")]
    PayloadCorrupt,

    /// Declared payload length exceeds the carrier image's capacity.
    #[error("steganographic payload truncated")]
    PayloadTruncated,

    /// Payload would not fit in the carrier image's LSB capacity.
    #[error("payload exceeds carrier image capacity")]
    CapacityExceeded,

    /// AEAD authentication tag did not verify.
    #[error("authenticated decryption failed")]
    AeadFailure,

    /// The referenced session has passed its expiry and been wiped.
    #[error("session expired")]
    SessionExpired,

    /// No session exists for the given identifier.
    #[error("session not found")]
    SessionNotFound,

    /// Requested TTL/extension would exceed the profile's session cap.
    #[error("session extension exceeds profile cap")]
    SessionCapExceeded,

    /// Underlying storage failure (filesystem, permissions).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EchotomeError {
    /// A categorical, user-facing message that never leaks cryptographic
    /// internals. Intended for surfaces that show errors to end users.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "That input isn't valid for this operation.",
            Self::NoActiveRegion => "This audio doesn't contain enough content to use for a ritual.",
            Self::OrderingError { .. } => "The ritual must be performed in order, without skipping or replaying.",
            Self::TemporalMismatch => "This audio doesn't match the ritual bound to this vault.",
            Self::CertificateInvalid { .. } => "This ritual certificate could not be verified.",
            Self::PayloadCorrupt | Self::PayloadTruncated => "This sigil image doesn't contain a valid ritual payload.",
            Self::CapacityExceeded => "This image is too small to hold the ritual payload.",
            Self::AeadFailure => "The passphrase or audio doesn't match this vault.",
            Self::SessionExpired => "This ritual session has expired.",
            Self::SessionNotFound => "No active ritual session was found.",
            Self::SessionCapExceeded => "This session cannot be extended any further.",
            Self::Io(_) => "A storage error occurred.",
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, EchotomeError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn user_message_never_contains_debug_internals() {
        let err = EchotomeError::CertificateInvalid { reason: CertificateInvalidReason::BadSignature };
        assert!(!err.user_message().contains("signature"));
        assert_eq!(err.to_string(), "ritual certificate invalid: signature does not verify");
    }

    #[test]
    fn ordering_error_carries_index() {
        let err = EchotomeError::OrderingError { index: 2 };
        assert_eq!(err.to_string(), "temporal salt chain ordering error at frame index 2");
    }
}
