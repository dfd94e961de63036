// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Echotome Engine — wires the identity, audio, crypto, certificate,
//! steganography, and session crates into the enrollment and unlock
//! pipelines, plus the vault store and background session reaper that
//! a host process embeds this crate for.

pub mod enroll;
pub mod hashfold;
pub mod reaper;
pub mod stego_payload;
pub mod unlock;
pub mod vault;

pub use enroll::{enroll, EnrollRequest, EnrollResult, PlaintextBlob, TrackInput};
pub use reaper::spawn_reaper;
pub use stego_payload::{StegoPayload, STEGO_PAYLOAD_VERSION};
pub use unlock::{unlock, LiveTrack, UnlockRequest, UnlockResult};
pub use vault::{blob_file_name, EncryptedBlob, Vault, VaultStore};

/// Installs a `tracing` subscriber driven by `RUST_LOG` (falling back to
/// `info` for this crate and its dependents), for hosts that don't
/// already run their own subscriber.
pub fn init_tracing_default() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
