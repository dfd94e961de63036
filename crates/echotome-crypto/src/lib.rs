// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Identity keystore, Temporal Salt Chain, Ritual Imprint Vector, AF-KDF and
//! the AEAD ciphertext envelope.

pub mod aead;
pub mod afkdf;
pub mod identity;
pub mod riv;
pub mod tsc;

pub use aead::{open as aead_open, seal as aead_seal, AeadAlgorithm};
pub use afkdf::{derive_master_key, derive_temporal_bound_key};
pub use identity::{fingerprint, verify, IdentityKeystore};
pub use riv::compute_riv;
pub use tsc::{temporal_salt_chain, verify_temporal_consistency, TemporalVerification, TscStreamer};
