// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Stable identifier newtypes shared across the workspace.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A vault's human-legible stable identifier: `"ECH-" + base32(SHA-256(master)[:5]).upper()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuneId(String);

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// RFC 4648 base32 encoding without padding, uppercase. Hand-rolled rather
/// than pulled from a crate: padding defaults vary enough across the
/// available base32 implementations that pinning the encoding ourselves is
/// cheaper than auditing each one.
fn base32_encode_upper(data: &[u8]) -> String {
    let mut out = String::new();
    let mut bits: u32 = 0;
    let mut bit_count = 0u32;
    for &byte in data {
        bits = (bits << 8) | u32::from(byte);
        bit_count += 8;
        while bit_count >= 5 {
            bit_count -= 5;
            let index = ((bits >> bit_count) & 0x1F) as usize;
            out.push(BASE32_ALPHABET[index] as char);
        }
    }
    if bit_count > 0 {
        let index = ((bits << (5 - bit_count)) & 0x1F) as usize;
        out.push(BASE32_ALPHABET[index] as char);
    }
    out
}

impl RuneId {
    /// Derives the rune id from a 32-byte master key
    #[must_use]
    pub fn from_master_key(master: &[u8; 32]) -> Self {
        let digest = Sha256::digest(master);
        let encoded = base32_encode_upper(&digest[..5]);
        Self(format!("ECH-{encoded}"))
    }

    /// Returns the rune id as a plain string slice, e.g. for use as a file stem.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A vault's internal storage identifier (distinct from its human-legible rune id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultId(pub String);

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A session's 128-bit random identifier, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generates a fresh random session id from 16 bytes of CSPRNG output.
    #[must_use]
    pub fn generate() -> Self {
        use rand_core::RngCore;
        let mut bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(hex_encode(&bytes))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
