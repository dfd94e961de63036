// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! On-disk persistence for Ritual Ownership Certificates: `<rituals_dir>/<rune_id>.roc`.

use crate::certificate::RitualCertificate;
use echotome_core::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

fn certificate_path(rituals_dir: &Path, rune_id: &str) -> PathBuf {
    rituals_dir.join(format!("{rune_id}.roc"))
}

/// Persists `certificate` under `rituals_dir`, atomically.
///
/// # Errors
///
/// Returns [`EchotomeError::Io`](echotome_core::error::EchotomeError::Io)
/// on filesystem failure.
pub fn store_certificate(rituals_dir: &Path, certificate: &RitualCertificate) -> Result<()> {
    fs::create_dir_all(rituals_dir)?;
    let path = certificate_path(rituals_dir, certificate.rune_id());
    let tmp_path = path.with_extension("roc.tmp");
    let bytes = serde_json::to_vec_pretty(certificate)
        .map_err(|e| echotome_core::error::EchotomeError::InvalidInput(e.to_string()))?;
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, &path)?;
    tracing::debug!(rune_id = certificate.rune_id(), "stored ritual certificate");
    Ok(())
}

/// Loads the certificate for `rune_id` from `rituals_dir`.
///
/// # Errors
///
/// Returns [`EchotomeError::Io`](echotome_core::error::EchotomeError::Io)
/// if the file does not exist or cannot be read, or
/// [`EchotomeError::InvalidInput`](echotome_core::error::EchotomeError::InvalidInput)
/// if its contents are not a valid certificate.
pub fn load_certificate(rituals_dir: &Path, rune_id: &str) -> Result<RitualCertificate> {
    let path = certificate_path(rituals_dir, rune_id);
    let bytes = fs::read(&path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| echotome_core::error::EchotomeError::InvalidInput(format!("malformed certificate: {e}")))
}
