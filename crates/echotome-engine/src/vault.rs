// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Vault metadata and its on-disk store: `<vaults_dir>/<vault_id>.json`,
//! with the vault's encrypted blobs sitting beside it under
//! `<vaults_dir>/<vault_id>/`.

use echotome_core::error::Result;
use echotome_core::ids::VaultId;
use echotome_core::profile::PrivacyProfile;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// One file sealed into a vault: metadata only, the ciphertext itself
/// lives in a sibling file under the vault's blob directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// Caller-supplied label (e.g. an original file name).
    pub label: String,
    /// File name of the AEAD envelope under the vault's blob directory.
    pub file_name: String,
}

/// A vault's metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub id: VaultId,
    pub name: String,
    pub profile: PrivacyProfile,
    pub rune_id: String,
    pub created_at: u64,
    pub updated_at: u64,
    /// The rune id of the Ritual Ownership Certificate bound to this
    /// vault, once enrollment has produced one.
    pub certificate_ref: Option<String>,
    pub encrypted_blobs: Vec<EncryptedBlob>,
}

/// Atomic JSON persistence for [`Vault`] records under a vaults directory.
pub struct VaultStore {
    vaults_dir: PathBuf,
}

impl VaultStore {
    #[must_use]
    pub fn new(vaults_dir: impl Into<PathBuf>) -> Self {
        Self { vaults_dir: vaults_dir.into() }
    }

    fn metadata_path(&self, id: &VaultId) -> PathBuf {
        self.vaults_dir.join(format!("{}.json", id.0))
    }

    /// `<vaults_dir>/<vault_id>/`, where this vault's encrypted blobs live.
    #[must_use]
    pub fn blobs_dir(&self, id: &VaultId) -> PathBuf {
        self.vaults_dir.join(&id.0)
    }

    /// Persists `vault`, atomically (write-to-temp-then-rename).
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::Io`](echotome_core::error::EchotomeError::Io)
    /// on filesystem failure.
    pub fn save(&self, vault: &Vault) -> Result<()> {
        fs::create_dir_all(&self.vaults_dir)?;
        let path = self.metadata_path(&vault.id);
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(vault)
            .map_err(|e| echotome_core::error::EchotomeError::InvalidInput(e.to_string()))?;
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &path)?;
        tracing::debug!(vault_id = %vault.id, "stored vault metadata");
        Ok(())
    }

    /// Loads the vault record for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::Io`](echotome_core::error::EchotomeError::Io)
    /// if the file does not exist or cannot be read, or
    /// [`EchotomeError::InvalidInput`](echotome_core::error::EchotomeError::InvalidInput)
    /// if its contents are not a valid vault record.
    pub fn load(&self, id: &VaultId) -> Result<Vault> {
        let bytes = fs::read(self.metadata_path(id))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| echotome_core::error::EchotomeError::InvalidInput(format!("malformed vault: {e}")))
    }

    /// Writes one encrypted blob envelope into this vault's blob directory.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::Io`](echotome_core::error::EchotomeError::Io)
    /// on filesystem failure.
    pub fn write_blob(&self, id: &VaultId, file_name: &str, envelope: &[u8]) -> Result<()> {
        let dir = self.blobs_dir(id);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(file_name), envelope)?;
        Ok(())
    }

    /// Reads one encrypted blob envelope back from this vault's blob directory.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::Io`](echotome_core::error::EchotomeError::Io)
    /// on filesystem failure.
    pub fn read_blob(&self, id: &VaultId, file_name: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.blobs_dir(id).join(file_name))?)
    }
}

/// Where a given path's basename should live under a vault's blob
/// directory, deduplicated by appending an index on collision.
#[must_use]
pub fn blob_file_name(label: &str, index: usize) -> String {
    let stem: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{index:03}-{stem}.ecb")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_vault() -> Vault {
        Vault {
            id: VaultId("ECH-TESTVLT".to_string()),
            name: "Test Vault".to_string(),
            profile: PrivacyProfile::RitualLock,
            rune_id: "ECH-TESTVLT".to_string(),
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
            certificate_ref: Some("ECH-TESTVLT".to_string()),
            encrypted_blobs: vec![EncryptedBlob {
                label: "diary.txt".to_string(),
                file_name: "000-diary.txt.ecb".to_string(),
            }],
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().expect("tempdir");
        let store = VaultStore::new(dir.path());
        let vault = sample_vault();
        store.save(&vault).expect("saves");
        let loaded = store.load(&vault.id).expect("loads");
        assert_eq!(loaded, vault);
    }

    #[test]
    fn loading_missing_vault_fails() {
        let dir = tempdir().expect("tempdir");
        let store = VaultStore::new(dir.path());
        let err = store.load(&VaultId("ECH-NOPE0000".to_string())).unwrap_err();
        assert!(matches!(err, echotome_core::error::EchotomeError::Io(_)));
    }

    #[test]
    fn blob_round_trips_beside_metadata() {
        let dir = tempdir().expect("tempdir");
        let store = VaultStore::new(dir.path());
        let vault = sample_vault();
        store.write_blob(&vault.id, "000-diary.txt.ecb", b"ciphertext-bytes").expect("writes");
        let back = store.read_blob(&vault.id, "000-diary.txt.ecb").expect("reads");
        assert_eq!(back, b"ciphertext-bytes");
    }

    #[test]
    fn blob_file_names_sanitize_and_index() {
        let a = blob_file_name("my diary/secret.txt", 0);
        let b = blob_file_name("my diary/secret.txt", 1);
        assert_ne!(a, b);
        assert!(!a.contains('/'));
    }
}
