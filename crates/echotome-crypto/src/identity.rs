// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! [C3] Identity Keystore: a stable, per-device Ed25519 keypair persisted
//! under owner-only permissions.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use echotome_core::error::{EchotomeError, Result};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const PRIVATE_KEY_FILE: &str = "identity.key";
const PUBLIC_KEY_FILE: &str = "identity.pub";

/// A stable per-device Ed25519 identity.
///
/// Read once at startup; later reads are served from memory, cached
/// behind a [`OnceLock`] inside the handle.
pub struct IdentityKeystore {
    dir: PathBuf,
    cached: OnceLock<SigningKey>,
}

impl IdentityKeystore {
    /// Opens a keystore rooted at `identity_dir` (typically
    /// `EchotomeConfig::identity_dir()`). Does not touch disk until
    /// [`Self::ensure_identity_keypair`] is called.
    #[must_use]
    pub fn new(identity_dir: impl Into<PathBuf>) -> Self {
        Self { dir: identity_dir.into(), cached: OnceLock::new() }
    }

    fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// Returns the stable `(priv, pub)` keypair, generating and
    /// persisting one on first use.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::Io`] on filesystem failure, or
    /// [`EchotomeError::InvalidInput`] if an on-disk private key is
    /// world-readable or otherwise malformed.
    pub fn ensure_identity_keypair(&self) -> Result<(SigningKey, VerifyingKey)> {
        if let Some(key) = self.cached.get() {
            return Ok((key.clone(), key.verifying_key()));
        }

        let key = if self.private_key_path().exists() {
            self.load_signing_key()?
        } else {
            self.generate_and_persist()?
        };

        let verifying_key = key.verifying_key();
        // OnceLock::set races benignly: the loser's key is dropped, callers
        // always observe a consistent value from `cached`.
        let _ = self.cached.set(key);
        let key = self.cached.get().expect("just set").clone();
        Ok((key, verifying_key))
    }

    fn generate_and_persist(&self) -> Result<SigningKey> {
        fs::create_dir_all(&self.dir)?;
        let signing_key = SigningKey::generate(&mut OsRng);

        write_owner_only(&self.private_key_path(), signing_key.to_bytes().as_slice())?;
        write_owner_only(
            &self.public_key_path(),
            signing_key.verifying_key().to_bytes().as_slice(),
        )?;

        tracing::info!(dir = %self.dir.display(), "generated new identity keypair");
        Ok(signing_key)
    }

    fn load_signing_key(&self) -> Result<SigningKey> {
        let path = self.private_key_path();
        check_not_world_readable(&path)?;

        let bytes = fs::read(&path)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| EchotomeError::InvalidInput("identity key file has wrong length".into()))?;
        Ok(SigningKey::from_bytes(&bytes))
    }

    /// Signs `message` with the device identity key.
    ///
    /// # Errors
    ///
    /// Propagates [`EchotomeError`] from [`Self::ensure_identity_keypair`].
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        let (key, _) = self.ensure_identity_keypair()?;
        Ok(key.sign(message))
    }
}

/// Verifies `signature` over `message` under `public_key`.
#[must_use]
pub fn verify(public_key: &VerifyingKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature).is_ok()
}

/// SHA-256(pub)\[:8\] in lowercase hex
#[must_use]
pub fn fingerprint(public_key: &VerifyingKey) -> String {
    let digest = Sha256::digest(public_key.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

fn write_owner_only(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes)?;
    set_owner_only_permissions(&tmp_path)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<()> {
    // Non-Unix targets have no POSIX permission bits to restrict; the
    // file is written to a user-private data root instead. Documented,
    // not silently downgraded.
    Ok(())
}

#[cfg(unix)]
fn check_not_world_readable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(path)?.permissions().mode();
    if mode & 0o077 != 0 {
        return Err(EchotomeError::InvalidInput(format!(
            "refusing to load world/group-accessible private key at {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_not_world_readable(_path: &Path) -> Result<()> {
    Ok(())
}
