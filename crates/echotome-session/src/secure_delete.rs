// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Best-effort secure deletion of a session directory: each file is
//! overwritten with zeros, then 0xFF, then cryptographic random bytes,
//! fsynced after every pass, then unlinked; the directory is removed last.

use echotome_core::error::Result;
use rand_core::RngCore;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

const OVERWRITE_CHUNK: usize = 64 * 1024;

fn overwrite_with(file: &mut File, len: u64, byte: u8) -> std::io::Result<()> {
    use std::io::{Seek, SeekFrom};
    file.seek(SeekFrom::Start(0))?;
    let chunk = vec![byte; OVERWRITE_CHUNK];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(OVERWRITE_CHUNK as u64) as usize;
        file.write_all(&chunk[..n])?;
        remaining -= n as u64;
    }
    file.sync_all()
}

fn overwrite_with_random(file: &mut File, len: u64) -> std::io::Result<()> {
    use std::io::{Seek, SeekFrom};
    file.seek(SeekFrom::Start(0))?;
    let mut chunk = vec![0u8; OVERWRITE_CHUNK];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(OVERWRITE_CHUNK as u64) as usize;
        rand::rngs::OsRng.fill_bytes(&mut chunk[..n]);
        file.write_all(&chunk[..n])?;
        remaining -= n as u64;
    }
    file.sync_all()
}

fn secure_delete_file(path: &Path) -> std::io::Result<()> {
    let len = fs::metadata(path)?.len();
    let mut file = fs::OpenOptions::new().write(true).open(path)?;
    overwrite_with(&mut file, len, 0x00)?;
    overwrite_with(&mut file, len, 0xFF)?;
    overwrite_with_random(&mut file, len)?;
    drop(file);
    fs::remove_file(path)
}

/// Recursively secure-deletes every regular file under `dir`, then removes
/// the (now-empty) directory tree.
///
/// # Errors
///
/// Returns [`EchotomeError::Io`](echotome_core::error::EchotomeError::Io)
/// if any file or directory operation fails.
pub fn secure_delete_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            secure_delete_dir(&path)?;
        } else {
            secure_delete_file(&path)?;
        }
    }
    fs::remove_dir(dir)?;
    Ok(())
}
