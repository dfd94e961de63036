// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The process-wide session coordinator: a single table behind a
//! `parking_lot::Mutex`, with the locking discipline "table lock, then
//! filesystem side effects, never both at once" enforced by construction —
//! every state change that triggers secure deletion releases the table
//! lock before touching the filesystem, then reacquires it to record the
//! terminal state.

use crate::secure_delete::secure_delete_dir;
use crate::state::{SessionRecord, SessionState};
use echotome_core::error::{EchotomeError, Result};
use echotome_core::ids::SessionId;
use echotome_core::profile::PrivacyProfile;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use zeroize::Zeroizing;

/// A read-only view of a session's public fields.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub profile: PrivacyProfile,
    pub state: SessionState,
    pub created_at: Instant,
    pub expires_at: Instant,
}

/// The process-wide session coordinator.
#[derive(Default)]
pub struct SessionManager {
    table: Mutex<HashMap<SessionId, SessionRecord>>,
}

impl SessionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `Locked → Unlocking`: reserves a pending slot for a ritual attempt
    /// in progress. The returned id is not yet usable for anything but
    /// [`Self::activate`] or [`Self::abort_unlock`].
    #[must_use]
    pub fn begin_unlock(&self, profile: PrivacyProfile, dir: PathBuf) -> SessionId {
        let id = SessionId::generate();
        let now = Instant::now();
        let ttl = profile.constants().default_ttl;
        let record = SessionRecord {
            id: id.clone(),
            profile,
            state: SessionState::Unlocking,
            master_key: None,
            dir,
            created_at: now,
            last_activity: now,
            expires_at: now + ttl,
        };
        self.table.lock().insert(id.clone(), record);
        id
    }

    /// `Unlocking → Active`: called once `verify_temporal_consistency`
    /// (and, if present, ROC verification) has succeeded and a master key
    /// has been recovered.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::SessionNotFound`] if `id` has no pending
    /// `Unlocking` record.
    pub fn activate(&self, id: &SessionId, master_key: [u8; 32]) -> Result<()> {
        let mut table = self.table.lock();
        let record = table.get_mut(id).ok_or(EchotomeError::SessionNotFound)?;
        if record.state != SessionState::Unlocking {
            return Err(EchotomeError::SessionNotFound);
        }
        let now = Instant::now();
        record.master_key = Some(Zeroizing::new(master_key));
        record.state = SessionState::Active;
        record.last_activity = now;
        record.expires_at = now + record.profile.constants().default_ttl;
        tracing::info!(session_id = %id.0, "session unlocked");
        Ok(())
    }

    /// Cancels an in-flight unlock that never reached `Active`: zeroizes
    /// any partial master key and drops the pending slot. If partial
    /// files were written into the session directory, they are
    /// secure-deleted.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::Io`](echotome_core::error::EchotomeError::Io)
    /// if secure deletion of a partially-written directory fails.
    pub fn abort_unlock(&self, id: &SessionId) -> Result<()> {
        let dir = {
            let mut table = self.table.lock();
            let Some(mut record) = table.remove(id) else { return Ok(()) };
            record.wipe_key();
            record.dir
        };
        secure_delete_dir(&dir)
    }

    /// Resets `last_activity` without extending `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::SessionNotFound`] if no such session
    /// exists, or [`EchotomeError::SessionExpired`] if it is not `Active`.
    pub fn touch(&self, id: &SessionId) -> Result<()> {
        let mut table = self.table.lock();
        let record = table.get_mut(id).ok_or(EchotomeError::SessionNotFound)?;
        if record.state != SessionState::Active {
            return Err(EchotomeError::SessionExpired);
        }
        record.last_activity = Instant::now();
        Ok(())
    }

    /// Extends `expires_at` by `dt`, provided the new expiry does not pass
    /// `created_at + max_ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::SessionExpired`] if the session is not
    /// `Active`, or [`EchotomeError::SessionCapExceeded`] if the requested
    /// extension would exceed the profile's TTL cap.
    pub fn extend(&self, id: &SessionId, dt: Duration) -> Result<()> {
        let mut table = self.table.lock();
        let record = table.get_mut(id).ok_or(EchotomeError::SessionNotFound)?;
        if record.state != SessionState::Active {
            return Err(EchotomeError::SessionExpired);
        }
        let max_ttl = record.profile.constants().max_ttl;
        let candidate = Instant::now() + dt;
        if candidate > record.created_at + max_ttl {
            return Err(EchotomeError::SessionCapExceeded);
        }
        record.expires_at = candidate;
        Ok(())
    }

    /// Explicit lock: `Active → Expiring → Wiped`. Runs secure deletion
    /// (if the profile calls for it) with the table lock released.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::SessionNotFound`] if no such session
    /// exists, and propagates I/O errors from secure deletion.
    pub fn lock(&self, id: &SessionId) -> Result<()> {
        self.expire_and_wipe(id)
    }

    /// Host-backgrounding signal (BlackVault only, per profile
    /// `bg_autolock`): identical mechanics to [`Self::lock`], named
    /// separately because callers invoke it from a different trigger.
    ///
    /// # Errors
    ///
    /// See [`Self::lock`].
    pub fn emergency_lock(&self, id: &SessionId) -> Result<()> {
        self.expire_and_wipe(id)
    }

    fn expire_and_wipe(&self, id: &SessionId) -> Result<()> {
        let dir = {
            let mut table = self.table.lock();
            let record = table.get_mut(id).ok_or(EchotomeError::SessionNotFound)?;
            if record.state == SessionState::Wiped {
                return Ok(());
            }
            record.state = SessionState::Expiring;
            record.wipe_key();
            record.dir.clone()
        };

        let should_secure_delete = {
            let table = self.table.lock();
            table.get(id).is_some_and(|r| r.profile.constants().secure_delete)
        };
        if should_secure_delete {
            secure_delete_dir(&dir)?;
        } else if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }

        let mut table = self.table.lock();
        if let Some(record) = table.get_mut(id) {
            record.state = SessionState::Wiped;
        }
        tracing::info!(session_id = %id.0, "session wiped");
        Ok(())
    }

    /// Scans for `Active` sessions whose TTL has passed and drives them
    /// through `Expiring → Wiped`. Intended to be called periodically by
    /// a background task; never holds the table lock across the
    /// filesystem pass.
    pub fn reap_expired(&self) {
        let now = Instant::now();
        let expired: Vec<SessionId> = {
            let table = self.table.lock();
            table
                .values()
                .filter(|r| r.state == SessionState::Active && r.is_expired(now))
                .map(|r| r.id.clone())
                .collect()
        };
        for id in expired {
            if let Err(error) = self.expire_and_wipe(&id) {
                tracing::warn!(session_id = %id.0, %error, "failed to reap expired session");
            }
        }
    }

    /// A read-only snapshot of session state. Returns `None` for unknown
    /// or `Wiped` sessions — external readers must not observe wiped
    /// state as if it were live.
    #[must_use]
    pub fn get_session(&self, id: &SessionId) -> Option<SessionSnapshot> {
        let table = self.table.lock();
        let record = table.get(id)?;
        if record.state == SessionState::Wiped {
            return None;
        }
        Some(SessionSnapshot {
            id: record.id.clone(),
            profile: record.profile,
            state: record.state,
            created_at: record.created_at,
            expires_at: record.expires_at,
        })
    }

    /// Runs `f` with the session's master key, without copying it out of
    /// the table. Fails if the session is not `Active`.
    ///
    /// # Errors
    ///
    /// Returns [`EchotomeError::SessionNotFound`] if unknown,
    /// [`EchotomeError::SessionExpired`] if not `Active`.
    pub fn with_master_key<F, R>(&self, id: &SessionId, f: F) -> Result<R>
    where
        F: FnOnce(&[u8; 32]) -> R,
    {
        let table = self.table.lock();
        let record = table.get(id).ok_or(EchotomeError::SessionNotFound)?;
        if record.state != SessionState::Active {
            return Err(EchotomeError::SessionExpired);
        }
        let key = record.master_key.as_ref().ok_or(EchotomeError::SessionExpired)?;
        Ok(f(key))
    }

    /// Wipes every non-`Wiped` session. Used by tests and host shutdown
    /// hooks, not exposed as a default destructive action in normal flows.
    pub fn end_all(&self) {
        let ids: Vec<SessionId> = {
            let table = self.table.lock();
            table.keys().map(|id| id.clone()).collect()
        };
        for id in ids {
            let _ = self.expire_and_wipe(&id);
        }
    }
}
