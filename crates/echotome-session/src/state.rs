// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The session lifecycle: `Locked → Unlocking → Active → Expiring → Wiped`.

use echotome_core::ids::SessionId;
use echotome_core::profile::PrivacyProfile;
use std::path::PathBuf;
use std::time::Instant;
use zeroize::Zeroizing;

/// Where a session sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// A ritual attempt is in flight; the derived master key is held in a
    /// pending slot, not yet exposed to callers.
    Unlocking,
    /// Fully unlocked; the session directory holds decrypted files.
    Active,
    /// Past its TTL, explicitly locked, or background-signaled; about to
    /// be wiped.
    Expiring,
    /// Secure deletion has completed; the record is retained only long
    /// enough for callers polling `get_session` to observe the terminal
    /// state before it is pruned.
    Wiped,
}

/// One session's full record. `master_key` is `None` once the session has
/// moved past `Active` into `Expiring`/`Wiped`.
pub struct SessionRecord {
    pub id: SessionId,
    pub profile: PrivacyProfile,
    pub state: SessionState,
    pub master_key: Option<Zeroizing<[u8; 32]>>,
    pub dir: PathBuf,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub expires_at: Instant,
}

impl SessionRecord {
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub(crate) fn wipe_key(&mut self) {
        self.master_key = None;
    }
}
