// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Background session reaper: periodically sweeps expired sessions so a
//! forgotten-but-unused session doesn't sit decrypted indefinitely.

use echotome_session::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawns a task that calls [`SessionManager::reap_expired`] on `interval`
/// until the returned handle is aborted or dropped.
pub fn spawn_reaper(session_manager: Arc<SessionManager>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            session_manager.reap_expired();
        }
    })
}
