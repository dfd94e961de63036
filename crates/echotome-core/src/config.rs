// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Minimal, defaulted engine configuration.
//!
//! There's deliberately no general layered-config surface here (TOML/env
//! precedence, hot reload, CLI flags) — that belongs to whatever client
//! embeds this engine. It's still a typed, defaulted configuration value
//! the way every component in a well-built Rust service should take one.

use crate::profile::PrivacyProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for an `echotome` data root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchotomeConfig {
    /// Root directory for identity, rituals, vaults, and sessions.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    /// How often the session reaper scans for expired sessions.
    #[serde(default = "default_cleanup_interval", with = "duration_secs")]
    pub cleanup_interval: Duration,
    /// Privacy profile used when a caller doesn't specify one explicitly.
    #[serde(default = "default_profile")]
    pub default_profile: PrivacyProfile,
}

fn default_data_root() -> PathBuf {
    dirs_home().join(".echotome")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from)
}

const fn default_cleanup_interval() -> Duration {
    Duration::from_secs(30)
}

const fn default_profile() -> PrivacyProfile {
    PrivacyProfile::RitualLock
}

impl Default for EchotomeConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            cleanup_interval: default_cleanup_interval(),
            default_profile: default_profile(),
        }
    }
}

impl EchotomeConfig {
    /// `<data_root>/identity/`
    #[must_use]
    pub fn identity_dir(&self) -> PathBuf {
        self.data_root.join("identity")
    }

    /// `<data_root>/rituals/`
    #[must_use]
    pub fn rituals_dir(&self) -> PathBuf {
        self.data_root.join("rituals")
    }

    /// `<data_root>/vaults/`
    #[must_use]
    pub fn vaults_dir(&self) -> PathBuf {
        self.data_root.join("vaults")
    }

    /// `<data_root>/sessions/`
    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_root.join("sessions")
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
