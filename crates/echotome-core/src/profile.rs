// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Privacy profiles and their fixed constant tables.
//!
//! Profile dispatch is tagged-enum polymorphism: a `PrivacyProfile` value
//! indexes into a static constant table. There is no per-profile struct
//! hierarchy or trait-object dispatch — the table in [`PrivacyProfile::constants`]
//! is the single source of truth for these values.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One of the three privacy postures a vault can be enrolled under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrivacyProfile {
    /// Fast unlock, no audio binding, long-lived sessions.
    QuickLock,
    /// Full audio-ritual binding with moderate KDF hardness.
    RitualLock,
    /// Maximum hardness, mic required, immediate background lock.
    BlackVault,
}

/// Argon2id hardness parameters: (time cost, memory cost in KiB, parallelism).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Number of passes (`t`).
    pub time_cost: u32,
    /// Memory cost in KiB (`m`).
    pub mem_cost_kib: u32,
    /// Degree of parallelism (`p`).
    pub parallelism: u32,
}

/// The fixed constant table for one [`PrivacyProfile`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileConstants {
    /// Argon2id hardness for AF-KDF's `k_pw` derivation.
    pub argon2: Argon2Params,
    /// Audio-weight `w` folded into the final key (0.0 = no audio binding).
    pub audio_weight: f64,
    /// Whether `verify_temporal_consistency`'s speed-ratio check is enforced.
    pub timing_enforced: bool,
    /// Whether live microphone capture is required by callers (advisory;
    /// the core does not capture audio itself).
    pub mic_required: bool,
    /// Default session time-to-live.
    pub default_ttl: Duration,
    /// Maximum session time-to-live (the `extend` ceiling).
    pub max_ttl: Duration,
    /// Whether the host backgrounding signal should immediately lock the session.
    pub bg_autolock: bool,
    /// Whether secure deletion of the session directory is mandatory on wipe.
    pub secure_delete: bool,
}

impl PrivacyProfile {
    /// Returns the fixed constant table for this profile.
    #[must_use]
    pub const fn constants(self) -> ProfileConstants {
        match self {
            Self::QuickLock => ProfileConstants {
                argon2: Argon2Params { time_cost: 1, mem_cost_kib: 32 * 1024, parallelism: 4 },
                audio_weight: 0.0,
                timing_enforced: false,
                mic_required: false,
                default_ttl: Duration::from_secs(30 * 60),
                max_ttl: Duration::from_secs(2 * 60 * 60),
                bg_autolock: false,
                secure_delete: false,
            },
            Self::RitualLock => ProfileConstants {
                argon2: Argon2Params { time_cost: 3, mem_cost_kib: 128 * 1024, parallelism: 4 },
                audio_weight: 0.7,
                timing_enforced: true,
                mic_required: false,
                default_ttl: Duration::from_secs(15 * 60),
                max_ttl: Duration::from_secs(60 * 60),
                bg_autolock: false,
                secure_delete: true,
            },
            Self::BlackVault => ProfileConstants {
                argon2: Argon2Params { time_cost: 5, mem_cost_kib: 512 * 1024, parallelism: 4 },
                audio_weight: 1.0,
                timing_enforced: true,
                mic_required: true,
                default_ttl: Duration::from_secs(5 * 60),
                max_ttl: Duration::from_secs(15 * 60),
                bg_autolock: true,
                secure_delete: true,
            },
        }
    }

    /// Stable lowercase identifier used in the AEAD envelope header and file names.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::QuickLock => 0,
            Self::RitualLock => 1,
            Self::BlackVault => 2,
        }
    }

    /// Whether this profile binds the effective encryption key to the
    /// TemporalHash.
    #[must_use]
    pub const fn uses_temporal_binding(self) -> bool {
        !matches!(self, Self::QuickLock)
    }
}
