// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! End-to-end coverage of the enroll/unlock pipelines across privacy
//! profiles: happy path, acceleration and reordering attacks, wrong
//! passphrase, session expiry, and multi-track rituals.

use echotome_core::error::EchotomeError;
use echotome_core::profile::PrivacyProfile;
use echotome_core::EchotomeConfig;
use echotome_crypto::IdentityKeystore;
use echotome_engine::{enroll, unlock, EnrollRequest, LiveTrack, PlaintextBlob, TrackInput, UnlockRequest};
use echotome_session::SessionManager;
use echotome_stego::RgbImage;
use std::time::Duration;
use tempfile::tempdir;

fn sine_burst(n: usize, sample_rate: u32, freq: f32) -> Vec<f32> {
    let pad = sample_rate as usize / 4;
    let mut v = vec![0.0f32; pad];
    v.extend((0..n).map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()));
    v.extend(vec![0.0f32; pad]);
    v
}

fn blank_image(width: u32, height: u32) -> RgbImage {
    RgbImage::new(width, height, vec![0u8; (width * height * 3) as usize])
}

fn track_duration(samples: &[f32], sample_rate: u32) -> Duration {
    Duration::from_secs_f64(samples.len() as f64 / f64::from(sample_rate))
}

struct Harness {
    config: EchotomeConfig,
    keystore: IdentityKeystore,
    session_manager: SessionManager,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempdir().expect("tempdir");
        let config = EchotomeConfig { data_root: dir.path().to_path_buf(), ..Default::default() };
        let keystore = IdentityKeystore::new(config.identity_dir());
        Self { config, keystore, session_manager: SessionManager::new(), _dir: dir }
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[test]
fn s1_enrollment_and_unlock_happy_path() {
    let h = Harness::new();
    let samples = sine_burst(16_000, 16_000, 440.0);
    let tracks = [TrackInput { samples: &samples, sample_rate: 16_000 }];
    let blobs = [PlaintextBlob { label: "notes.txt".to_string(), data: b"ritual notes".to_vec() }];

    let enrolled = enroll(
        &h.config,
        &h.keystore,
        EnrollRequest {
            name: "Notes".to_string(),
            profile: PrivacyProfile::RitualLock,
            passphrase: "a sufficiently long passphrase",
            tracks: &tracks,
            blobs: &blobs,
            carrier_image: blank_image(64, 64),
        },
    )
    .expect("enrolls");

    assert_eq!(PrivacyProfile::RitualLock.constants().default_ttl, Duration::from_secs(900));

    let live = [LiveTrack { samples: &samples, sample_rate: 16_000, elapsed: track_duration(&samples, 16_000) }];
    let unlocked = unlock(
        &h.config,
        &h.keystore,
        &h.session_manager,
        UnlockRequest {
            vault_id: &enrolled.vault.id,
            passphrase: "a sufficiently long passphrase",
            sigil_image: &enrolled.sigil_image,
            live_tracks: &live,
        },
    )
    .expect("unlocks");

    let plaintext = std::fs::read(unlocked.session_dir.join("notes.txt")).expect("reads plaintext");
    assert_eq!(plaintext, b"ritual notes");
    assert!(h.session_manager.get_session(&unlocked.session_id).is_some());
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[test]
fn s2_accelerated_playback_is_rejected_and_leaves_no_session_dir() {
    let h = Harness::new();
    let samples = sine_burst(16_000, 16_000, 440.0);
    let tracks = [TrackInput { samples: &samples, sample_rate: 16_000 }];
    let blobs = [PlaintextBlob { label: "notes.txt".to_string(), data: b"ritual notes".to_vec() }];

    let enrolled = enroll(
        &h.config,
        &h.keystore,
        EnrollRequest {
            name: "Notes".to_string(),
            profile: PrivacyProfile::RitualLock,
            passphrase: "a sufficiently long passphrase",
            tracks: &tracks,
            blobs: &blobs,
            carrier_image: blank_image(64, 64),
        },
    )
    .expect("enrolls");

    // Played back at 1.5x speed: well outside the accepted [0.8, 1.2] ratio.
    let fast_elapsed = track_duration(&samples, 16_000).div_f64(1.5);
    let live = [LiveTrack { samples: &samples, sample_rate: 16_000, elapsed: fast_elapsed }];
    let err = unlock(
        &h.config,
        &h.keystore,
        &h.session_manager,
        UnlockRequest {
            vault_id: &enrolled.vault.id,
            passphrase: "a sufficiently long passphrase",
            sigil_image: &enrolled.sigil_image,
            live_tracks: &live,
        },
    )
    .unwrap_err();
    assert!(matches!(err, EchotomeError::TemporalMismatch));

    let sessions_dir = h.config.sessions_dir();
    let leftover = std::fs::read_dir(&sessions_dir).map(|mut it| it.next().is_some()).unwrap_or(false);
    assert!(!leftover, "a failed unlock must not leave a session directory behind");
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[test]
fn s4_wrong_passphrase_never_touches_vault_ciphertext() {
    let h = Harness::new();
    let samples = sine_burst(16_000, 16_000, 440.0);
    let tracks = [TrackInput { samples: &samples, sample_rate: 16_000 }];
    let blobs = [PlaintextBlob { label: "notes.txt".to_string(), data: b"ritual notes".to_vec() }];

    let enrolled = enroll(
        &h.config,
        &h.keystore,
        EnrollRequest {
            name: "Notes".to_string(),
            profile: PrivacyProfile::RitualLock,
            passphrase: "correct horse battery staple",
            tracks: &tracks,
            blobs: &blobs,
            carrier_image: blank_image(64, 64),
        },
    )
    .expect("enrolls");

    let store = echotome_engine::VaultStore::new(h.config.vaults_dir());
    let file_name = enrolled.vault.encrypted_blobs[0].file_name.clone();
    let ciphertext_before = store.read_blob(&enrolled.vault.id, &file_name).expect("reads ciphertext");

    let live = [LiveTrack { samples: &samples, sample_rate: 16_000, elapsed: track_duration(&samples, 16_000) }];
    let err = unlock(
        &h.config,
        &h.keystore,
        &h.session_manager,
        UnlockRequest {
            vault_id: &enrolled.vault.id,
            passphrase: "wrong passphrase",
            sigil_image: &enrolled.sigil_image,
            live_tracks: &live,
        },
    )
    .unwrap_err();
    assert!(matches!(err, EchotomeError::AeadFailure));

    let ciphertext_after = store.read_blob(&enrolled.vault.id, &file_name).expect("reads ciphertext");
    assert_eq!(ciphertext_before, ciphertext_after, "vault ciphertext must be untouched on a failed unlock");
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[tokio::test]
async fn s5_session_expiry_wipes_directory_and_key() {
    let h = Harness::new();
    let samples = sine_burst(16_000, 16_000, 440.0);
    let tracks = [TrackInput { samples: &samples, sample_rate: 16_000 }];
    let blobs = [PlaintextBlob { label: "notes.txt".to_string(), data: b"ritual notes".to_vec() }];

    let enrolled = enroll(
        &h.config,
        &h.keystore,
        EnrollRequest {
            name: "Notes".to_string(),
            profile: PrivacyProfile::BlackVault,
            passphrase: "a sufficiently long passphrase",
            tracks: &tracks,
            blobs: &blobs,
            carrier_image: blank_image(64, 64),
        },
    )
    .expect("enrolls");

    let live = [LiveTrack { samples: &samples, sample_rate: 16_000, elapsed: track_duration(&samples, 16_000) }];
    let unlocked = unlock(
        &h.config,
        &h.keystore,
        &h.session_manager,
        UnlockRequest {
            vault_id: &enrolled.vault.id,
            passphrase: "a sufficiently long passphrase",
            sigil_image: &enrolled.sigil_image,
            live_tracks: &live,
        },
    )
    .expect("unlocks");
    assert!(unlocked.session_dir.exists());

    // Force immediate expiry instead of waiting out BlackVault's real TTL.
    h.session_manager.extend(&unlocked.session_id, Duration::from_millis(0)).expect("extends");
    tokio::time::sleep(Duration::from_millis(5)).await;
    h.session_manager.reap_expired();

    assert!(h.session_manager.get_session(&unlocked.session_id).is_none());
    assert!(!unlocked.session_dir.exists());
    let err = h.session_manager.with_master_key(&unlocked.session_id, |_| ()).unwrap_err();
    assert!(matches!(err, EchotomeError::SessionNotFound));
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[test]
fn s6_multi_track_ritual_must_be_performed_in_order() {
    let h = Harness::new();
    let track_a = sine_burst(16_000, 16_000, 300.0);
    let track_b = sine_burst(16_000, 16_000, 900.0);
    let tracks = [
        TrackInput { samples: &track_a, sample_rate: 16_000 },
        TrackInput { samples: &track_b, sample_rate: 16_000 },
    ];
    let blobs = [PlaintextBlob { label: "notes.txt".to_string(), data: b"ritual notes".to_vec() }];

    let enrolled = enroll(
        &h.config,
        &h.keystore,
        EnrollRequest {
            name: "Notes".to_string(),
            profile: PrivacyProfile::RitualLock,
            passphrase: "a sufficiently long passphrase",
            tracks: &tracks,
            blobs: &blobs,
            carrier_image: blank_image(64, 64),
        },
    )
    .expect("enrolls");

    assert_eq!(enrolled.certificate.payload.tracks.len(), 2);
    assert_ne!(enrolled.certificate.payload.tracks[0].riv, enrolled.certificate.payload.tracks[1].riv);

    let wrong_order = [
        LiveTrack { samples: &track_b, sample_rate: 16_000, elapsed: track_duration(&track_b, 16_000) },
        LiveTrack { samples: &track_a, sample_rate: 16_000, elapsed: track_duration(&track_a, 16_000) },
    ];
    let err = unlock(
        &h.config,
        &h.keystore,
        &h.session_manager,
        UnlockRequest {
            vault_id: &enrolled.vault.id,
            passphrase: "a sufficiently long passphrase",
            sigil_image: &enrolled.sigil_image,
            live_tracks: &wrong_order,
        },
    )
    .unwrap_err();
    assert!(matches!(err, EchotomeError::TemporalMismatch));

    let right_order = [
        LiveTrack { samples: &track_a, sample_rate: 16_000, elapsed: track_duration(&track_a, 16_000) },
        LiveTrack { samples: &track_b, sample_rate: 16_000, elapsed: track_duration(&track_b, 16_000) },
    ];
    let unlocked = unlock(
        &h.config,
        &h.keystore,
        &h.session_manager,
        UnlockRequest {
            vault_id: &enrolled.vault.id,
            passphrase: "a sufficiently long passphrase",
            sigil_image: &enrolled.sigil_image,
            live_tracks: &right_order,
        },
    )
    .expect("unlocks in the correct order");
    assert!(unlocked.session_dir.join("notes.txt").exists());
}
