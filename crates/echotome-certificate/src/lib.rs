// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Ritual Ownership Certificate: create, verify, store, and load.

pub mod certificate;
pub mod store;

pub use certificate::{CertificatePayload, RitualCertificate, RitualTrack, ACCEPTED_VERSION_RANGE};
pub use store::{load_certificate, store_certificate};
