// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests: signing keys, a matching key set, token
//! signing and a throwaway account database.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use crate::auth::claims::{ClaimSet, ProviderClaims, StandardClaims};
use crate::auth::jwks::KeySet;
use crate::storage::AccountDatabase;

pub const PRIMARY_KID: &str = "primary-key";
pub const SECONDARY_KID: &str = "secondary-key";
pub const EC_KID: &str = "ec-key";

pub const PRIMARY_PEM: &str = include_str!("../tests/fixtures/rsa_primary.pem");
pub const SECONDARY_PEM: &str = include_str!("../tests/fixtures/rsa_secondary.pem");
pub const JWKS_JSON: &str = include_str!("../tests/fixtures/jwks.json");

/// The fixture key set, valid for another hour.
pub fn key_set() -> KeySet {
    KeySet {
        keys: serde_json::from_str::<JwkSet>(JWKS_JSON).unwrap(),
        source_url: "https://keys.test/certs".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

/// Sign `claims` with RS256 using the given PEM key.
pub fn sign<T: Serialize>(claims: &T, kid: Option<&str>, pem: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// A Google ID token payload issued at `now`, valid for an hour.
pub fn google_claims(now: i64) -> ClaimSet {
    ClaimSet {
        standard: StandardClaims {
            issuer: "accounts.google.com".into(),
            subject: "110169484474386276334".into(),
            audience: "webapp_client_id".into(),
            expires_at: Some(now + 3600),
            issued_at: Some(now),
            ..Default::default()
        },
        profile: ProviderClaims {
            email: "ada@example.com".into(),
            email_verified: true,
            name: "Ada Lovelace".into(),
            given_name: "Ada".into(),
            family_name: "Lovelace".into(),
            locale: "en-GB".into(),
            picture: "https://lh3.googleusercontent.com/a/ada.jpg".into(),
            ..Default::default()
        },
    }
}

/// Format as an HTTP date, e.g. `Wed, 15 Oct 2025 09:30:00 GMT`.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Empty account database in a temporary directory.
pub fn temp_db() -> (AccountDatabase, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = AccountDatabase::open(&dir.path().join("accounts.redb")).unwrap();
    (db, dir)
}
