// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Models
//!
//! An [`Account`] mixes two kinds of fields:
//!
//! - **Provider-managed**: email, display name, locale and picture. The
//!   identity provider is authoritative; stored values are overwritten
//!   whenever a verified token carries different ones.
//! - **Application-managed**: alias and show-picture flag. Set once when the
//!   account is created and never touched by provider data afterwards.
//!
//! `country` is derived from `locale` and `provider_hash` from the
//! provider-managed fields. Neither is edited independently.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::auth::claims::ProviderClaims;

/// Persisted account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Internal identifier, assigned on insert (0 until then)
    pub id: u64,
    /// Provider subject identifier, unique across accounts
    pub provider_id: String,
    /// Digest of the provider-managed fields
    #[serde(default)]
    pub provider_hash: Option<String>,
    pub name: String,
    pub email: String,
    pub show_picture: bool,
    pub picture: String,
    pub alias: String,
    pub locale: String,
    pub country: String,
}

impl Account {
    /// New, not yet persisted account for a first sign-in.
    pub fn from_claims(provider_id: &str, profile: &ProviderClaims) -> Self {
        let mut account = Self {
            id: 0,
            provider_id: String::new(),
            provider_hash: None,
            name: String::new(),
            email: String::new(),
            show_picture: true,
            picture: String::new(),
            alias: profile.given_name.clone(),
            locale: String::new(),
            country: String::new(),
        };
        account.apply_provider_fields(provider_id, profile);
        account
    }

    /// Whether any provider-managed field differs from `profile`.
    pub fn provider_fields_differ(&self, profile: &ProviderClaims) -> bool {
        self.email != profile.email
            || self.name != profile.name
            || self.locale != profile.locale
            || self.picture != profile.picture
    }

    /// Overwrite the provider-managed fields and recompute derived ones.
    pub fn apply_provider_fields(&mut self, provider_id: &str, profile: &ProviderClaims) {
        self.provider_id = provider_id.to_string();
        self.email = profile.email.clone();
        self.name = profile.name.clone();
        self.locale = profile.locale.clone();
        self.picture = profile.picture.clone();
        self.country = derive_country(&self.locale);
        self.provider_hash = Some(provider_fields_hash(
            &self.email,
            &self.name,
            &self.locale,
            &self.picture,
        ));
    }
}

/// Country code from a locale tag: the lowercased part after the first `-`.
///
/// `"en-US"` gives `"us"`; a tag without a region (`"en"`, `""`) gives `""`.
pub fn derive_country(locale: &str) -> String {
    match locale.split_once('-') {
        Some((_, region)) => region.to_lowercase(),
        None => String::new(),
    }
}

/// SHA-256 over the provider-managed fields, base64url without padding.
pub fn provider_fields_hash(email: &str, name: &str, locale: &str, picture: &str) -> String {
    let mut hasher = Sha256::new();
    for field in [email, name, locale, picture] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    Base64UrlUnpadded::encode_string(&hasher.finalize())
}

/// Account as returned to the signed-in user.
///
/// Identifiers that only matter between this service and the provider are
/// left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountResponse {
    pub name: String,
    pub email: String,
    pub show_picture: bool,
    pub picture: String,
    pub alias: String,
    pub locale: String,
    pub country: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            name: account.name,
            email: account.email,
            show_picture: account.show_picture,
            picture: account.picture,
            alias: account.alias,
            locale: account.locale,
            country: account.country,
        }
    }
}
