// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Expiry
//!
//! The provider states how long a key set stays valid through the `Expires`
//! header of the key-set response. The cached set is used until that instant
//! and refreshed on demand by the first verification that finds it expired.
//! There is no background refresh.
//!
//! ## Concurrency
//!
//! Refreshes are serialised by a mutex. Callers that find the set expired
//! queue behind the one fetch in flight and share its outcome, so a burst of
//! requests at the expiry boundary produces a single request to the provider.
//! A failed fetch is reported to every caller that queued for it and leaves
//! the previous set in place. The next caller to arrive tries again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use reqwest::header::{HeaderValue, EXPIRES};
use tokio::sync::{Mutex, RwLock};

use super::error::AuthError;

/// Google's published signing keys.
pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Default timeout for a key-set request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A fetched key set and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct KeySet {
    pub keys: JwkSet,
    pub source_url: String,
    pub expires_at: DateTime<Utc>,
}

impl KeySet {
    /// Find the key with the given `kid`.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.find(kid)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Looks up verification keys by key ID.
pub trait KeySource {
    /// Return the key for `kid`, or [`AuthError::UnknownKeyId`].
    fn key(&self, kid: &str) -> impl Future<Output = Result<Jwk, AuthError>> + Send;
}

impl KeySource for KeySet {
    async fn key(&self, kid: &str) -> Result<Jwk, AuthError> {
        self.find(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))
    }
}

/// The cached set plus the outcome of the latest fetch.
#[derive(Default)]
struct Slot {
    set: Option<Arc<KeySet>>,
    /// Bumped by every completed fetch, successful or not
    generation: u64,
    /// Reason the latest fetch failed; cleared on success
    last_error: Option<String>,
}

impl Slot {
    fn fresh(&self) -> Option<Arc<KeySet>> {
        self.set.as_ref().filter(|set| !set.is_expired()).cloned()
    }

    /// Outcome of the latest fetch.
    fn outcome(&self) -> Result<Arc<KeySet>, AuthError> {
        if let Some(reason) = &self.last_error {
            return Err(AuthError::KeyFetchFailure(reason.clone()));
        }
        self.set
            .clone()
            .ok_or_else(|| AuthError::KeyFetchFailure("no key set fetched".to_string()))
    }
}

/// Key-set cache for a single provider endpoint.
#[derive(Clone)]
pub struct KeySetCache {
    /// Key-set endpoint URL
    jwks_url: String,
    slot: Arc<RwLock<Slot>>,
    /// Held for the duration of a fetch
    refresh_lock: Arc<Mutex<()>>,
    /// HTTP client
    client: reqwest::Client,
}

impl KeySetCache {
    /// Create a cache for `jwks_url`. Nothing is fetched until first use.
    pub fn new(jwks_url: impl Into<String>, fetch_timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| AuthError::KeyFetchFailure(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            slot: Arc::new(RwLock::new(Slot::default())),
            refresh_lock: Arc::new(Mutex::new(())),
            client,
        })
    }

    /// Get the key-set URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// The current key set, fetching a new one if there is none or the
    /// cached one has expired.
    pub async fn current(&self) -> Result<Arc<KeySet>, AuthError> {
        let seen = {
            let slot = self.slot.read().await;
            if let Some(set) = slot.fresh() {
                return Ok(set);
            }
            slot.generation
        };

        let _refresh = self.refresh_lock.lock().await;

        // A fetch completed while we queued for the lock: take its outcome
        // instead of asking the provider again.
        {
            let slot = self.slot.read().await;
            if slot.generation != seen {
                return slot.outcome();
            }
        }

        self.fetch_and_store().await
    }

    /// Check if a key set is cached and not yet expired.
    pub async fn is_cached(&self) -> bool {
        self.slot.read().await.fresh().is_some()
    }

    /// The cached key set, expired or not.
    pub async fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.slot.read().await.set.clone()
    }

    /// Caller must hold `refresh_lock`.
    async fn fetch_and_store(&self) -> Result<Arc<KeySet>, AuthError> {
        let fetched = self.fetch().await.map(Arc::new);

        let mut slot = self.slot.write().await;
        slot.generation += 1;
        match fetched {
            Ok(set) => {
                slot.set = Some(Arc::clone(&set));
                slot.last_error = None;
                Ok(set)
            }
            Err(e) => {
                tracing::warn!(url = %self.jwks_url, error = %e, "Key set refresh failed");
                slot.last_error = Some(match &e {
                    AuthError::KeyFetchFailure(reason) => reason.clone(),
                    other => other.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Fetch the key set from the endpoint.
    async fn fetch(&self) -> Result<KeySet, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetchFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetchFailure(format!(
                "HTTP {} from key-set endpoint",
                response.status()
            )));
        }

        let expires_at = parse_expires(response.headers().get(EXPIRES))?;

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::KeyFetchFailure(format!("invalid key set: {e}")))?;

        tracing::info!(
            url = %self.jwks_url,
            keys = keys.keys.len(),
            expires_at = %expires_at,
            "Fetched signing key set"
        );

        Ok(KeySet {
            keys,
            source_url: self.jwks_url.clone(),
            expires_at,
        })
    }
}

impl KeySource for KeySetCache {
    async fn key(&self, kid: &str) -> Result<Jwk, AuthError> {
        let set = self.current().await?;
        set.find(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))
    }
}

/// Parse an RFC 1123 `Expires` header value.
pub fn parse_expires(value: Option<&HeaderValue>) -> Result<DateTime<Utc>, AuthError> {
    let raw = value
        .ok_or_else(|| AuthError::KeyFetchFailure("response has no Expires header".to_string()))?
        .to_str()
        .map_err(|_| AuthError::KeyFetchFailure("Expires header is not ASCII".to_string()))?;

    DateTime::parse_from_rfc2822(raw)
        .map(|expires| expires.with_timezone(&Utc))
        .map_err(|e| AuthError::KeyFetchFailure(format!("invalid Expires header {raw:?}: {e}")))
}
