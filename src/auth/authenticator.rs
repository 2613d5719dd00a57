// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The authenticate flow: bearer header in, reconciled account out.
//!
//! ```text
//! Unauthenticated → TokenExtracted → SignatureVerified → ClaimsValidated
//!     → AccountResolved{Created|Updated|Unchanged} → Authenticated
//! ```
//!
//! Any failure ends the flow. There are no retries; the rejection is logged
//! with the last stage reached and returned to the caller.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::claims::{validate, ClaimField, ClaimSet, ValidationPolicy};
use super::error::AuthError;
use super::extractor::bearer_token;
use super::jwks::KeySetCache;
use super::reconcile::{reconcile, AccountResolution};
use super::verifier::verify;
use crate::storage::AccountStore;

/// Default bound on account reconciliation.
pub const DEFAULT_PERSISTENCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Progress through the authenticate flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Unauthenticated,
    TokenExtracted,
    SignatureVerified,
    ClaimsValidated,
    AccountResolved,
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthStage::Unauthenticated => "unauthenticated",
            AuthStage::TokenExtracted => "token_extracted",
            AuthStage::SignatureVerified => "signature_verified",
            AuthStage::ClaimsValidated => "claims_validated",
            AuthStage::AccountResolved => "account_resolved",
        })
    }
}

/// Verifies ID tokens and resolves them to stored accounts.
pub struct Authenticator {
    keys: KeySetCache,
    policy: ValidationPolicy,
    store: Arc<dyn AccountStore>,
    persistence_timeout: Duration,
}

impl Authenticator {
    pub fn new(keys: KeySetCache, policy: ValidationPolicy, store: Arc<dyn AccountStore>) -> Self {
        Self {
            keys,
            policy,
            store,
            persistence_timeout: DEFAULT_PERSISTENCE_TIMEOUT,
        }
    }

    pub fn with_persistence_timeout(mut self, timeout: Duration) -> Self {
        self.persistence_timeout = timeout;
        self
    }

    pub fn keys(&self) -> &KeySetCache {
        &self.keys
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Run the full flow for an `Authorization` header value.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<AccountResolution, AuthError> {
        let mut stage = AuthStage::Unauthenticated;
        let result = self.advance(authorization, &mut stage).await;

        match &result {
            Ok(resolution) => tracing::debug!(
                account_id = resolution.account().id,
                outcome = ?resolution.outcome(),
                "Authenticated"
            ),
            Err(e) => tracing::warn!(
                stage = %stage,
                code = e.error_code(),
                reason = %e,
                "Authentication rejected"
            ),
        }
        result
    }

    async fn advance(
        &self,
        authorization: Option<&str>,
        stage: &mut AuthStage,
    ) -> Result<AccountResolution, AuthError> {
        let token = bearer_token(authorization)?;
        *stage = AuthStage::TokenExtracted;

        let claims = verify(token, &self.keys).await?;
        *stage = AuthStage::SignatureVerified;

        validate(&claims.standard, &self.policy)?;
        if claims.standard.subject.is_empty() {
            return Err(AuthError::ClaimInvalid {
                field: ClaimField::Subject,
            });
        }
        *stage = AuthStage::ClaimsValidated;

        let resolution = self.resolve(claims).await?;
        *stage = AuthStage::AccountResolved;
        Ok(resolution)
    }

    /// Reconcile on the blocking pool, bounded by the persistence timeout.
    async fn resolve(&self, claims: ClaimSet) -> Result<AccountResolution, AuthError> {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || {
            reconcile(store.as_ref(), &claims.profile, &claims.standard.subject)
        });

        match tokio::time::timeout(self.persistence_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(AuthError::PersistenceFailure(format!(
                "reconcile task failed: {e}"
            ))),
            Err(_) => Err(AuthError::PersistenceFailure(format!(
                "reconcile timed out after {:?}",
                self.persistence_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwks::DEFAULT_FETCH_TIMEOUT;
    use crate::auth::reconcile::Outcome;
    use crate::models::Account;
    use crate::storage::StoreResult;
    use crate::test_support::{
        google_claims, http_date, sign, temp_db, JWKS_JSON, PRIMARY_KID, PRIMARY_PEM,
    };
    use chrono::Utc;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn key_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "Expires",
                        http_date(Utc::now() + chrono::Duration::hours(1)).as_str(),
                    )
                    .set_body_raw(JWKS_JSON, "application/json"),
            )
            .mount(&server)
            .await;
        server
    }

    fn authenticator(server: &MockServer, store: Arc<dyn AccountStore>) -> Authenticator {
        let keys = KeySetCache::new(server.uri(), DEFAULT_FETCH_TIMEOUT).unwrap();
        Authenticator::new(keys, ValidationPolicy::google(["webapp_client_id"]), store)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn valid_token_creates_then_reuses_account() {
        let server = key_server().await;
        let (db, _dir) = temp_db();
        let auth = authenticator(&server, Arc::new(db));

        let token = sign(&google_claims(Utc::now().timestamp()), Some(PRIMARY_KID), PRIMARY_PEM);
        let header = bearer(&token);

        let first = auth.authenticate(Some(header.as_str())).await.unwrap();
        assert_eq!(first.outcome(), Outcome::Created);
        assert_eq!(first.account().email, "ada@example.com");

        let second = auth.authenticate(Some(header.as_str())).await.unwrap();
        assert_eq!(second.outcome(), Outcome::Unchanged);
        assert_eq!(second.account(), first.account());
    }

    #[tokio::test]
    async fn missing_header_rejected_before_any_fetch() {
        let server = MockServer::start().await;
        let (db, _dir) = temp_db();
        let auth = authenticator(&server, Arc::new(db));

        let result = auth.authenticate(None).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn padded_token_fails_verification() {
        let server = key_server().await;
        let (db, _dir) = temp_db();
        let auth = authenticator(&server, Arc::new(db));

        let token = sign(&google_claims(Utc::now().timestamp()), Some(PRIMARY_KID), PRIMARY_PEM);
        let header = format!("Bearer  {token} ");

        let result = auth.authenticate(Some(header.as_str())).await;
        assert!(matches!(result, Err(AuthError::InvalidTokenFormat(_))));
    }

    #[tokio::test]
    async fn empty_subject_rejected() {
        let server = key_server().await;
        let (db, _dir) = temp_db();
        let auth = authenticator(&server, Arc::new(db));

        let mut claims = google_claims(Utc::now().timestamp());
        claims.standard.subject.clear();
        let token = sign(&claims, Some(PRIMARY_KID), PRIMARY_PEM);

        let result = auth.authenticate(Some(bearer(&token).as_str())).await;
        assert!(matches!(
            result,
            Err(AuthError::ClaimInvalid {
                field: ClaimField::Subject
            })
        ));
    }

    struct SlowStore;

    impl AccountStore for SlowStore {
        fn find_by_provider_id(&self, _provider_id: &str) -> StoreResult<Option<Account>> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(None)
        }

        fn insert(&self, account: &Account) -> StoreResult<Account> {
            Ok(account.clone())
        }

        fn update(&self, account: &Account) -> StoreResult<Account> {
            Ok(account.clone())
        }
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let server = key_server().await;
        let auth = authenticator(&server, Arc::new(SlowStore))
            .with_persistence_timeout(Duration::from_millis(50));

        let token = sign(&google_claims(Utc::now().timestamp()), Some(PRIMARY_KID), PRIMARY_PEM);
        let result = auth.authenticate(Some(bearer(&token).as_str())).await;
        assert!(matches!(result, Err(AuthError::PersistenceFailure(_))));
    }

    #[test]
    fn stage_names() {
        assert_eq!(AuthStage::Unauthenticated.to_string(), "unauthenticated");
        assert_eq!(AuthStage::ClaimsValidated.to_string(), "claims_validated");
    }
}
