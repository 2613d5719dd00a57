// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account reconciliation: map verified provider claims onto a stored account.
//!
//! Exactly one of three things happens per call:
//!
//! - no account for the subject: one is created from the claims
//! - provider-managed fields drifted: they are overwritten and saved
//! - nothing changed: the stored account is returned without a write
//!
//! Two first sign-ins for the same subject can race. The store rejects the
//! second insert with a conflict; the loser re-reads the winner's account and
//! continues as an existing account, so both callers get the same record.

use super::claims::ProviderClaims;
use super::error::AuthError;
use crate::models::Account;
use crate::storage::{AccountStore, StoreError};

/// What reconciliation did to the stored account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

/// The reconciled account together with what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountResolution {
    Created(Account),
    Updated(Account),
    Unchanged(Account),
}

impl AccountResolution {
    pub fn account(&self) -> &Account {
        match self {
            Self::Created(account) | Self::Updated(account) | Self::Unchanged(account) => account,
        }
    }

    pub fn into_account(self) -> Account {
        match self {
            Self::Created(account) | Self::Updated(account) | Self::Unchanged(account) => account,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Created(_) => Outcome::Created,
            Self::Updated(_) => Outcome::Updated,
            Self::Unchanged(_) => Outcome::Unchanged,
        }
    }
}

/// Find, create or refresh the account for `provider_id`.
pub fn reconcile<S: AccountStore + ?Sized>(
    store: &S,
    profile: &ProviderClaims,
    provider_id: &str,
) -> Result<AccountResolution, AuthError> {
    if let Some(existing) = store.find_by_provider_id(provider_id)? {
        return refresh(store, existing, profile, provider_id);
    }

    match store.insert(&Account::from_claims(provider_id, profile)) {
        Ok(created) => {
            tracing::info!(account_id = created.id, "Created account on first sign-in");
            Ok(AccountResolution::Created(created))
        }
        Err(StoreError::Conflict(_)) => {
            tracing::debug!("Concurrent first sign-in; reusing the stored account");
            let existing = store.find_by_provider_id(provider_id)?.ok_or_else(|| {
                AuthError::PersistenceFailure(
                    "account vanished after insert conflict".to_string(),
                )
            })?;
            refresh(store, existing, profile, provider_id)
        }
        Err(e) => Err(e.into()),
    }
}

fn refresh<S: AccountStore + ?Sized>(
    store: &S,
    mut account: Account,
    profile: &ProviderClaims,
    provider_id: &str,
) -> Result<AccountResolution, AuthError> {
    if !account.provider_fields_differ(profile) {
        return Ok(AccountResolution::Unchanged(account));
    }

    account.apply_provider_fields(provider_id, profile);
    let updated = store.update(&account)?;
    tracing::info!(account_id = updated.id, "Refreshed provider-managed account fields");
    Ok(AccountResolution::Updated(updated))
}
