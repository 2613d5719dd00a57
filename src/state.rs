// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Authenticator, KeySetCache, ValidationPolicy};
use crate::storage::{AccountDatabase, AccountStore};

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    /// Same database the authenticator writes to, kept for health checks
    pub accounts: Arc<AccountDatabase>,
}

impl AppState {
    pub fn new(authenticator: Authenticator, accounts: Arc<AccountDatabase>) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            accounts,
        }
    }

    /// Wire an authenticator to `accounts` from its parts.
    pub fn build(
        keys: KeySetCache,
        policy: ValidationPolicy,
        accounts: Arc<AccountDatabase>,
        persistence_timeout: Duration,
    ) -> Self {
        let store: Arc<dyn AccountStore> = accounts.clone();
        let authenticator =
            Authenticator::new(keys, policy, store).with_persistence_timeout(persistence_timeout);
        Self::new(authenticator, accounts)
    }
}
