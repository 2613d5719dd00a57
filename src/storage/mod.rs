// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Storage
//!
//! Accounts are kept in an embedded redb database (pure Rust, ACID). The
//! authentication flow only sees the [`AccountStore`] trait, so tests can
//! swap in counting or failing stores without touching the flow itself.
//!
//! ## Uniqueness
//!
//! Each provider subject maps to at most one account. The redb store
//! enforces this inside the insert transaction: a second insert for the same
//! subject fails with [`StoreError::Conflict`] and writes nothing.

pub mod account_db;

pub use account_db::AccountDatabase;

use crate::auth::AuthError;
use crate::models::Account;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("account already exists for provider id {0:?}")]
    Conflict(String),

    #[error("account not found: {0}")]
    NotFound(u64),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations the authentication flow needs.
///
/// Calls block; async callers run them on the blocking pool.
pub trait AccountStore: Send + Sync {
    /// Look up the account linked to a provider subject.
    fn find_by_provider_id(&self, provider_id: &str) -> StoreResult<Option<Account>>;

    /// Insert a new account and return it with its assigned id.
    ///
    /// Fails with [`StoreError::Conflict`] if the provider subject is taken.
    fn insert(&self, account: &Account) -> StoreResult<Account>;

    /// Overwrite an existing account.
    fn update(&self, account: &Account) -> StoreResult<Account>;
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::PersistenceFailure(err.to_string())
    }
}
