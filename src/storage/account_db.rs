// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded account database backed by redb.
//!
//! ## Table Layout
//!
//! - `accounts`: account id → serialized Account (JSON bytes)
//! - `provider_index`: provider subject → account id
//! - `sequence`: counter name → next value

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{AccountStore, StoreError, StoreResult};
use crate::models::Account;

/// Primary table: account id → serialized Account (JSON bytes).
const ACCOUNTS: TableDefinition<u64, &[u8]> = TableDefinition::new("accounts");

/// Unique index: provider subject → account id.
const PROVIDER_INDEX: TableDefinition<&str, u64> = TableDefinition::new("provider_index");

/// Counters: name → next value.
const SEQUENCE: TableDefinition<&str, u64> = TableDefinition::new("sequence");

const NEXT_ACCOUNT_ID: &str = "next_account_id";

/// Embedded ACID account database.
pub struct AccountDatabase {
    db: Database,
}

impl AccountDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(PROVIDER_INDEX)?;
            let _ = write_txn.open_table(SEQUENCE)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Opened account database");
        Ok(Self { db })
    }

    /// Look up an account by internal id.
    #[cfg(test)]
    pub fn get(&self, id: u64) -> StoreResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Number of stored accounts.
    pub fn count(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        let mut count = 0;
        for entry in table.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Verify the database can open a read transaction on every table.
    pub fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        read_txn.open_table(ACCOUNTS)?;
        read_txn.open_table(PROVIDER_INDEX)?;
        read_txn.open_table(SEQUENCE)?;
        Ok(())
    }
}

impl AccountStore for AccountDatabase {
    fn find_by_provider_id(&self, provider_id: &str) -> StoreResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(PROVIDER_INDEX)?;
        let id = match index.get(provider_id)? {
            Some(id) => id.value(),
            None => return Ok(None),
        };

        let accounts = read_txn.open_table(ACCOUNTS)?;
        match accounts.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn insert(&self, account: &Account) -> StoreResult<Account> {
        let write_txn = self.db.begin_write()?;
        let stored = {
            let mut index = write_txn.open_table(PROVIDER_INDEX)?;
            let taken = index.get(account.provider_id.as_str())?.is_some();
            if taken {
                None
            } else {
                let mut sequence = write_txn.open_table(SEQUENCE)?;
                let id = sequence.get(NEXT_ACCOUNT_ID)?.map(|v| v.value()).unwrap_or(1);
                sequence.insert(NEXT_ACCOUNT_ID, id + 1)?;

                let stored = Account {
                    id,
                    ..account.clone()
                };
                let json = serde_json::to_vec(&stored)?;
                let mut accounts = write_txn.open_table(ACCOUNTS)?;
                accounts.insert(id, json.as_slice())?;
                index.insert(stored.provider_id.as_str(), id)?;
                Some(stored)
            }
        };

        match stored {
            Some(stored) => {
                write_txn.commit()?;
                Ok(stored)
            }
            None => {
                write_txn.abort()?;
                Err(StoreError::Conflict(account.provider_id.clone()))
            }
        }
    }

    fn update(&self, account: &Account) -> StoreResult<Account> {
        let json = serde_json::to_vec(account)?;

        let write_txn = self.db.begin_write()?;
        let found = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let exists = accounts.get(account.id)?.is_some();
            if exists {
                accounts.insert(account.id, json.as_slice())?;
                let mut index = write_txn.open_table(PROVIDER_INDEX)?;
                index.insert(account.provider_id.as_str(), account.id)?;
            }
            exists
        };

        if !found {
            write_txn.abort()?;
            return Err(StoreError::NotFound(account.id));
        }
        write_txn.commit()?;
        Ok(account.clone())
    }
}
