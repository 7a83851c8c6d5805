// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized StoredUser
//! - `user_email_index`: normalized email → user_id
//! - `user_external_index`: identity provider subject → user_id
//! - `wallets`: wallet_id → serialized StoredWallet
//! - `wallet_owner_index`: user_id → wallet_id
//! - `wallet_number_index`: wallet_number → wallet_id
//! - `api_keys`: key_id → serialized StoredApiKey
//! - `api_key_hash_index`: sha256(secret) → key_id
//! - `api_key_owner_index`: composite key (user_id|!created_at|key_id) → key_id
//! - `transactions`: tx_id → serialized StoredTransaction
//! - `tx_reference_index`: reference → tx_id
//! - `wallet_tx_index`: composite key (wallet_id|!created_at|tx_id) → direction
//!
//! ## Units of work
//!
//! Every mutation runs inside [`LedgerStore::write`]. redb serializes write
//! transactions, so a closure that reads a balance, checks it and writes it
//! back can never interleave with another writer. The closure's error aborts
//! the transaction; success commits it.

use std::path::Path;

use redb::{
    Database, ReadOnlyTable, ReadTransaction, ReadableDatabase, ReadableTable, Table,
    TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
const USER_EMAIL_INDEX: TableDefinition<&str, &str> = TableDefinition::new("user_email_index");
const USER_EXTERNAL_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("user_external_index");

const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");
const WALLET_OWNER_INDEX: TableDefinition<&str, &str> = TableDefinition::new("wallet_owner_index");
const WALLET_NUMBER_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("wallet_number_index");

const API_KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("api_keys");
const API_KEY_HASH_INDEX: TableDefinition<&str, &str> = TableDefinition::new("api_key_hash_index");
/// Key format: `user_id|!created_at_be|key_id` for newest-first listing.
const API_KEY_OWNER_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("api_key_owner_index");

const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");
const TX_REFERENCE_INDEX: TableDefinition<&str, &str> = TableDefinition::new("tx_reference_index");
/// Key format: `wallet_id|!created_at_be|tx_id` → "credit" | "debit".
const WALLET_TX_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("wallet_tx_index");

pub(crate) type RecordTable<'txn> = Table<'txn, &'static str, &'static [u8]>;
pub(crate) type IndexTable<'txn> = Table<'txn, &'static str, &'static str>;
pub(crate) type CompositeTable<'txn> = Table<'txn, &'static [u8], &'static str>;

// =============================================================================
// Error Type
// =============================================================================

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

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unique index violation: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("index points at missing record: {0}")]
    CorruptIndex(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the owner-scoped listing tables.
///
/// Format: `owner | inverted_timestamp_be_bytes | id`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
pub(crate) fn make_index_key(owner: &str, timestamp_micros: i64, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner.len() + 1 + 8 + 1 + id.len());
    key.extend_from_slice(owner.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!(timestamp_micros as u64)).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(id.as_bytes());
    key
}

/// Prefix covering every composite key of one owner.
pub(crate) fn make_prefix(owner: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(owner.len() + 1);
    prefix.extend_from_slice(owner.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Upper bound for a prefix scan (prefix with 0xFF bytes appended).
fn make_prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = Vec::with_capacity(prefix.len() + 16);
    end.extend_from_slice(prefix);
    end.extend_from_slice(&[0xFF; 16]);
    end
}

/// Id embedded after the timestamp segment of a composite key.
pub(crate) fn trailing_id(key: &[u8], prefix_len: usize) -> Option<&str> {
    key.get(prefix_len + 9..)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
}

// =============================================================================
// Table Access Helpers
// =============================================================================

pub(crate) fn get_json<T, R>(table: &R, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

pub(crate) fn put_json<T: Serialize>(
    table: &mut RecordTable<'_>,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let bytes = serde_json::to_vec(value)?;
    table.insert(key, bytes.as_slice())?;
    Ok(())
}

pub(crate) fn get_index<R>(table: &R, key: &str) -> StoreResult<Option<String>>
where
    R: ReadableTable<&'static str, &'static str>,
{
    Ok(table.get(key)?.map(|value| value.value().to_string()))
}

/// Claim `key` for `id` in a unique index.
///
/// Re-claiming a key already held by the same id is a no-op.
pub(crate) fn claim_unique(table: &mut IndexTable<'_>, key: &str, id: &str) -> StoreResult<()> {
    if let Some(holder) = get_index(&*table, key)? {
        if holder != id {
            return Err(StoreError::Conflict(key.to_string()));
        }
        return Ok(());
    }
    table.insert(key, id)?;
    Ok(())
}

/// All `(key, value)` pairs of a composite table under `prefix`, in key order.
pub(crate) fn scan_prefix<R>(table: &R, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, String)>>
where
    R: ReadableTable<&'static [u8], &'static str>,
{
    let end = make_prefix_end(prefix);
    let mut entries = Vec::new();
    for entry in table.range(prefix..end.as_slice())? {
        let (key, value) = entry?;
        entries.push((key.value().to_vec(), value.value().to_string()));
    }
    Ok(entries)
}

// =============================================================================
// Scopes
// =============================================================================

/// Read access shared by read-only and read-write scopes.
///
/// Repository read methods are written once against this trait and work on
/// both snapshot reads and in-flight write transactions.
pub trait LedgerView {
    type Records: ReadableTable<&'static str, &'static [u8]>;
    type Index: ReadableTable<&'static str, &'static str>;
    type Composite: ReadableTable<&'static [u8], &'static str>;

    fn users(&self) -> &Self::Records;
    fn user_email_index(&self) -> &Self::Index;
    fn user_external_index(&self) -> &Self::Index;
    fn wallets(&self) -> &Self::Records;
    fn wallet_owner_index(&self) -> &Self::Index;
    fn wallet_number_index(&self) -> &Self::Index;
    fn api_keys(&self) -> &Self::Records;
    fn api_key_hash_index(&self) -> &Self::Index;
    fn api_key_owner_index(&self) -> &Self::Composite;
    fn transactions(&self) -> &Self::Records;
    fn tx_reference_index(&self) -> &Self::Index;
    fn wallet_tx_index(&self) -> &Self::Composite;
}

/// Consistent snapshot of every ledger table.
pub struct ReadScope {
    users: ReadOnlyTable<&'static str, &'static [u8]>,
    user_email_index: ReadOnlyTable<&'static str, &'static str>,
    user_external_index: ReadOnlyTable<&'static str, &'static str>,
    wallets: ReadOnlyTable<&'static str, &'static [u8]>,
    wallet_owner_index: ReadOnlyTable<&'static str, &'static str>,
    wallet_number_index: ReadOnlyTable<&'static str, &'static str>,
    api_keys: ReadOnlyTable<&'static str, &'static [u8]>,
    api_key_hash_index: ReadOnlyTable<&'static str, &'static str>,
    api_key_owner_index: ReadOnlyTable<&'static [u8], &'static str>,
    transactions: ReadOnlyTable<&'static str, &'static [u8]>,
    tx_reference_index: ReadOnlyTable<&'static str, &'static str>,
    wallet_tx_index: ReadOnlyTable<&'static [u8], &'static str>,
}

impl ReadScope {
    fn open(txn: &ReadTransaction) -> StoreResult<Self> {
        Ok(Self {
            users: txn.open_table(USERS)?,
            user_email_index: txn.open_table(USER_EMAIL_INDEX)?,
            user_external_index: txn.open_table(USER_EXTERNAL_INDEX)?,
            wallets: txn.open_table(WALLETS)?,
            wallet_owner_index: txn.open_table(WALLET_OWNER_INDEX)?,
            wallet_number_index: txn.open_table(WALLET_NUMBER_INDEX)?,
            api_keys: txn.open_table(API_KEYS)?,
            api_key_hash_index: txn.open_table(API_KEY_HASH_INDEX)?,
            api_key_owner_index: txn.open_table(API_KEY_OWNER_INDEX)?,
            transactions: txn.open_table(TRANSACTIONS)?,
            tx_reference_index: txn.open_table(TX_REFERENCE_INDEX)?,
            wallet_tx_index: txn.open_table(WALLET_TX_INDEX)?,
        })
    }
}

impl LedgerView for ReadScope {
    type Records = ReadOnlyTable<&'static str, &'static [u8]>;
    type Index = ReadOnlyTable<&'static str, &'static str>;
    type Composite = ReadOnlyTable<&'static [u8], &'static str>;

    fn users(&self) -> &Self::Records {
        &self.users
    }
    fn user_email_index(&self) -> &Self::Index {
        &self.user_email_index
    }
    fn user_external_index(&self) -> &Self::Index {
        &self.user_external_index
    }
    fn wallets(&self) -> &Self::Records {
        &self.wallets
    }
    fn wallet_owner_index(&self) -> &Self::Index {
        &self.wallet_owner_index
    }
    fn wallet_number_index(&self) -> &Self::Index {
        &self.wallet_number_index
    }
    fn api_keys(&self) -> &Self::Records {
        &self.api_keys
    }
    fn api_key_hash_index(&self) -> &Self::Index {
        &self.api_key_hash_index
    }
    fn api_key_owner_index(&self) -> &Self::Composite {
        &self.api_key_owner_index
    }
    fn transactions(&self) -> &Self::Records {
        &self.transactions
    }
    fn tx_reference_index(&self) -> &Self::Index {
        &self.tx_reference_index
    }
    fn wallet_tx_index(&self) -> &Self::Composite {
        &self.wallet_tx_index
    }
}

/// Every ledger table opened inside one write transaction.
///
/// Write methods live next to their records in `repository/`.
pub struct WriteScope<'txn> {
    pub(crate) users: RecordTable<'txn>,
    pub(crate) user_email_index: IndexTable<'txn>,
    pub(crate) user_external_index: IndexTable<'txn>,
    pub(crate) wallets: RecordTable<'txn>,
    pub(crate) wallet_owner_index: IndexTable<'txn>,
    pub(crate) wallet_number_index: IndexTable<'txn>,
    pub(crate) api_keys: RecordTable<'txn>,
    pub(crate) api_key_hash_index: IndexTable<'txn>,
    pub(crate) api_key_owner_index: CompositeTable<'txn>,
    pub(crate) transactions: RecordTable<'txn>,
    pub(crate) tx_reference_index: IndexTable<'txn>,
    pub(crate) wallet_tx_index: CompositeTable<'txn>,
}

impl<'txn> WriteScope<'txn> {
    fn open(txn: &'txn WriteTransaction) -> StoreResult<Self> {
        Ok(Self {
            users: txn.open_table(USERS)?,
            user_email_index: txn.open_table(USER_EMAIL_INDEX)?,
            user_external_index: txn.open_table(USER_EXTERNAL_INDEX)?,
            wallets: txn.open_table(WALLETS)?,
            wallet_owner_index: txn.open_table(WALLET_OWNER_INDEX)?,
            wallet_number_index: txn.open_table(WALLET_NUMBER_INDEX)?,
            api_keys: txn.open_table(API_KEYS)?,
            api_key_hash_index: txn.open_table(API_KEY_HASH_INDEX)?,
            api_key_owner_index: txn.open_table(API_KEY_OWNER_INDEX)?,
            transactions: txn.open_table(TRANSACTIONS)?,
            tx_reference_index: txn.open_table(TX_REFERENCE_INDEX)?,
            wallet_tx_index: txn.open_table(WALLET_TX_INDEX)?,
        })
    }
}

impl<'txn> LedgerView for WriteScope<'txn> {
    type Records = RecordTable<'txn>;
    type Index = IndexTable<'txn>;
    type Composite = CompositeTable<'txn>;

    fn users(&self) -> &Self::Records {
        &self.users
    }
    fn user_email_index(&self) -> &Self::Index {
        &self.user_email_index
    }
    fn user_external_index(&self) -> &Self::Index {
        &self.user_external_index
    }
    fn wallets(&self) -> &Self::Records {
        &self.wallets
    }
    fn wallet_owner_index(&self) -> &Self::Index {
        &self.wallet_owner_index
    }
    fn wallet_number_index(&self) -> &Self::Index {
        &self.wallet_number_index
    }
    fn api_keys(&self) -> &Self::Records {
        &self.api_keys
    }
    fn api_key_hash_index(&self) -> &Self::Index {
        &self.api_key_hash_index
    }
    fn api_key_owner_index(&self) -> &Self::Composite {
        &self.api_key_owner_index
    }
    fn transactions(&self) -> &Self::Records {
        &self.transactions
    }
    fn tx_reference_index(&self) -> &Self::Index {
        &self.tx_reference_index
    }
    fn wallet_tx_index(&self) -> &Self::Composite {
        &self.wallet_tx_index
    }
}

// =============================================================================
// LedgerStore
// =============================================================================

/// Embedded ACID ledger database.
pub struct LedgerStore {
    db: Database,
}

impl LedgerStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _scope = WriteScope::open(&write_txn)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Run `f` against a consistent snapshot.
    pub fn read<T, E>(&self, f: impl FnOnce(&ReadScope) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let read_txn = self.db.begin_read().map_err(StoreError::from)?;
        let scope = ReadScope::open(&read_txn)?;
        f(&scope)
    }

    /// Run `f` as one atomic unit of work.
    ///
    /// Commits when `f` returns `Ok`, aborts otherwise.
    pub fn write<T, E>(&self, f: impl FnOnce(&mut WriteScope<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let write_txn = self.db.begin_write().map_err(StoreError::from)?;
        let outcome = match WriteScope::open(&write_txn) {
            Ok(mut scope) => f(&mut scope),
            Err(err) => Err(E::from(err)),
        };

        match outcome {
            Ok(value) => {
                write_txn.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = write_txn.abort() {
                    tracing::warn!(error = %abort_err, "Failed to abort ledger write transaction");
                }
                Err(err)
            }
        }
    }

    /// Cheap liveness probe used by the readiness endpoint.
    pub fn check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (LedgerStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(&dir.path().join("ledger.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn open_creates_tables_and_passes_check() {
        let (store, _dir) = temp_store();
        store.check().unwrap();
        let empty = store
            .read(|scope| get_json::<serde_json::Value, _>(scope.users(), "missing"))
            .unwrap();
        assert!(empty.is_none());
    }

    #[test]
    fn write_commits_on_ok() {
        let (store, _dir) = temp_store();
        store
            .write(|scope| put_json(&mut scope.users, "u1", &serde_json::json!({ "n": 1 })))
            .unwrap();

        let value: Option<serde_json::Value> =
            store.read(|scope| get_json(scope.users(), "u1")).unwrap();
        assert_eq!(value.unwrap()["n"], 1);
    }

    #[test]
    fn write_aborts_on_err() {
        let (store, _dir) = temp_store();
        let result: StoreResult<()> = store.write(|scope| {
            put_json(&mut scope.users, "u1", &serde_json::json!({ "n": 1 }))?;
            Err(StoreError::Conflict("forced".into()))
        });
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        let value: Option<serde_json::Value> =
            store.read(|scope| get_json(scope.users(), "u1")).unwrap();
        assert!(value.is_none(), "aborted write must leave no trace");
    }

    #[test]
    fn claim_unique_rejects_other_holder() {
        let (store, _dir) = temp_store();
        store
            .write(|scope| claim_unique(&mut scope.user_email_index, "a@x.com", "u1"))
            .unwrap();
        // Same holder re-claims without error
        store
            .write(|scope| claim_unique(&mut scope.user_email_index, "a@x.com", "u1"))
            .unwrap();

        let err = store
            .write(|scope| claim_unique(&mut scope.user_email_index, "a@x.com", "u2"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn make_index_key_ordering() {
        // Newer timestamps should produce smaller composite keys (descending)
        let key_old = make_index_key("owner", 1_000, "tx1");
        let key_new = make_index_key("owner", 2_000, "tx2");
        assert!(key_new < key_old, "Newer timestamps should sort first");
    }

    #[test]
    fn scan_prefix_is_owner_scoped_and_newest_first() {
        let (store, _dir) = temp_store();
        store
            .write(|scope| {
                let entries = [("a", 1, "x1"), ("a", 3, "x3"), ("b", 2, "y2"), ("a", 2, "x2")];
                for (owner, ts, id) in entries {
                    let key = make_index_key(owner, ts, id);
                    scope.wallet_tx_index.insert(key.as_slice(), "credit")?;
                }
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let prefix = make_prefix("a");
        let ids: Vec<String> = store
            .read(|scope| scan_prefix(scope.wallet_tx_index(), &prefix))
            .unwrap()
            .into_iter()
            .map(|(key, _)| trailing_id(&key, prefix.len()).unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["x3", "x2", "x1"]);
    }
}
