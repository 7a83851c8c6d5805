// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger transaction records.
//!
//! ## Indexes
//!
//! Each record is reachable by id, by its public reference, and from every
//! wallet it touches through `wallet_tx_index`. A transfer is stored once,
//! indexed as a debit under the sender and a credit under the recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Direction, TransactionKind, TransactionStatus};
use crate::storage::database::{
    claim_unique, get_index, get_json, make_index_key, make_prefix, put_json, scan_prefix,
    trailing_id, LedgerView, StoreError, StoreResult, WriteScope,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: Uuid,
    /// Public reference (`txn_<32 hex>`), shared with the payment gateway
    pub reference: String,
    /// User who initiated the transaction
    pub owner_id: Uuid,
    /// Wallet credited by a deposit, or debited by a transfer
    pub wallet_id: Uuid,
    /// Recipient wallet of a transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_wallet_id: Option<Uuid>,
    /// Smallest currency unit, always positive
    pub amount: u64,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredTransaction {
    /// A deposit awaiting gateway confirmation.
    pub fn new_deposit(
        owner_id: Uuid,
        wallet_id: Uuid,
        reference: String,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference,
            owner_id,
            wallet_id,
            counterparty_wallet_id: None,
            amount,
            kind: TransactionKind::Deposit,
            status: TransactionStatus::Pending,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A completed wallet-to-wallet transfer.
    pub fn new_transfer(
        owner_id: Uuid,
        sender_wallet_id: Uuid,
        recipient_wallet_id: Uuid,
        reference: String,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference,
            owner_id,
            wallet_id: sender_wallet_id,
            counterparty_wallet_id: Some(recipient_wallet_id),
            amount,
            kind: TransactionKind::Transfer,
            status: TransactionStatus::Success,
            paid_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// `(wallet_id, direction)` pairs this record is indexed under.
    fn wallet_entries(&self) -> Vec<(Uuid, Direction)> {
        match (self.kind, self.counterparty_wallet_id) {
            (TransactionKind::Transfer, Some(recipient)) => vec![
                (self.wallet_id, Direction::Debit),
                (recipient, Direction::Credit),
            ],
            (TransactionKind::Transfer, None) => vec![(self.wallet_id, Direction::Debit)],
            (TransactionKind::Deposit, _) => vec![(self.wallet_id, Direction::Credit)],
        }
    }
}

pub trait TransactionRepository: LedgerView {
    fn transaction(&self, id: Uuid) -> StoreResult<Option<StoredTransaction>> {
        get_json(self.transactions(), &id.to_string())
    }

    fn transaction_by_reference(&self, reference: &str) -> StoreResult<Option<StoredTransaction>> {
        match get_index(self.tx_reference_index(), reference)? {
            Some(id) => get_json(self.transactions(), &id),
            None => Ok(None),
        }
    }

    /// Transactions touching `wallet_id`, newest first, with their direction.
    fn wallet_history(&self, wallet_id: Uuid) -> StoreResult<Vec<(StoredTransaction, Direction)>> {
        let prefix = make_prefix(&wallet_id.to_string());
        let mut history = Vec::new();
        for (index_key, direction) in scan_prefix(self.wallet_tx_index(), &prefix)? {
            let id = trailing_id(&index_key, prefix.len())
                .ok_or_else(|| StoreError::CorruptIndex("wallet_tx_index".into()))?;
            let direction = Direction::from_str(&direction)
                .ok_or_else(|| StoreError::CorruptIndex(format!("direction {direction}")))?;
            let tx = get_json(self.transactions(), id)?
                .ok_or_else(|| StoreError::CorruptIndex(format!("transaction {id}")))?;
            history.push((tx, direction));
        }
        Ok(history)
    }
}

impl<S: LedgerView + ?Sized> TransactionRepository for S {}

impl WriteScope<'_> {
    /// Insert a new record with its reference and wallet index entries.
    pub fn insert_transaction(&mut self, tx: &StoredTransaction) -> StoreResult<()> {
        let id = tx.id.to_string();
        claim_unique(&mut self.tx_reference_index, &tx.reference, &id)?;

        let timestamp = tx.created_at.timestamp_micros();
        for (wallet_id, direction) in tx.wallet_entries() {
            let key = make_index_key(&wallet_id.to_string(), timestamp, &id);
            self.wallet_tx_index
                .insert(key.as_slice(), direction.as_str())?;
        }
        put_json(&mut self.transactions, &id, tx)
    }

    /// Persist a status change on an existing record.
    pub fn save_transaction(&mut self, tx: &StoredTransaction) -> StoreResult<()> {
        let id = tx.id.to_string();
        if self.transaction(tx.id)?.is_none() {
            return Err(StoreError::NotFound(format!("Transaction {id}")));
        }
        put_json(&mut self.transactions, &id, tx)
    }
}
