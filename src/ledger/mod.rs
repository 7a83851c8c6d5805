// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Engine
//!
//! Owns wallet balances and transaction records.
//!
//! ## Transaction State Machine
//!
//! ```text
//! pending ──confirm──▶ success
//!    │
//!    └──────fail─────▶ failed
//! ```
//!
//! Transfers are written directly as `success`. Nothing leaves a terminal
//! state, so confirming or failing a settled deposit returns it unchanged.
//!
//! ## Atomicity
//!
//! Each operation below is one [`LedgerStore::write`] unit of work: the
//! balance check, the debit and credit, and the transaction record commit
//! together or not at all. redb admits a single writer at a time, which makes
//! check-then-act on a balance race-free.

pub mod amount;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Direction, TransactionKind, TransactionStatus};
use crate::secrets::random_hex;
use crate::storage::{
    LedgerStore, StoredTransaction, StoredWallet, TransactionRepository, WalletRepository,
    WriteScope,
};

/// Public transaction reference: `txn_` followed by 32 hex characters.
pub fn new_reference() -> Result<String, ApiError> {
    Ok(format!("txn_{}", random_hex(16)?))
}

/// Outcome of a reconciliation step.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub transaction: StoredTransaction,
    /// `false` when the transaction was already terminal
    pub applied: bool,
}

#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub transaction: StoredTransaction,
    pub sender_balance: u64,
    pub recipient_wallet_number: String,
}

/// One row of a wallet's history, seen from that wallet.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub transaction: StoredTransaction,
    pub direction: Direction,
    /// The other wallet of a transfer
    pub counterparty_wallet_number: Option<String>,
}

pub struct Ledger {
    store: Arc<LedgerStore>,
}

fn pending_deposit(scope: &WriteScope<'_>, reference: &str) -> Result<StoredTransaction, ApiError> {
    scope
        .transaction_by_reference(reference)?
        .ok_or_else(|| ApiError::not_found("Transaction not found"))
}

impl Ledger {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// The wallet owned by `owner_id`.
    pub fn wallet_for_owner(&self, owner_id: Uuid) -> Result<StoredWallet, ApiError> {
        self.store
            .read(|scope| scope.wallet_for_owner(owner_id))?
            .ok_or_else(|| ApiError::not_found("Wallet not found"))
    }

    /// Record a pending deposit. No balance changes until confirmation.
    pub fn open_deposit(
        &self,
        owner_id: Uuid,
        wallet_id: Uuid,
        reference: String,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<StoredTransaction, ApiError> {
        if amount == 0 {
            return Err(ApiError::bad_request("Deposit amount must be positive"));
        }

        let tx = self.store.write(|scope| {
            let wallet = scope
                .wallet(wallet_id)?
                .filter(|wallet| wallet.owner_id == owner_id)
                .ok_or_else(|| ApiError::not_found("Wallet not found"))?;
            let tx = StoredTransaction::new_deposit(owner_id, wallet.id, reference, amount, now);
            scope.insert_transaction(&tx)?;
            Ok::<_, ApiError>(tx)
        })?;

        tracing::info!(
            reference = %tx.reference,
            wallet_id = %wallet_id,
            amount,
            "Deposit opened"
        );
        Ok(tx)
    }

    /// Credit a pending deposit exactly once.
    ///
    /// `paid_at` defaults to `now` when the gateway did not supply one.
    pub fn confirm_deposit(
        &self,
        reference: &str,
        paid_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Settlement, ApiError> {
        let settlement = self.store.write(|scope| {
            let mut tx = pending_deposit(scope, reference)?;
            if tx.status.is_terminal() {
                return Ok(Settlement { transaction: tx, applied: false });
            }

            let mut wallet = scope.wallet(tx.wallet_id)?.ok_or_else(|| {
                tracing::error!(reference, wallet_id = %tx.wallet_id, "Deposit wallet missing");
                ApiError::internal("Deposit wallet missing")
            })?;
            wallet.credit(tx.amount, now)?;
            scope.save_wallet(&wallet)?;

            tx.status = TransactionStatus::Success;
            tx.paid_at = Some(paid_at.unwrap_or(now));
            tx.updated_at = now;
            scope.save_transaction(&tx)?;
            Ok::<_, ApiError>(Settlement { transaction: tx, applied: true })
        })?;

        if settlement.applied {
            tracing::info!(
                reference,
                amount = settlement.transaction.amount,
                wallet_id = %settlement.transaction.wallet_id,
                "Deposit confirmed and credited"
            );
        } else {
            tracing::info!(
                reference,
                status = ?settlement.transaction.status,
                "Deposit already settled, confirmation ignored"
            );
        }
        Ok(settlement)
    }

    /// Mark a pending deposit failed. No balance effect.
    pub fn fail_deposit(
        &self,
        reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Settlement, ApiError> {
        let settlement = self.store.write(|scope| {
            let mut tx = pending_deposit(scope, reference)?;
            if tx.status.is_terminal() {
                return Ok(Settlement { transaction: tx, applied: false });
            }
            tx.status = TransactionStatus::Failed;
            tx.updated_at = now;
            scope.save_transaction(&tx)?;
            Ok::<_, ApiError>(Settlement { transaction: tx, applied: true })
        })?;

        if settlement.applied {
            tracing::info!(reference, "Deposit marked failed");
        }
        Ok(settlement)
    }

    /// Move `amount` from the wallet of `sender_owner_id` to `recipient_wallet_number`.
    pub fn transfer(
        &self,
        sender_owner_id: Uuid,
        recipient_wallet_number: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<TransferReceipt, ApiError> {
        if amount == 0 {
            return Err(ApiError::bad_request("Transfer amount must be positive"));
        }
        let reference = new_reference()?;

        let receipt = self.store.write(|scope| {
            let mut sender = scope
                .wallet_for_owner(sender_owner_id)?
                .ok_or_else(|| ApiError::not_found("Wallet not found"))?;
            if sender.balance() < amount {
                return Err(ApiError::InsufficientFunds {
                    available: sender.balance(),
                    requested: amount,
                });
            }
            let mut recipient = scope
                .wallet_by_number(recipient_wallet_number)?
                .ok_or_else(|| ApiError::not_found("Recipient wallet not found"))?;
            if recipient.id == sender.id {
                return Err(ApiError::bad_request("Cannot transfer to your own wallet"));
            }

            sender.debit(amount, now)?;
            recipient.credit(amount, now)?;
            scope.save_wallet(&sender)?;
            scope.save_wallet(&recipient)?;

            let tx = StoredTransaction::new_transfer(
                sender_owner_id,
                sender.id,
                recipient.id,
                reference,
                amount,
                now,
            );
            scope.insert_transaction(&tx)?;
            Ok(TransferReceipt {
                transaction: tx,
                sender_balance: sender.balance(),
                recipient_wallet_number: recipient.wallet_number,
            })
        })?;

        tracing::info!(
            reference = %receipt.transaction.reference,
            from_wallet = %receipt.transaction.wallet_id,
            to_wallet = %receipt.recipient_wallet_number,
            amount,
            "Transfer completed"
        );
        Ok(receipt)
    }

    /// History of the wallet owned by `owner_id`, newest first.
    pub fn history(&self, owner_id: Uuid) -> Result<Vec<HistoryEntry>, ApiError> {
        self.store.read(|scope| {
            let wallet = scope
                .wallet_for_owner(owner_id)?
                .ok_or_else(|| ApiError::not_found("Wallet not found"))?;

            let mut entries = Vec::new();
            for (tx, direction) in scope.wallet_history(wallet.id)? {
                let counterparty_id = match (tx.kind, direction) {
                    (TransactionKind::Transfer, Direction::Debit) => tx.counterparty_wallet_id,
                    (TransactionKind::Transfer, Direction::Credit) => Some(tx.wallet_id),
                    (TransactionKind::Deposit, _) => None,
                };
                let counterparty_wallet_number = match counterparty_id {
                    Some(id) => scope.wallet(id)?.map(|w| w.wallet_number),
                    None => None,
                };
                entries.push(HistoryEntry {
                    transaction: tx,
                    direction,
                    counterparty_wallet_number,
                });
            }
            Ok(entries)
        })
    }

    /// Read-only status lookup by reference.
    pub fn transaction_by_reference(&self, reference: &str) -> Result<StoredTransaction, ApiError> {
        self.store
            .read(|scope| scope.transaction_by_reference(reference))?
            .ok_or_else(|| ApiError::not_found("Transaction not found"))
    }
}
