// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet records.
//!
//! A wallet belongs to exactly one user and is addressed publicly by its
//! 13-digit wallet number. The balance is private to this module; it only
//! moves through [`StoredWallet::credit`] and [`StoredWallet::debit`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::storage::database::{
    claim_unique, get_index, get_json, put_json, LedgerView, StoreError, StoreResult, WriteScope,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredWallet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub wallet_number: String,
    /// Smallest currency unit
    balance: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredWallet {
    /// A fresh, empty wallet.
    pub fn new(owner_id: Uuid, wallet_number: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            wallet_number,
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Add `amount`; overflow is an internal fault, never a wrap.
    pub(crate) fn credit(&mut self, amount: u64, now: DateTime<Utc>) -> Result<(), ApiError> {
        self.balance = self.balance.checked_add(amount).ok_or_else(|| {
            tracing::error!(wallet_id = %self.id, amount, "Wallet balance overflow");
            ApiError::internal("Wallet balance overflow")
        })?;
        self.updated_at = now;
        Ok(())
    }

    /// Remove `amount`, refusing to go below zero.
    pub(crate) fn debit(&mut self, amount: u64, now: DateTime<Utc>) -> Result<(), ApiError> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(ApiError::InsufficientFunds {
                available: self.balance,
                requested: amount,
            })?;
        self.updated_at = now;
        Ok(())
    }
}

pub trait WalletRepository: LedgerView {
    fn wallet(&self, id: Uuid) -> StoreResult<Option<StoredWallet>> {
        get_json(self.wallets(), &id.to_string())
    }

    fn wallet_for_owner(&self, owner_id: Uuid) -> StoreResult<Option<StoredWallet>> {
        match get_index(self.wallet_owner_index(), &owner_id.to_string())? {
            Some(id) => get_json(self.wallets(), &id),
            None => Ok(None),
        }
    }

    fn wallet_by_number(&self, wallet_number: &str) -> StoreResult<Option<StoredWallet>> {
        match get_index(self.wallet_number_index(), wallet_number)? {
            Some(id) => get_json(self.wallets(), &id),
            None => Ok(None),
        }
    }

    fn wallet_number_taken(&self, wallet_number: &str) -> StoreResult<bool> {
        Ok(get_index(self.wallet_number_index(), wallet_number)?.is_some())
    }
}

impl<S: LedgerView + ?Sized> WalletRepository for S {}

impl WriteScope<'_> {
    /// Insert a wallet; an owner may hold only one and numbers never repeat.
    pub fn insert_wallet(&mut self, wallet: &StoredWallet) -> StoreResult<()> {
        let id = wallet.id.to_string();
        claim_unique(&mut self.wallet_owner_index, &wallet.owner_id.to_string(), &id)?;
        claim_unique(&mut self.wallet_number_index, &wallet.wallet_number, &id)?;
        put_json(&mut self.wallets, &id, wallet)
    }

    /// Persist a balance change on an existing wallet.
    pub fn save_wallet(&mut self, wallet: &StoredWallet) -> StoreResult<()> {
        let id = wallet.id.to_string();
        if self.wallet(wallet.id)?.is_none() {
            return Err(StoreError::NotFound(format!("Wallet {id}")));
        }
        put_json(&mut self.wallets, &id, wallet)
    }
}
