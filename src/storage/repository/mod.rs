// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the ledger store.
//!
//! Each entity module defines its stored record, a read trait implemented for
//! every [`LedgerView`](super::LedgerView), and write methods on
//! [`WriteScope`](super::WriteScope) that keep the unique indexes in step.

pub mod api_keys;
pub mod transactions;
pub mod users;
pub mod wallets;

pub use api_keys::{ApiKeyRepository, StoredApiKey};
pub use transactions::{StoredTransaction, TransactionRepository};
pub use users::{StoredUser, UserRepository};
pub use wallets::{StoredWallet, WalletRepository};
