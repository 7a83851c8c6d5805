// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage Module
//!
//! Persistent state lives in a single **redb** database file: users, wallets,
//! API keys and ledger transactions, each with the unique indexes that make
//! lookups by email, wallet number, key hash and reference possible.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   ledger.redb      # every table, see database.rs
//! ```
//!
//! ## Important Notes
//!
//! - Balance changes and their transaction records are written in the same
//!   redb write transaction
//! - redb allows one writer at a time; readers see committed snapshots

pub mod database;
pub mod repository;

pub use database::{LedgerStore, LedgerView, ReadScope, StoreError, StoreResult, WriteScope};
pub use repository::{
    ApiKeyRepository, StoredApiKey, StoredTransaction, StoredUser, StoredWallet,
    TransactionRepository, UserRepository, WalletRepository,
};
