// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Ledger - Custodial Wallet Ledger Service
//!
//! Users sign in through an external identity provider, receive a wallet
//! holding a single balance in minor currency units, fund it through a
//! hosted payment gateway and move value to other wallets.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session tokens, API keys and permission checks
//! - `identity` - OAuth login and user provisioning
//! - `keys` - API key lifecycle (issue, revoke, rollover)
//! - `ledger` - Balances, deposits and transfers
//! - `payments` - Payment gateway client, webhooks and reconciliation
//! - `storage` - Transactional ledger database (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod keys;
pub mod ledger;
pub mod models;
pub mod payments;
pub mod secrets;
pub mod state;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
mod testutil;
