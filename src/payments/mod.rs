// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment gateway integration and deposit reconciliation.

pub mod events;
pub mod gateway;
pub mod paystack;
pub mod reconciler;
pub mod signature;

pub use gateway::{ChargeStatus, GatewayError, PaymentGateway};
pub use paystack::PaystackClient;
pub use reconciler::{DepositInitiated, Reconciler};
pub use signature::{WebhookVerifier, SIGNATURE_HEADER};
