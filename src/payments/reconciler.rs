// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deposit reconciliation.
//!
//! The only path by which external money enters the ledger. Deposits are
//! registered with the gateway first and persisted as `pending` only after
//! the gateway accepts them; confirmation arrives later through a signed
//! webhook or a status poll, and is applied at most once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::events::{parse_event, WebhookEvent};
use super::gateway::{ChargeStatus, InitializeRequest, PaymentGateway};
use super::signature::WebhookVerifier;
use crate::error::ApiError;
use crate::ledger::amount::{format_minor, MIN_DEPOSIT_MINOR};
use crate::ledger::{new_reference, Ledger};
use crate::storage::StoredTransaction;

#[derive(Debug, Clone)]
pub struct DepositInitiated {
    pub authorization_url: String,
    pub transaction: StoredTransaction,
}

pub struct Reconciler {
    ledger: Arc<Ledger>,
    gateway: Arc<dyn PaymentGateway>,
    webhooks: WebhookVerifier,
}

impl Reconciler {
    pub fn new(
        ledger: Arc<Ledger>,
        gateway: Arc<dyn PaymentGateway>,
        webhooks: WebhookVerifier,
    ) -> Self {
        Self {
            ledger,
            gateway,
            webhooks,
        }
    }

    /// Open a deposit of `amount` minor units for the wallet of `owner_id`.
    pub async fn initiate_deposit(
        &self,
        owner_id: Uuid,
        email: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<DepositInitiated, ApiError> {
        if amount < MIN_DEPOSIT_MINOR {
            return Err(ApiError::bad_request(format!(
                "Minimum deposit is {}",
                format_minor(MIN_DEPOSIT_MINOR)
            )));
        }
        let wallet = self.ledger.wallet_for_owner(owner_id)?;
        let reference = new_reference()?;

        let charge = self
            .gateway
            .initialize(InitializeRequest {
                email,
                amount,
                reference: &reference,
            })
            .await?;

        let transaction = self
            .ledger
            .open_deposit(owner_id, wallet.id, reference, amount, now)?;

        Ok(DepositInitiated {
            authorization_url: charge.authorization_url,
            transaction,
        })
    }

    /// Verify, parse and apply a raw webhook delivery.
    pub fn handle_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        if !self.webhooks.verify(body, signature) {
            warn!(
                has_signature = signature.is_some(),
                "Rejected webhook with invalid signature"
            );
            return Err(ApiError::unauthenticated("Invalid webhook signature"));
        }

        let event = parse_event(body).inspect_err(|err| {
            warn!(error = %err, "Rejected malformed webhook payload");
        })?;
        self.handle_event(&event, now)
    }

    /// Apply a parsed event. Unknown references and unhandled events are
    /// accepted without effect.
    pub fn handle_event(&self, event: &WebhookEvent, now: DateTime<Utc>) -> Result<(), ApiError> {
        let outcome = match event {
            WebhookEvent::ChargeSuccess { reference, paid_at } => {
                self.ledger.confirm_deposit(reference, *paid_at, now).map(|_| ())
            }
            WebhookEvent::ChargeFailed { reference } => {
                self.ledger.fail_deposit(reference, now).map(|_| ())
            }
            WebhookEvent::Ignored { event, reference } => {
                info!(event = %event, reference = %reference, "Ignoring unhandled webhook event");
                Ok(())
            }
        };

        match outcome {
            Err(ApiError::NotFound(_)) => {
                info!(reference = %event.reference(), "Webhook for unknown reference ignored");
                Ok(())
            }
            other => other,
        }
    }

    /// Refresh a deposit from the gateway.
    ///
    /// Terminal transactions are returned as stored. On gateway failure the
    /// last known local state is returned.
    pub async fn poll_status(
        &self,
        reference: &str,
        now: DateTime<Utc>,
    ) -> Result<StoredTransaction, ApiError> {
        let local = self.ledger.transaction_by_reference(reference)?;
        if local.status.is_terminal() {
            return Ok(local);
        }

        let verified = match self.gateway.verify(reference).await {
            Ok(verified) => verified,
            Err(err) => {
                warn!(reference, error = %err, "Gateway status poll failed, returning local state");
                return Ok(local);
            }
        };

        match verified.status {
            ChargeStatus::Success => Ok(self
                .ledger
                .confirm_deposit(reference, verified.paid_at, now)?
                .transaction),
            ChargeStatus::Failed => Ok(self.ledger.fail_deposit(reference, now)?.transaction),
            ChargeStatus::Pending => Ok(local),
        }
    }
}
