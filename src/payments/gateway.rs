// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment gateway seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ApiError;

/// Gateway-side view of a charge, mapped into ledger vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Success,
    Failed,
    Pending,
}

/// Map a raw gateway status string.
///
/// `success` confirms; `failed`, `abandoned` and `reversed` fail; anything
/// else (`ongoing`, `processing`, `queued`, ...) keeps the charge pending.
pub fn map_charge_status(raw_status: &str) -> ChargeStatus {
    let status = raw_status.trim().to_ascii_lowercase();
    match status.as_str() {
        "success" => ChargeStatus::Success,
        "failed" | "abandoned" | "reversed" => ChargeStatus::Failed,
        _ => ChargeStatus::Pending,
    }
}

pub struct InitializeRequest<'a> {
    pub email: &'a str,
    /// Smallest currency unit
    pub amount: u64,
    pub reference: &'a str,
}

#[derive(Debug, Clone)]
pub struct InitializedCharge {
    pub authorization_url: String,
}

#[derive(Debug, Clone)]
pub struct VerifiedCharge {
    pub status: ChargeStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Payment gateway is not configured")]
    NotConfigured,

    #[error("Payment gateway request failed: {0}")]
    Request(String),

    #[error("Payment gateway rejected the request: {0}")]
    Rejected(String),

    #[error("Payment gateway response was invalid: {0}")]
    InvalidResponse(String),
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        tracing::warn!(error = %err, "Payment gateway call failed");
        ApiError::upstream(err.to_string())
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register a charge and obtain the checkout URL.
    async fn initialize(
        &self,
        request: InitializeRequest<'_>,
    ) -> Result<InitializedCharge, GatewayError>;

    /// Current state of the charge identified by `reference`.
    async fn verify(&self, reference: &str) -> Result<VerifiedCharge, GatewayError>;
}
