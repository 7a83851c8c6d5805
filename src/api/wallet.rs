// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet endpoints: balance, deposits, transfers and history.
//!
//! Each endpoint accepts a session token or an API key holding the listed
//! permission.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::ApiJson;
use crate::{
    auth::{Authorized, DepositAccess, ReadAccess, TransferAccess},
    error::{ApiError, ErrorBody},
    ledger::{
        amount::{DisplayAmount, MIN_TRANSFER_MINOR},
        HistoryEntry,
    },
    models::{Direction, TransactionKind, TransactionStatus, WalletNumber},
    state::AppState,
    storage::StoredTransaction,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub wallet_number: String,
    /// Smallest currency unit
    pub balance: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DepositRequest {
    /// Display-currency decimal, string or number, at most 2 decimals, minimum 1.00
    #[schema(value_type = String, example = "50.00")]
    pub amount: DisplayAmount,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DepositResponse {
    pub reference: String,
    /// Gateway checkout page
    pub authorization_url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DepositStatusQuery {
    /// Ask the payment gateway for the live status first
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionStatusResponse {
    pub reference: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount: u64,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<StoredTransaction> for TransactionStatusResponse {
    fn from(tx: StoredTransaction) -> Self {
        Self {
            reference: tx.reference,
            kind: tx.kind,
            status: tx.status,
            amount: tx.amount,
            paid_at: tx.paid_at,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// 13-digit recipient wallet number
    pub wallet_number: String,
    /// Smallest currency unit, at least 100
    pub amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResponse {
    pub reference: String,
    pub status: TransactionStatus,
    pub amount: u64,
    pub recipient_wallet_number: String,
    /// Sender balance after the transfer
    pub balance: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntryView {
    pub reference: String,
    pub kind: TransactionKind,
    pub direction: Direction,
    pub status: TransactionStatus,
    pub amount: u64,
    /// Other wallet of a transfer
    pub counterparty_wallet_number: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryEntry> for HistoryEntryView {
    fn from(entry: HistoryEntry) -> Self {
        let tx = entry.transaction;
        Self {
            reference: tx.reference,
            kind: tx.kind,
            direction: entry.direction,
            status: tx.status,
            amount: tx.amount,
            counterparty_wallet_number: entry.counterparty_wallet_number,
            paid_at: tx.paid_at,
            created_at: tx.created_at,
        }
    }
}

/// Current wallet balance.
#[utoipa::path(
    get,
    path = "/wallet/balance",
    tag = "Wallet",
    security(("bearer" = []), ("api_key" = [])),
    responses(
        (status = 200, description = "Balance", body = BalanceResponse),
        (status = 401, description = "Unauthenticated", body = ErrorBody),
        (status = 403, description = "Key lacks `read`", body = ErrorBody)
    )
)]
pub async fn get_balance(
    Authorized(user, _): Authorized<ReadAccess>,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let wallet = state.ledger.wallet_for_owner(user.user_id)?;
    Ok(Json(BalanceResponse {
        balance: wallet.balance(),
        wallet_number: wallet.wallet_number,
    }))
}

/// Start a gateway deposit. The wallet is credited once the gateway confirms.
#[utoipa::path(
    post,
    path = "/wallet/deposit",
    tag = "Wallet",
    request_body = DepositRequest,
    security(("bearer" = []), ("api_key" = [])),
    responses(
        (status = 201, description = "Deposit opened", body = DepositResponse),
        (status = 400, description = "Invalid amount", body = ErrorBody),
        (status = 403, description = "Key lacks `deposit`", body = ErrorBody),
        (status = 503, description = "Payment gateway unavailable", body = ErrorBody)
    )
)]
pub async fn initiate_deposit(
    Authorized(user, _): Authorized<DepositAccess>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DepositRequest>,
) -> Result<(StatusCode, Json<DepositResponse>), ApiError> {
    let amount = request.amount.to_minor()?;
    let initiated = state
        .reconciler
        .initiate_deposit(user.user_id, &user.email, amount, Utc::now())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(DepositResponse {
            reference: initiated.transaction.reference,
            authorization_url: initiated.authorization_url,
        }),
    ))
}

/// Status of one of the caller's transactions.
///
/// Read-only by default. With `refresh=true` a pending deposit is checked
/// against the gateway and may be settled (credited or failed) by this call.
#[utoipa::path(
    get,
    path = "/wallet/deposit/{reference}/status",
    tag = "Wallet",
    params(
        ("reference" = String, Path, description = "Transaction reference"),
        DepositStatusQuery
    ),
    security(("bearer" = []), ("api_key" = [])),
    responses(
        (status = 200, description = "Transaction status", body = TransactionStatusResponse),
        (status = 404, description = "Unknown reference", body = ErrorBody)
    )
)]
pub async fn deposit_status(
    Authorized(user, _): Authorized<ReadAccess>,
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Query(query): Query<DepositStatusQuery>,
) -> Result<Json<TransactionStatusResponse>, ApiError> {
    let tx = state.ledger.transaction_by_reference(&reference)?;
    if tx.owner_id != user.user_id {
        return Err(ApiError::not_found("Transaction not found"));
    }
    let tx = if query.refresh {
        state.reconciler.poll_status(&reference, Utc::now()).await?
    } else {
        tx
    };
    Ok(Json(tx.into()))
}

/// Move funds to another wallet.
#[utoipa::path(
    post,
    path = "/wallet/transfer",
    tag = "Wallet",
    request_body = TransferRequest,
    security(("bearer" = []), ("api_key" = [])),
    responses(
        (status = 200, description = "Transfer completed", body = TransferResponse),
        (status = 400, description = "Invalid amount or wallet number", body = ErrorBody),
        (status = 403, description = "Key lacks `transfer`", body = ErrorBody),
        (status = 404, description = "Recipient not found", body = ErrorBody),
        (status = 422, description = "Insufficient funds", body = ErrorBody)
    )
)]
pub async fn transfer(
    Authorized(user, _): Authorized<TransferAccess>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let recipient = WalletNumber::parse(&request.wallet_number)?;
    let amount = u64::try_from(request.amount)
        .ok()
        .filter(|a| *a >= MIN_TRANSFER_MINOR)
        .ok_or_else(|| {
            ApiError::bad_request(format!("Minimum transfer amount is {MIN_TRANSFER_MINOR}"))
        })?;

    let receipt = state
        .ledger
        .transfer(user.user_id, recipient.as_str(), amount, Utc::now())?;
    Ok(Json(TransferResponse {
        reference: receipt.transaction.reference,
        status: receipt.transaction.status,
        amount: receipt.transaction.amount,
        recipient_wallet_number: receipt.recipient_wallet_number,
        balance: receipt.sender_balance,
    }))
}

/// Wallet history, newest first.
#[utoipa::path(
    get,
    path = "/wallet/transactions",
    tag = "Wallet",
    security(("bearer" = []), ("api_key" = [])),
    responses(
        (status = 200, description = "Transactions", body = Vec<HistoryEntryView>),
        (status = 403, description = "Key lacks `read`", body = ErrorBody)
    )
)]
pub async fn list_transactions(
    Authorized(user, _): Authorized<ReadAccess>,
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntryView>>, ApiError> {
    let history = state.ledger.history(user.user_id)?;
    Ok(Json(history.into_iter().map(HistoryEntryView::from).collect()))
}
