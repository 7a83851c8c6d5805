// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{error::ApiError, state::AppState};

pub mod auth;
pub mod health;
pub mod keys;
pub mod wallet;
pub mod webhook;

/// JSON body extractor whose rejections use the service error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        // Health
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Login
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        // API keys
        .route("/keys", get(keys::list_keys).post(keys::create_key))
        .route("/keys/{key_id}/revoke", post(keys::revoke_key))
        .route("/keys/{key_id}/rollover", post(keys::rollover_key))
        // Wallet
        .route("/wallet/balance", get(wallet::get_balance))
        .route("/wallet/deposit", post(wallet::initiate_deposit))
        .route(
            "/wallet/deposit/{reference}/status",
            get(wallet::deposit_status),
        )
        .route("/wallet/transfer", post(wallet::transfer))
        .route("/wallet/transactions", get(wallet::list_transactions))
        .route("/wallet/paystack/webhook", post(webhook::paystack_webhook))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-api-key"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        auth::login,
        auth::callback,
        keys::create_key,
        keys::list_keys,
        keys::revoke_key,
        keys::rollover_key,
        wallet::get_balance,
        wallet::initiate_deposit,
        wallet::deposit_status,
        wallet::transfer,
        wallet::list_transactions,
        webhook::paystack_webhook
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::models::Permission,
            crate::models::TransactionKind,
            crate::models::TransactionStatus,
            crate::models::Direction,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            auth::LoginResponse,
            auth::CallbackResponse,
            keys::ApiKeyView,
            keys::CreateKeyRequest,
            keys::CreateKeyResponse,
            keys::RolloverKeyRequest,
            wallet::BalanceResponse,
            wallet::DepositRequest,
            wallet::DepositResponse,
            wallet::TransactionStatusResponse,
            wallet::TransferRequest,
            wallet::TransferResponse,
            wallet::HistoryEntryView,
            webhook::WebhookAck
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "OAuth login and session tokens"),
        (name = "Keys", description = "API key lifecycle"),
        (name = "Wallet", description = "Balances, deposits, transfers and history"),
        (name = "Webhooks", description = "Payment gateway callbacks")
    )
)]
struct ApiDoc;
