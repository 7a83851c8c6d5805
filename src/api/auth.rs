// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth login endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::{ApiError, ErrorBody},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Identity provider consent page; redirect the user here
    pub authorization_url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    /// Authorization code from the identity provider
    pub code: Option<String>,
    /// Anti-forgery state issued by `/auth/login`
    pub state: Option<String>,
    /// Error reported by the identity provider
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CallbackResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub wallet_number: String,
    pub access_token: String,
    /// Always `bearer`
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

/// Start the OAuth login flow.
#[utoipa::path(
    get,
    path = "/auth/login",
    tag = "Auth",
    responses(
        (status = 200, description = "Consent URL issued", body = LoginResponse),
        (status = 503, description = "Identity provider not configured", body = ErrorBody)
    )
)]
pub async fn login(State(state): State<AppState>) -> Result<Json<LoginResponse>, ApiError> {
    let token = state.oauth_states.issue(Utc::now()).await?;
    let authorization_url = state.identity_provider.authorization_url(&token)?;
    Ok(Json(LoginResponse { authorization_url }))
}

/// Finish the OAuth login flow and mint a session token.
///
/// First login provisions the user and their wallet.
#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = "Auth",
    params(CallbackQuery),
    responses(
        (status = 200, description = "Signed in", body = CallbackResponse),
        (status = 400, description = "Missing or invalid parameters", body = ErrorBody),
        (status = 401, description = "Authorization code rejected", body = ErrorBody),
        (status = 503, description = "Identity provider unavailable", body = ErrorBody)
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<CallbackResponse>, ApiError> {
    if let Some(error) = query.error {
        return Err(ApiError::bad_request(format!("Identity provider error: {error}")));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;
    let oauth_state = query
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing state parameter"))?;

    if !state.oauth_states.consume(&oauth_state, Utc::now()).await {
        tracing::warn!("OAuth callback with unknown or expired state");
        return Err(ApiError::bad_request("Invalid state parameter"));
    }

    let identity = state.identity_provider.exchange_code(&code).await?;
    let resolved = state.identity.resolve(&identity, Utc::now())?;
    let session = state
        .sessions
        .mint(resolved.user.id, Utc::now())
        .map_err(ApiError::from)?;

    tracing::info!(user_id = %resolved.user.id, created = resolved.created, "User signed in");

    Ok(Json(CallbackResponse {
        user_id: resolved.user.id,
        email: resolved.user.email,
        name: resolved.user.name,
        wallet_number: resolved.wallet.wallet_number,
        access_token: session.token,
        token_type: "bearer".to_string(),
        expires_at: session.expires_at,
    }))
}
