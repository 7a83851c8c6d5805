// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API key management endpoints. Session tokens only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::ApiJson;
use crate::{
    auth::SessionAuth,
    error::{ApiError, ErrorBody},
    keys::IssuedKey,
    models::Permission,
    state::AppState,
    storage::StoredApiKey,
};

/// Key metadata. Never includes the secret.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiKeyView {
    pub id: Uuid,
    pub name: String,
    /// First 16 characters of the secret, for identification
    pub prefix: String,
    pub permissions: Vec<Permission>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<StoredApiKey> for ApiKeyView {
    fn from(key: StoredApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            prefix: key.prefix,
            permissions: key.scopes.iter().collect(),
            expires_at: key.expires_at,
            active: key.active,
            created_at: key.created_at,
            revoked_at: key.revoked_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateKeyRequest {
    /// 1 to 100 characters
    pub name: String,
    /// Any of `deposit`, `transfer`, `read`
    pub permissions: Vec<String>,
    /// Lifetime such as `2H`, `30D`, `1M`, `1Y`; omitted means never expires
    #[serde(default)]
    pub expiry: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RolloverKeyRequest {
    /// Lifetime of the replacement key
    #[serde(default)]
    pub expiry: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateKeyResponse {
    /// Raw secret. Shown once; only its hash is stored.
    pub api_key: String,
    pub key: ApiKeyView,
}

impl From<IssuedKey> for CreateKeyResponse {
    fn from(issued: IssuedKey) -> Self {
        Self {
            api_key: issued.secret.into_inner(),
            key: issued.key.into(),
        }
    }
}

/// Issue a new API key.
#[utoipa::path(
    post,
    path = "/keys",
    tag = "Keys",
    request_body = CreateKeyRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Key issued", body = CreateKeyResponse),
        (status = 400, description = "Invalid name, permissions or expiry", body = ErrorBody),
        (status = 401, description = "Session token required", body = ErrorBody),
        (status = 403, description = "Account inactive", body = ErrorBody),
        (status = 429, description = "Active key limit reached", body = ErrorBody)
    )
)]
pub async fn create_key(
    SessionAuth(user): SessionAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateKeyRequest>,
) -> Result<(StatusCode, Json<CreateKeyResponse>), ApiError> {
    let issued = state.keys.create(
        user.user_id,
        &request.name,
        &request.permissions,
        request.expiry.as_deref(),
        Utc::now(),
    )?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// List every key of the caller, newest first.
#[utoipa::path(
    get,
    path = "/keys",
    tag = "Keys",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Key metadata", body = Vec<ApiKeyView>),
        (status = 401, description = "Session token required", body = ErrorBody)
    )
)]
pub async fn list_keys(
    SessionAuth(user): SessionAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<ApiKeyView>>, ApiError> {
    let keys = state.keys.list(user.user_id)?;
    Ok(Json(keys.into_iter().map(ApiKeyView::from).collect()))
}

/// Permanently revoke a key.
#[utoipa::path(
    post,
    path = "/keys/{key_id}/revoke",
    tag = "Keys",
    params(("key_id" = Uuid, Path, description = "API key ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Key revoked", body = ApiKeyView),
        (status = 404, description = "Key not found", body = ErrorBody),
        (status = 409, description = "Key already revoked", body = ErrorBody)
    )
)]
pub async fn revoke_key(
    SessionAuth(user): SessionAuth,
    State(state): State<AppState>,
    Path(key_id): Path<Uuid>,
) -> Result<Json<ApiKeyView>, ApiError> {
    let key = state.keys.revoke(user.user_id, key_id, Utc::now())?;
    Ok(Json(key.into()))
}

/// Replace an expired key with a new one carrying the same permissions.
#[utoipa::path(
    post,
    path = "/keys/{key_id}/rollover",
    tag = "Keys",
    params(("key_id" = Uuid, Path, description = "Expired API key ID")),
    request_body = RolloverKeyRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Replacement key issued", body = CreateKeyResponse),
        (status = 404, description = "Key not found", body = ErrorBody),
        (status = 409, description = "Key has not expired", body = ErrorBody),
        (status = 429, description = "Active key limit reached", body = ErrorBody)
    )
)]
pub async fn rollover_key(
    SessionAuth(user): SessionAuth,
    State(state): State<AppState>,
    Path(key_id): Path<Uuid>,
    ApiJson(request): ApiJson<RolloverKeyRequest>,
) -> Result<(StatusCode, Json<CreateKeyResponse>), ApiError> {
    let issued = state.keys.rollover(
        user.user_id,
        key_id,
        request.expiry.as_deref(),
        Utc::now(),
    )?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{bearer, get, post_json, send};
    use crate::testutil::TestHarness;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn create_list_revoke_cycle() {
        let harness = TestHarness::new();
        let (_, token) = harness.user_with_session("a@x.com");
        let auth = bearer(&token);
        let headers = [("authorization", auth.as_str())];

        let (status, created) = send(
            harness.router(),
            post_json(
                "/keys",
                &headers,
                json!({ "name": "ci", "permissions": ["read", "deposit"], "expiry": "1D" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let raw = created["api_key"].as_str().unwrap();
        assert!(raw.starts_with("sk_live_"));
        assert_eq!(created["key"]["prefix"], &raw[..16]);
        assert_eq!(created["key"]["permissions"], json!(["deposit", "read"]));

        let (status, listed) = send(harness.router(), get("/keys", &headers)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert!(listed[0].get("api_key").is_none());

        let id = created["key"]["id"].as_str().unwrap();
        let uri = format!("/keys/{id}/revoke");
        let (status, revoked) = send(harness.router(), post_json(&uri, &headers, json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(revoked["active"], false);

        let (status, again) = send(harness.router(), post_json(&uri, &headers, json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(again["error_code"], "invalid_state");
    }

    #[tokio::test]
    async fn api_keys_cannot_manage_keys() {
        let harness = TestHarness::new();
        let (user, _) = harness.user_with_session("a@x.com");
        let raw = harness.api_key_for(user.id, &["read", "deposit", "transfer"]);

        let (status, body) = send(
            harness.router(),
            get("/keys", &[("x-api-key", raw.as_str())]),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "unauthenticated");
        assert_eq!(body["reason"], "session_required");
    }

    #[tokio::test]
    async fn sixth_key_hits_quota() {
        let harness = TestHarness::new();
        let (user, token) = harness.user_with_session("a@x.com");
        for _ in 0..5 {
            harness.api_key_for(user.id, &["read"]);
        }
        let auth = bearer(&token);
        let (status, body) = send(
            harness.router(),
            post_json(
                "/keys",
                &[("authorization", auth.as_str())],
                json!({ "name": "sixth", "permissions": ["read"] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error_code"], "quota_exceeded");
    }

    #[tokio::test]
    async fn invalid_expiry_and_malformed_body_are_invalid_input() {
        let harness = TestHarness::new();
        let (_, token) = harness.user_with_session("a@x.com");
        let auth = bearer(&token);
        let headers = [("authorization", auth.as_str())];

        let (status, body) = send(
            harness.router(),
            post_json(
                "/keys",
                &headers,
                json!({ "name": "k", "permissions": ["read"], "expiry": "0D" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_input");

        let (status, body) = send(
            harness.router(),
            post_json("/keys", &headers, json!({ "permissions": "read" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_input");
    }

    #[tokio::test]
    async fn rollover_of_live_key_is_invalid_state() {
        let harness = TestHarness::new();
        let (_, token) = harness.user_with_session("a@x.com");
        let auth = bearer(&token);
        let headers = [("authorization", auth.as_str())];

        let (_, created) = send(
            harness.router(),
            post_json(
                "/keys",
                &headers,
                json!({ "name": "k", "permissions": ["read"], "expiry": "1H" }),
            ),
        )
        .await;
        let id = created["key"]["id"].as_str().unwrap();
        let (status, body) = send(
            harness.router(),
            post_json(&format!("/keys/{id}/rollover"), &headers, json!({ "expiry": "1D" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_code"], "invalid_state");
    }
}
