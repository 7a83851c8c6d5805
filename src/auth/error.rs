// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::models::Permission;
use crate::storage::StoreError;

/// Authentication and authorization failures.
///
/// `error_code` follows the service-wide taxonomy (`unauthenticated`,
/// `forbidden`, `internal`); `reason` pinpoints the check that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Neither a bearer token nor an API key was presented
    MissingCredentials,
    /// Endpoint accepts session tokens only
    SessionRequired,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token subject or key owner no longer exists
    UnknownPrincipal,
    /// No key matches the presented secret
    InvalidApiKey,
    /// Key was revoked by its owner
    RevokedApiKey,
    /// Key is past its expiry
    ExpiredApiKey,
    /// Account is deactivated
    AccountInactive,
    /// API key lacks the listed permissions
    MissingPermissions(Vec<Permission>),
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
    reason: String,
}

impl AuthError {
    /// Taxonomy code shared with [`ApiError`].
    pub fn error_code(&self) -> &'static str {
        match self.status_code() {
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::UNAUTHORIZED => "unauthenticated",
            _ => "internal",
        }
    }

    /// Specific failure reason.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::SessionRequired => "session_required",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::UnknownPrincipal => "unknown_principal",
            AuthError::InvalidApiKey => "invalid_api_key",
            AuthError::RevokedApiKey => "revoked_api_key",
            AuthError::ExpiredApiKey => "expired_api_key",
            AuthError::AccountInactive => "account_inactive",
            AuthError::MissingPermissions(_) => "missing_permissions",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::SessionRequired
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::UnknownPrincipal
            | AuthError::InvalidApiKey
            | AuthError::RevokedApiKey
            | AuthError::ExpiredApiKey => StatusCode::UNAUTHORIZED,
            AuthError::AccountInactive | AuthError::MissingPermissions(_) => StatusCode::FORBIDDEN,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => {
                write!(f, "Authentication required: provide a bearer token or x-api-key")
            }
            AuthError::SessionRequired => {
                write!(f, "This endpoint requires a bearer session token")
            }
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::UnknownPrincipal => write!(f, "User not found"),
            AuthError::InvalidApiKey => write!(f, "Invalid API key"),
            AuthError::RevokedApiKey => write!(f, "API key has been revoked"),
            AuthError::ExpiredApiKey => write!(f, "API key has expired"),
            AuthError::AccountInactive => write!(f, "Account is inactive"),
            AuthError::MissingPermissions(missing) => {
                let names: Vec<&str> = missing.iter().map(Permission::as_str).collect();
                write!(f, "API key lacks required permissions: {}", names.join(", "))
            }
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
            reason: self.reason().to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err.status_code() {
            StatusCode::FORBIDDEN => ApiError::Forbidden(err.to_string()),
            StatusCode::UNAUTHORIZED => ApiError::Unauthenticated(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Ledger store failure during authentication");
        AuthError::InternalError("storage unavailable".to_string())
    }
}
