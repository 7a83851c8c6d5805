// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated principals.
//!
//! - [`SessionAuth`]: bearer session token only (key management, login-bound
//!   operations)
//! - [`Authorized<R>`]: bearer token or `x-api-key`, gated on the permissions
//!   of `R`
//!
//! ```rust,ignore
//! async fn balance(
//!     Authorized(user, _): Authorized<ReadAccess>,
//!     State(state): State<AppState>,
//! ) -> Result<Json<BalanceResponse>, ApiError> {
//!     // user.user_id is the wallet owner
//! }
//! ```

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::Utc;

use super::{
    api_key::API_KEY_HEADER,
    permissions::{authorize, Requirement},
    AuthError, AuthenticatedUser,
};
use crate::state::AppState;

/// Bearer token from the Authorization header, if one is present.
fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(Some(token.to_string()))
}

fn api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Extractor for session-authenticated users.
///
/// API keys are refused here: key management must be done by the account
/// holder, not by a key.
pub struct SessionAuth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for SessionAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(&parts.headers)? {
            Some(token) => token,
            None if api_key(&parts.headers).is_some() => return Err(AuthError::SessionRequired),
            None => return Err(AuthError::MissingCredentials),
        };
        let user = state.verifier.verify_session(&token)?;
        Ok(SessionAuth(user))
    }
}

/// Extractor for principals holding the permissions of `R`.
pub struct Authorized<R: Requirement>(pub AuthenticatedUser, pub PhantomData<R>);

impl<R: Requirement> FromRequestParts<AppState> for Authorized<R> {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = api_key(&parts.headers);
        let bearer = match bearer_token(&parts.headers) {
            Ok(bearer) => bearer,
            // A malformed Authorization header still lets a valid key through
            Err(_) if key.is_some() => None,
            Err(err) => return Err(err),
        };

        let user = state
            .verifier
            .verify(bearer.as_deref(), key.as_deref(), Utc::now())?;
        let user = authorize(user, R::REQUIRED)?;
        Ok(Authorized(user, PhantomData))
    }
}
