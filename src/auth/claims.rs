// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and the authenticated principal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PermissionSet;
use crate::storage::StoredUser;

/// Claims carried by a session token minted after the OAuth callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: local user id
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

/// How the principal proved its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Bearer session token; never scope-limited
    Session,
    /// API key, limited to the key's scopes
    ApiKey { key_id: Uuid, scopes: PermissionSet },
}

/// The principal making a request.
///
/// This is the primary type used throughout the application to represent
/// the caller once credentials have been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub active: bool,
    pub method: AuthMethod,
}

impl AuthenticatedUser {
    pub fn from_session(user: &StoredUser) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            active: user.active,
            method: AuthMethod::Session,
        }
    }

    pub fn from_api_key(user: &StoredUser, key_id: Uuid, scopes: PermissionSet) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            active: user.active,
            method: AuthMethod::ApiKey { key_id, scopes },
        }
    }

    /// Scope limit, `None` for session principals.
    pub fn scope(&self) -> Option<&PermissionSet> {
        match &self.method {
            AuthMethod::Session => None,
            AuthMethod::ApiKey { scopes, .. } => Some(scopes),
        }
    }

    pub fn is_session(&self) -> bool {
        matches!(self.method, AuthMethod::Session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn session_principal_has_no_scope() {
        let user = StoredUser::new("a@x.com".into(), Utc::now());
        let principal = AuthenticatedUser::from_session(&user);
        assert!(principal.is_session());
        assert!(principal.scope().is_none());
        assert_eq!(principal.user_id, user.id);
    }

    #[test]
    fn api_key_principal_carries_scope() {
        let user = StoredUser::new("a@x.com".into(), Utc::now());
        let scopes = PermissionSet::parse(["read"]).unwrap();
        let principal = AuthenticatedUser::from_api_key(&user, Uuid::new_v4(), scopes.clone());
        assert!(!principal.is_session());
        assert_eq!(principal.scope(), Some(&scopes));
    }
}
