// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential verification.
//!
//! Two credential kinds resolve to an [`AuthenticatedUser`]:
//!
//! - bearer session tokens (no scope limit)
//! - opaque API keys, looked up by SHA-256 hash (limited to the key's scopes)
//!
//! The dual-mode entry point tries the bearer token first and falls back to
//! the API key.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{api_key::hash_api_key, session::SessionSigner, AuthError, AuthenticatedUser};
use crate::storage::{ApiKeyRepository, LedgerStore, StoreError, UserRepository};

pub struct CredentialVerifier {
    store: Arc<LedgerStore>,
    sessions: Arc<SessionSigner>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<LedgerStore>, sessions: Arc<SessionSigner>) -> Self {
        Self { store, sessions }
    }

    /// Verify a bearer session token and resolve its subject.
    pub fn verify_session(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.sessions.verify(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::MalformedToken)?;
        let user = self
            .store
            .read(|scope| scope.user(user_id))?
            .ok_or(AuthError::UnknownPrincipal)?;
        Ok(AuthenticatedUser::from_session(&user))
    }

    /// Verify a raw API key presented at `now`.
    pub fn verify_api_key(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedUser, AuthError> {
        let hash = hash_api_key(raw.trim());
        let (key, owner) = self
            .store
            .read(|scope| {
                let Some(key) = scope.api_key_by_hash(&hash)? else {
                    return Ok::<_, StoreError>(None);
                };
                let owner = scope.user(key.owner_id)?;
                Ok(Some((key, owner)))
            })?
            .ok_or(AuthError::InvalidApiKey)?;

        if !key.active {
            return Err(AuthError::RevokedApiKey);
        }
        if key.is_expired(now) {
            return Err(AuthError::ExpiredApiKey);
        }
        let owner = owner.ok_or(AuthError::UnknownPrincipal)?;
        Ok(AuthenticatedUser::from_api_key(&owner, key.id, key.scopes))
    }

    /// Dual-mode verification: bearer first, API key as fallback.
    pub fn verify(
        &self,
        bearer: Option<&str>,
        api_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedUser, AuthError> {
        match (bearer, api_key) {
            (None, None) => Err(AuthError::MissingCredentials),
            (Some(token), None) => self.verify_session(token),
            (None, Some(raw)) => self.verify_api_key(raw, now),
            (Some(token), Some(raw)) => match self.verify_session(token) {
                Ok(user) => Ok(user),
                Err(err) => {
                    tracing::debug!(reason = err.reason(), "Bearer rejected, trying API key");
                    self.verify_api_key(raw, now)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::api_key::ApiKeySecret;
    use crate::models::PermissionSet;
    use crate::storage::{StoredApiKey, StoredUser};
    use chrono::Duration;

    struct Fixture {
        verifier: CredentialVerifier,
        sessions: Arc<SessionSigner>,
        store: Arc<LedgerStore>,
        user: StoredUser,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LedgerStore::open(&dir.path().join("ledger.redb")).unwrap());
        let sessions = Arc::new(SessionSigner::new(
            b"verifier-test-secret-0123456789",
            Duration::minutes(30),
        ));
        let user = StoredUser::new("a@x.com".into(), Utc::now());
        store.write(|scope| scope.insert_user(&user)).unwrap();
        Fixture {
            verifier: CredentialVerifier::new(store.clone(), sessions.clone()),
            sessions,
            store,
            user,
            _dir: dir,
        }
    }

    fn store_key(fx: &Fixture, expires_at: Option<DateTime<Utc>>, active: bool) -> ApiKeySecret {
        let secret = ApiKeySecret::generate().unwrap();
        let key = StoredApiKey {
            id: Uuid::new_v4(),
            owner_id: fx.user.id,
            name: "svc".into(),
            secret_hash: secret.hash(),
            prefix: secret.display_prefix(),
            scopes: PermissionSet::parse(["read"]).unwrap(),
            expires_at,
            active,
            created_at: Utc::now(),
            revoked_at: None,
        };
        fx.store.write(|scope| scope.insert_api_key(&key)).unwrap();
        secret
    }

    #[test]
    fn session_token_resolves_user_without_scope() {
        let fx = fixture();
        let issued = fx.sessions.mint(fx.user.id, Utc::now()).unwrap();
        let principal = fx.verifier.verify(Some(&issued.token), None, Utc::now()).unwrap();
        assert_eq!(principal.user_id, fx.user.id);
        assert!(principal.scope().is_none());
    }

    #[test]
    fn session_for_deleted_user_is_rejected() {
        let fx = fixture();
        let issued = fx.sessions.mint(Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(
            fx.verifier.verify_session(&issued.token),
            Err(AuthError::UnknownPrincipal)
        );
    }

    #[test]
    fn api_key_resolves_owner_with_scope() {
        let fx = fixture();
        let secret = store_key(&fx, None, true);
        let principal = fx.verifier.verify(None, Some(secret.expose()), Utc::now()).unwrap();
        assert_eq!(principal.user_id, fx.user.id);
        assert_eq!(principal.scope(), Some(&PermissionSet::parse(["read"]).unwrap()));
    }

    #[test]
    fn unknown_revoked_and_expired_keys_are_rejected() {
        let fx = fixture();
        let now = Utc::now();
        assert_eq!(
            fx.verifier.verify_api_key("sk_live_nope", now),
            Err(AuthError::InvalidApiKey)
        );

        let revoked = store_key(&fx, None, false);
        assert_eq!(
            fx.verifier.verify_api_key(revoked.expose(), now),
            Err(AuthError::RevokedApiKey)
        );

        let expired = store_key(&fx, Some(now - Duration::hours(1)), true);
        assert_eq!(
            fx.verifier.verify_api_key(expired.expose(), now),
            Err(AuthError::ExpiredApiKey)
        );
    }

    #[test]
    fn invalid_bearer_falls_back_to_api_key() {
        let fx = fixture();
        let secret = store_key(&fx, None, true);
        let principal = fx
            .verifier
            .verify(Some("garbage"), Some(secret.expose()), Utc::now())
            .unwrap();
        assert!(!principal.is_session());
    }

    #[test]
    fn nothing_presented_is_missing_credentials() {
        let fx = fixture();
        assert_eq!(
            fx.verifier.verify(None, None, Utc::now()),
            Err(AuthError::MissingCredentials)
        );
    }
}
