// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Key Lifecycle
//!
//! Issue, list, revoke and roll over API keys.
//!
//! ## Rules
//!
//! - At most [`MAX_ACTIVE_KEYS`] keys flagged active per owner, checked inside
//!   the same write transaction that inserts the new key
//! - Scopes, name and expiry are validated before any state change
//! - Revocation is permanent
//! - Only keys past their expiry can be rolled over; the replacement keeps
//!   the scopes and is named `"<old name> (Renewed)"`

pub mod expiry;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::api_key::ApiKeySecret;
use crate::error::ApiError;
use crate::models::PermissionSet;
use crate::storage::{ApiKeyRepository, LedgerStore, StoredApiKey, UserRepository, WriteScope};

pub use expiry::{resolve_expiry, ExpirySpec, ExpiryUnit};

pub const MAX_ACTIVE_KEYS: usize = 5;
pub const MAX_NAME_LEN: usize = 100;

/// A newly issued key. `secret` is the only copy of the raw value.
#[derive(Debug)]
pub struct IssuedKey {
    pub secret: ApiKeySecret,
    pub key: StoredApiKey,
}

pub struct KeyManager {
    store: Arc<LedgerStore>,
}

fn validate_name(name: &str) -> Result<String, ApiError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Key name must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Owner must exist, be active, and have room for one more key.
fn ensure_can_issue(scope: &WriteScope<'_>, owner_id: Uuid) -> Result<(), ApiError> {
    let owner = scope
        .user(owner_id)?
        .ok_or_else(|| ApiError::unauthenticated("User not found"))?;
    if !owner.active {
        return Err(ApiError::forbidden("Account is inactive"));
    }
    let active = scope.active_key_count(owner_id)?;
    if active >= MAX_ACTIVE_KEYS {
        return Err(ApiError::quota_exceeded(format!(
            "Maximum of {MAX_ACTIVE_KEYS} active API keys reached; revoke one first"
        )));
    }
    Ok(())
}

/// Generate a secret and insert its record.
fn issue(
    scope: &mut WriteScope<'_>,
    owner_id: Uuid,
    name: String,
    scopes: PermissionSet,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<IssuedKey, ApiError> {
    let secret = ApiKeySecret::generate()?;
    let key = StoredApiKey {
        id: Uuid::new_v4(),
        owner_id,
        name,
        secret_hash: secret.hash(),
        prefix: secret.display_prefix(),
        scopes,
        expires_at,
        active: true,
        created_at: now,
        revoked_at: None,
    };
    scope.insert_api_key(&key)?;
    Ok(IssuedKey { secret, key })
}

/// Look up a key, hiding keys owned by someone else.
fn owned_key(
    scope: &WriteScope<'_>,
    owner_id: Uuid,
    key_id: Uuid,
) -> Result<StoredApiKey, ApiError> {
    scope
        .api_key(key_id)?
        .filter(|key| key.owner_id == owner_id)
        .ok_or_else(|| ApiError::not_found("API key not found"))
}

impl KeyManager {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Issue a new key for `owner_id`.
    pub fn create(
        &self,
        owner_id: Uuid,
        name: &str,
        permissions: &[String],
        expiry: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IssuedKey, ApiError> {
        let name = validate_name(name)?;
        let scopes = PermissionSet::parse(permissions)?;
        let expires_at = resolve_expiry(expiry, now)?;

        let issued = self.store.write(|scope| {
            ensure_can_issue(scope, owner_id)?;
            issue(scope, owner_id, name, scopes, expires_at, now)
        })?;

        tracing::info!(
            user_id = %owner_id,
            key_id = %issued.key.id,
            prefix = %issued.key.prefix,
            "API key issued"
        );
        Ok(issued)
    }

    /// Replace an expired key with a fresh one carrying the same scopes.
    pub fn rollover(
        &self,
        owner_id: Uuid,
        expired_key_id: Uuid,
        expiry: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IssuedKey, ApiError> {
        let expires_at = resolve_expiry(expiry, now)?;

        let issued = self.store.write(|scope| {
            let old = owned_key(scope, owner_id, expired_key_id)?;
            match old.expires_at {
                None => return Err(ApiError::conflict("Key never expires; revoke it instead")),
                Some(at) if at > now => {
                    return Err(ApiError::conflict("Key has not expired yet"));
                }
                Some(_) => {}
            }
            if old.scopes.is_empty() {
                return Err(ApiError::bad_request("Expired key carries no permissions"));
            }
            ensure_can_issue(scope, owner_id)?;
            let name = format!("{} (Renewed)", old.name);
            issue(scope, owner_id, name, old.scopes, expires_at, now)
        })?;

        tracing::info!(
            user_id = %owner_id,
            old_key_id = %expired_key_id,
            key_id = %issued.key.id,
            "API key rolled over"
        );
        Ok(issued)
    }

    /// Permanently deactivate a key.
    pub fn revoke(
        &self,
        owner_id: Uuid,
        key_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<StoredApiKey, ApiError> {
        let key = self.store.write(|scope| {
            let mut key = owned_key(scope, owner_id, key_id)?;
            if !key.active {
                return Err(ApiError::conflict("API key is already revoked"));
            }
            key.active = false;
            key.revoked_at = Some(now);
            scope.save_api_key(&key)?;
            Ok(key)
        })?;

        tracing::info!(user_id = %owner_id, key_id = %key_id, "API key revoked");
        Ok(key)
    }

    /// Every key of `owner_id`, newest first.
    pub fn list(&self, owner_id: Uuid) -> Result<Vec<StoredApiKey>, ApiError> {
        Ok(self.store.read(|scope| scope.api_keys_for_owner(owner_id))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Permission;
    use crate::storage::StoredUser;
    use chrono::Duration;

    fn setup() -> (KeyManager, Arc<LedgerStore>, StoredUser, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LedgerStore::open(&dir.path().join("ledger.redb")).unwrap());
        let user = StoredUser::new("a@x.com".into(), Utc::now());
        store.write(|scope| scope.insert_user(&user)).unwrap();
        (KeyManager::new(store.clone()), store, user, dir)
    }

    fn perms(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn create_returns_secret_once_and_stores_hash() {
        let (keys, _store, user, _dir) = setup();
        let now = Utc::now();
        let issued = keys
            .create(user.id, "ci", &perms(&["read", "read", "deposit"]), Some("2H"), now)
            .unwrap();

        assert_eq!(issued.key.secret_hash, issued.secret.hash());
        assert_eq!(issued.key.expires_at, Some(now + Duration::hours(2)));
        assert_eq!(
            issued.key.scopes.iter().collect::<Vec<_>>(),
            vec![Permission::Deposit, Permission::Read]
        );

        let listed = keys.list(user.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].prefix, issued.secret.display_prefix());
    }

    #[test]
    fn quota_blocks_sixth_key_until_revoke() {
        let (keys, _store, user, _dir) = setup();
        let now = Utc::now();
        let mut ids = Vec::new();
        for i in 0..MAX_ACTIVE_KEYS {
            let issued = keys
                .create(user.id, &format!("k{i}"), &perms(&["read"]), None, now)
                .unwrap();
            ids.push(issued.key.id);
        }

        let err = keys.create(user.id, "k6", &perms(&["read"]), None, now).unwrap_err();
        assert!(matches!(err, ApiError::QuotaExceeded(_)));

        keys.revoke(user.id, ids[0], now).unwrap();
        assert!(keys.create(user.id, "k6", &perms(&["read"]), None, now).is_ok());
    }

    #[test]
    fn invalid_input_changes_nothing() {
        let (keys, _store, user, _dir) = setup();
        let now = Utc::now();
        assert!(matches!(
            keys.create(user.id, "k", &perms(&[]), None, now),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            keys.create(user.id, "k", &perms(&["admin"]), None, now),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            keys.create(user.id, "", &perms(&["read"]), None, now),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            keys.create(user.id, &"x".repeat(101), &perms(&["read"]), None, now),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            keys.create(user.id, "k", &perms(&["read"]), Some("-1H"), now),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(keys.list(user.id).unwrap().is_empty());
    }

    #[test]
    fn inactive_owner_is_forbidden() {
        let (keys, store, mut user, _dir) = setup();
        user.active = false;
        store.write(|scope| scope.update_user(&user)).unwrap();

        let err = keys.create(user.id, "k", &perms(&["read"]), None, Utc::now()).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn rollover_requires_expired_key() {
        let (keys, _store, user, _dir) = setup();
        let now = Utc::now();
        let never = keys.create(user.id, "never", &perms(&["read"]), None, now).unwrap();
        let future = keys.create(user.id, "soon", &perms(&["transfer"]), Some("1H"), now).unwrap();

        assert!(matches!(
            keys.rollover(user.id, never.key.id, Some("1D"), now),
            Err(ApiError::InvalidState(_))
        ));
        assert!(matches!(
            keys.rollover(user.id, future.key.id, Some("1D"), now),
            Err(ApiError::InvalidState(_))
        ));

        let later = now + Duration::hours(2);
        let renewed = keys.rollover(user.id, future.key.id, Some("1D"), later).unwrap();
        assert_eq!(renewed.key.name, "soon (Renewed)");
        assert_eq!(renewed.key.scopes, future.key.scopes);
        assert_eq!(renewed.key.expires_at, Some(later + Duration::days(1)));
        assert_ne!(renewed.secret.expose(), future.secret.expose());
    }

    #[test]
    fn rollover_respects_active_key_quota() {
        let (keys, _store, user, _dir) = setup();
        let now = Utc::now();
        let expiring = keys
            .create(user.id, "expiring", &perms(&["read"]), Some("1H"), now)
            .unwrap();
        let mut others = Vec::new();
        for i in 1..MAX_ACTIVE_KEYS {
            let issued = keys
                .create(user.id, &format!("k{i}"), &perms(&["read"]), None, now)
                .unwrap();
            others.push(issued.key.id);
        }

        let later = now + Duration::hours(2);
        assert!(matches!(
            keys.rollover(user.id, expiring.key.id, Some("1D"), later),
            Err(ApiError::QuotaExceeded(_))
        ));

        keys.revoke(user.id, others[0], later).unwrap();
        let renewed = keys
            .rollover(user.id, expiring.key.id, Some("1D"), later)
            .unwrap();
        assert_eq!(renewed.key.name, "expiring (Renewed)");
    }

    #[test]
    fn foreign_keys_are_not_found() {
        let (keys, store, user, _dir) = setup();
        let other = StoredUser::new("b@x.com".into(), Utc::now());
        store.write(|scope| scope.insert_user(&other)).unwrap();
        let now = Utc::now();
        let key = keys.create(user.id, "mine", &perms(&["read"]), Some("1H"), now).unwrap();

        assert!(matches!(keys.revoke(other.id, key.key.id, now), Err(ApiError::NotFound(_))));
        assert!(matches!(
            keys.rollover(other.id, key.key.id, None, now + Duration::hours(2)),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn revoke_twice_is_invalid_state() {
        let (keys, _store, user, _dir) = setup();
        let now = Utc::now();
        let key = keys.create(user.id, "k", &perms(&["read"]), None, now).unwrap();
        let revoked = keys.revoke(user.id, key.key.id, now).unwrap();
        assert!(!revoked.active);
        assert!(matches!(
            keys.revoke(user.id, key.key.id, now),
            Err(ApiError::InvalidState(_))
        ));
    }
}
