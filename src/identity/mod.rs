// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Resolution
//!
//! Maps an identity-provider assertion to a local user. First sight of an
//! identity provisions the user and exactly one wallet in the same write
//! transaction; later logins refresh profile fields.

pub mod oauth_state;
pub mod provider;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use unicode_normalization::UnicodeNormalization;

use crate::error::ApiError;
use crate::secrets::random_digits;
use crate::storage::{
    LedgerStore, StoredUser, StoredWallet, UserRepository, WalletRepository, WriteScope,
};

pub use oauth_state::OAuthStateStore;
pub use provider::{ExternalIdentity, GoogleProvider, IdentityProvider, ProviderError};

/// Leading digit of every wallet number.
pub const WALLET_NUMBER_PREFIX: char = '4';

/// Attempts at drawing an unused wallet number before giving up.
pub const WALLET_NUMBER_ATTEMPTS: usize = 8;

/// NFKC, trimmed, lowercase.
pub fn normalize_email(email: &str) -> String {
    email.nfkc().collect::<String>().trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub user: StoredUser,
    pub wallet: StoredWallet,
    /// `true` when this call provisioned the user
    pub created: bool,
}

pub struct IdentityResolver {
    store: Arc<LedgerStore>,
}

/// Draw a wallet number not yet present in the index.
///
/// Runs inside the write transaction that inserts the wallet, so a number
/// seen as free here cannot be claimed concurrently.
fn fresh_wallet_number(scope: &WriteScope<'_>) -> Result<String, ApiError> {
    for _ in 0..WALLET_NUMBER_ATTEMPTS {
        let candidate = format!("{WALLET_NUMBER_PREFIX}{}", random_digits(12)?);
        if !scope.wallet_number_taken(&candidate)? {
            return Ok(candidate);
        }
    }
    tracing::error!(
        attempts = WALLET_NUMBER_ATTEMPTS,
        "Could not allocate a unique wallet number"
    );
    Err(ApiError::internal("Could not allocate a wallet number"))
}

fn provision_wallet(
    scope: &mut WriteScope<'_>,
    user: &StoredUser,
    now: DateTime<Utc>,
) -> Result<StoredWallet, ApiError> {
    let wallet = StoredWallet::new(user.id, fresh_wallet_number(scope)?, now);
    scope.insert_wallet(&wallet)?;
    Ok(wallet)
}

impl IdentityResolver {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Find or create the user behind `identity`.
    pub fn resolve(
        &self,
        identity: &ExternalIdentity,
        now: DateTime<Utc>,
    ) -> Result<ResolvedIdentity, ApiError> {
        let email = identity
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ApiError::bad_request("Email not provided by identity provider"))?;
        let subject = Some(identity.subject.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let resolved = self.store.write(|scope| {
            let existing = match subject.as_deref() {
                Some(subject) => scope.user_by_external_id(subject)?,
                None => None,
            };
            let existing = match existing {
                Some(user) => Some(user),
                None => scope.user_by_email(&email)?,
            };

            match existing {
                Some(mut user) => {
                    if subject.is_some() {
                        user.external_id = subject.clone();
                    }
                    user.name = identity.name.clone();
                    user.picture_url = identity.picture_url.clone();
                    user.updated_at = now;
                    scope.update_user(&user)?;

                    let wallet = match scope.wallet_for_owner(user.id)? {
                        Some(wallet) => wallet,
                        None => provision_wallet(scope, &user, now)?,
                    };
                    Ok::<_, ApiError>(ResolvedIdentity {
                        user,
                        wallet,
                        created: false,
                    })
                }
                None => {
                    let mut user = StoredUser::new(email.clone(), now);
                    user.external_id = subject.clone();
                    user.name = identity.name.clone();
                    user.picture_url = identity.picture_url.clone();
                    scope.insert_user(&user)?;
                    let wallet = provision_wallet(scope, &user, now)?;
                    Ok(ResolvedIdentity {
                        user,
                        wallet,
                        created: true,
                    })
                }
            }
        })?;

        if resolved.created {
            tracing::info!(
                user_id = %resolved.user.id,
                wallet_number = %resolved.wallet.wallet_number,
                "Provisioned new user and wallet"
            );
        } else {
            tracing::debug!(user_id = %resolved.user.id, "Refreshed existing user");
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> (IdentityResolver, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LedgerStore::open(&dir.path().join("ledger.redb")).unwrap());
        (IdentityResolver::new(store), dir)
    }

    fn identity(subject: &str, email: &str) -> ExternalIdentity {
        ExternalIdentity {
            subject: subject.into(),
            email: Some(email.into()),
            name: Some("Ada".into()),
            picture_url: None,
        }
    }

    #[test]
    fn normalizes_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
        assert_eq!(normalize_email("ａｄａ@x.com"), "ada@x.com");
    }

    #[test]
    fn first_login_provisions_one_wallet() {
        let (resolver, _dir) = resolver();
        let resolved = resolver.resolve(&identity("g-1", "a@x.com"), Utc::now()).unwrap();

        assert!(resolved.created);
        assert_eq!(resolved.user.email, "a@x.com");
        assert_eq!(resolved.wallet.owner_id, resolved.user.id);
        assert_eq!(resolved.wallet.balance(), 0);
        assert_eq!(resolved.wallet.wallet_number.len(), 13);
        assert!(resolved.wallet.wallet_number.starts_with('4'));
        assert!(resolved.wallet.wallet_number.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn repeat_login_reuses_user_and_wallet() {
        let (resolver, _dir) = resolver();
        let first = resolver.resolve(&identity("g-1", "a@x.com"), Utc::now()).unwrap();

        let mut again = identity("g-1", "A@X.com");
        again.name = Some("Ada L.".into());
        let second = resolver.resolve(&again, Utc::now()).unwrap();

        assert!(!second.created);
        assert_eq!(second.user.id, first.user.id);
        assert_eq!(second.wallet.wallet_number, first.wallet.wallet_number);
        assert_eq!(second.user.name.as_deref(), Some("Ada L."));
    }

    #[test]
    fn email_match_links_external_identity() {
        let (resolver, _dir) = resolver();
        let no_subject = identity("", "a@x.com");
        let first = resolver.resolve(&no_subject, Utc::now()).unwrap();
        assert_eq!(first.user.external_id, None);

        let linked = resolver.resolve(&identity("g-9", "a@x.com"), Utc::now()).unwrap();
        assert_eq!(linked.user.id, first.user.id);
        assert_eq!(linked.user.external_id.as_deref(), Some("g-9"));
    }

    #[test]
    fn missing_email_is_invalid_input() {
        let (resolver, _dir) = resolver();
        let mut anonymous = identity("g-1", "");
        assert!(matches!(
            resolver.resolve(&anonymous, Utc::now()),
            Err(ApiError::InvalidInput(_))
        ));
        anonymous.email = None;
        assert!(matches!(
            resolver.resolve(&anonymous, Utc::now()),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn distinct_users_get_distinct_wallet_numbers() {
        let (resolver, _dir) = resolver();
        let a = resolver.resolve(&identity("g-1", "a@x.com"), Utc::now()).unwrap();
        let b = resolver.resolve(&identity("g-2", "b@x.com"), Utc::now()).unwrap();
        assert_ne!(a.user.id, b.user.id);
        assert_ne!(a.wallet.wallet_number, b.wallet.wallet_number);
    }
}
