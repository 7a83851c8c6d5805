// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission gate.
//!
//! Session principals pass every scope check. API-key principals pass only
//! when the key's scopes cover every required permission. Inactive accounts
//! may still read but never move money.

use super::{AuthError, AuthenticatedUser};
use crate::models::Permission;

/// Authorize `principal` for an operation needing `required`.
pub fn authorize(
    principal: AuthenticatedUser,
    required: &[Permission],
) -> Result<AuthenticatedUser, AuthError> {
    let mutating = required.iter().any(|p| *p != Permission::Read);
    if mutating && !principal.active {
        return Err(AuthError::AccountInactive);
    }
    let Some(scopes) = principal.scope() else {
        return Ok(principal);
    };
    let missing = scopes.missing(required);
    if missing.is_empty() {
        Ok(principal)
    } else {
        Err(AuthError::MissingPermissions(missing))
    }
}

/// Compile-time permission requirement for the [`Authorized`](super::Authorized) extractor.
pub trait Requirement: Send + Sync + 'static {
    const REQUIRED: &'static [Permission];
}

/// Balance and history reads.
pub struct ReadAccess;

impl Requirement for ReadAccess {
    const REQUIRED: &'static [Permission] = &[Permission::Read];
}

/// Deposit initiation.
pub struct DepositAccess;

impl Requirement for DepositAccess {
    const REQUIRED: &'static [Permission] = &[Permission::Deposit];
}

/// Wallet-to-wallet transfers.
pub struct TransferAccess;

impl Requirement for TransferAccess {
    const REQUIRED: &'static [Permission] = &[Permission::Transfer];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PermissionSet;
    use crate::storage::StoredUser;
    use chrono::Utc;
    use uuid::Uuid;

    fn key_principal(scopes: &[&str]) -> AuthenticatedUser {
        let user = StoredUser::new("a@x.com".into(), Utc::now());
        AuthenticatedUser::from_api_key(
            &user,
            Uuid::new_v4(),
            PermissionSet::parse(scopes).unwrap(),
        )
    }

    #[test]
    fn session_always_passes() {
        let user = StoredUser::new("a@x.com".into(), Utc::now());
        let principal = AuthenticatedUser::from_session(&user);
        for permission in Permission::ALL {
            assert!(authorize(principal.clone(), &[permission]).is_ok());
        }
    }

    #[test]
    fn read_key_cannot_transfer_or_deposit() {
        let principal = key_principal(&["read"]);
        assert!(authorize(principal.clone(), ReadAccess::REQUIRED).is_ok());
        assert_eq!(
            authorize(principal.clone(), TransferAccess::REQUIRED),
            Err(AuthError::MissingPermissions(vec![Permission::Transfer]))
        );
        assert_eq!(
            authorize(principal, DepositAccess::REQUIRED),
            Err(AuthError::MissingPermissions(vec![Permission::Deposit]))
        );
    }

    #[test]
    fn names_every_missing_permission() {
        let principal = key_principal(&["read"]);
        let err = authorize(
            principal,
            &[Permission::Deposit, Permission::Transfer, Permission::Read],
        )
        .unwrap_err();
        assert_eq!(
            err,
            AuthError::MissingPermissions(vec![Permission::Deposit, Permission::Transfer])
        );
    }

    #[test]
    fn inactive_accounts_can_only_read() {
        let mut user = StoredUser::new("a@x.com".into(), Utc::now());
        user.active = false;
        let principal = AuthenticatedUser::from_session(&user);
        assert!(authorize(principal.clone(), ReadAccess::REQUIRED).is_ok());
        assert_eq!(
            authorize(principal, TransferAccess::REQUIRED),
            Err(AuthError::AccountInactive)
        );
    }
}
