// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Vocabulary
//!
//! Small value types shared by the ledger, key lifecycle and the REST API.
//! All of them derive `Serialize`, `Deserialize` and `ToSchema` so they can
//! flow straight into request and response bodies.
//!
//! - [`Permission`] / [`PermissionSet`]: API-key scopes
//! - [`WalletNumber`]: the public, 13-digit wallet identifier
//! - [`TransactionKind`], [`TransactionStatus`], [`Direction`]: ledger records

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;

// =============================================================================
// Permissions
// =============================================================================

/// A capability an API key may carry.
///
/// Session (JWT) principals are never scope-limited; only API-key principals
/// are checked against these.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Start gateway deposits into the owner's wallet
    Deposit,
    /// Move funds to another wallet
    Transfer,
    /// Read balance and history
    Read,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Permission::Deposit, Permission::Transfer, Permission::Read];

    /// Parse a permission name (case-insensitive, surrounding whitespace ignored).
    pub fn parse(s: &str) -> Option<Permission> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Some(Permission::Deposit),
            "transfer" => Some(Permission::Transfer),
            "read" => Some(Permission::Read),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Deposit => "deposit",
            Permission::Transfer => "transfer",
            Permission::Read => "read",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-empty, duplicate-free set of permissions attached to an API key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Vec<Permission>)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Build a set from user-supplied names.
    ///
    /// Duplicates collapse; an empty list or any unknown name is rejected.
    pub fn parse<I, S>(names: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        let mut unknown = Vec::new();
        for name in names {
            match Permission::parse(name.as_ref()) {
                Some(permission) => {
                    set.insert(permission);
                }
                None => unknown.push(name.as_ref().to_string()),
            }
        }

        if !unknown.is_empty() {
            return Err(ApiError::bad_request(format!(
                "Unknown permissions: {}. Allowed: deposit, transfer, read",
                unknown.join(", ")
            )));
        }
        if set.is_empty() {
            return Err(ApiError::bad_request("At least one permission is required"));
        }
        Ok(Self(set))
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// Permissions in `required` that this set does not grant, in canonical order.
    pub fn missing(&self, required: &[Permission]) -> Vec<Permission> {
        let required: BTreeSet<Permission> = required.iter().copied().collect();
        required.difference(&self.0).copied().collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Wallet Number
// =============================================================================

/// Public wallet identifier: a leading `4` followed by 12 digits.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletNumber(pub String);

impl WalletNumber {
    pub const LEN: usize = 13;

    /// Validate a caller-supplied wallet number (exactly 13 ASCII digits).
    pub fn parse(s: &str) -> Result<Self, ApiError> {
        let trimmed = s.trim();
        if trimmed.len() != Self::LEN || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ApiError::bad_request(
                "wallet_number must be exactly 13 digits",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Transactions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Transfer,
}

/// Lifecycle of a ledger transaction.
///
/// `Pending` may move to `Success` or `Failed`; both of those are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// Money movement relative to the wallet viewing the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Credit => "credit",
            Direction::Debit => "debit",
        }
    }

    pub fn from_str(s: &str) -> Option<Direction> {
        match s {
            "credit" => Some(Direction::Credit),
            "debit" => Some(Direction::Debit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_set_collapses_duplicates() {
        let set = PermissionSet::parse(["read", "READ", "deposit"]).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Permission::Deposit, Permission::Read]);
    }

    #[test]
    fn permission_set_rejects_empty_and_unknown() {
        let empty: [&str; 0] = [];
        assert!(matches!(PermissionSet::parse(empty), Err(ApiError::InvalidInput(_))));

        let err = PermissionSet::parse(["read", "withdraw"]).unwrap_err();
        assert!(err.to_string().contains("withdraw"));
    }

    #[test]
    fn missing_reports_only_ungranted() {
        let set = PermissionSet::parse(["read"]).unwrap();
        assert_eq!(
            set.missing(&[Permission::Transfer, Permission::Read]),
            vec![Permission::Transfer]
        );
        assert!(set.missing(&[Permission::Read]).is_empty());
    }

    #[test]
    fn permission_set_serializes_as_array() {
        let set = PermissionSet::parse(["transfer", "read"]).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["transfer","read"]"#);
        let back: PermissionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn wallet_number_requires_thirteen_digits() {
        assert!(WalletNumber::parse("4123456789012").is_ok());
        assert!(WalletNumber::parse("412345678901").is_err());
        assert!(WalletNumber::parse("41234567890ab").is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Success.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
    }
}
