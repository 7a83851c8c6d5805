// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User records and their unique email / external-identity indexes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::database::{
    claim_unique, get_index, get_json, put_json, IndexTable, LedgerView, StoreError, StoreResult,
    WriteScope,
};

/// Persisted user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: Uuid,
    /// Normalized (NFKC, lowercase, trimmed) email
    pub email: String,
    /// Subject assigned by the identity provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredUser {
    pub fn new(email: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            external_id: None,
            name: None,
            picture_url: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lookups available on any ledger scope.
pub trait UserRepository: LedgerView {
    fn user(&self, id: Uuid) -> StoreResult<Option<StoredUser>> {
        get_json(self.users(), &id.to_string())
    }

    fn user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        match get_index(self.user_email_index(), email)? {
            Some(id) => get_json(self.users(), &id),
            None => Ok(None),
        }
    }

    fn user_by_external_id(&self, external_id: &str) -> StoreResult<Option<StoredUser>> {
        match get_index(self.user_external_index(), external_id)? {
            Some(id) => get_json(self.users(), &id),
            None => Ok(None),
        }
    }
}

impl<S: LedgerView + ?Sized> UserRepository for S {}

/// Move a unique index entry from `old` to `new` for the same record.
fn reindex(
    table: &mut IndexTable<'_>,
    old: Option<&str>,
    new: Option<&str>,
    id: &str,
) -> StoreResult<()> {
    if old == new {
        return Ok(());
    }
    if let Some(new) = new {
        claim_unique(table, new, id)?;
    }
    if let Some(old) = old {
        table.remove(old)?;
    }
    Ok(())
}

impl WriteScope<'_> {
    /// Insert a new user, failing with `Conflict` on a taken email or external id.
    pub fn insert_user(&mut self, user: &StoredUser) -> StoreResult<()> {
        let id = user.id.to_string();
        if self.user(user.id)?.is_some() {
            return Err(StoreError::Conflict(format!("user {id}")));
        }
        claim_unique(&mut self.user_email_index, &user.email, &id)?;
        if let Some(external_id) = &user.external_id {
            claim_unique(&mut self.user_external_index, external_id, &id)?;
        }
        put_json(&mut self.users, &id, user)
    }

    /// Overwrite an existing user, keeping both unique indexes in step.
    pub fn update_user(&mut self, user: &StoredUser) -> StoreResult<()> {
        let id = user.id.to_string();
        let previous = self
            .user(user.id)?
            .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;

        reindex(
            &mut self.user_email_index,
            Some(previous.email.as_str()),
            Some(user.email.as_str()),
            &id,
        )?;
        reindex(
            &mut self.user_external_index,
            previous.external_id.as_deref(),
            user.external_id.as_deref(),
            &id,
        )?;
        put_json(&mut self.users, &id, user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LedgerStore;

    fn temp_store() -> (LedgerStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(&dir.path().join("ledger.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn insert_and_lookup_by_every_key() {
        let (store, _dir) = temp_store();
        let mut user = StoredUser::new("a@x.com".into(), Utc::now());
        user.external_id = Some("google-1".into());

        store.write(|scope| scope.insert_user(&user)).unwrap();

        store
            .read(|scope| {
                assert_eq!(scope.user(user.id)?.unwrap().email, "a@x.com");
                assert_eq!(scope.user_by_email("a@x.com")?.unwrap().id, user.id);
                assert_eq!(scope.user_by_external_id("google-1")?.unwrap().id, user.id);
                assert!(scope.user_by_email("b@x.com")?.is_none());
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    #[test]
    fn duplicate_email_conflicts() {
        let (store, _dir) = temp_store();
        let first = StoredUser::new("a@x.com".into(), Utc::now());
        let second = StoredUser::new("a@x.com".into(), Utc::now());

        store.write(|scope| scope.insert_user(&first)).unwrap();
        let err = store.write(|scope| scope.insert_user(&second)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn update_moves_external_id_index() {
        let (store, _dir) = temp_store();
        let mut user = StoredUser::new("a@x.com".into(), Utc::now());
        user.external_id = Some("old-sub".into());
        store.write(|scope| scope.insert_user(&user)).unwrap();

        user.external_id = Some("new-sub".into());
        user.name = Some("Ada".into());
        store.write(|scope| scope.update_user(&user)).unwrap();

        store
            .read(|scope| {
                assert!(scope.user_by_external_id("old-sub")?.is_none());
                let found = scope.user_by_external_id("new-sub")?.unwrap();
                assert_eq!(found.name.as_deref(), Some("Ada"));
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }
}
