// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API key records.
//!
//! Only the SHA-256 hash of a secret is stored; the raw secret leaves the
//! service exactly once, in the creation response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PermissionSet;
use crate::storage::database::{
    claim_unique, get_index, get_json, make_index_key, make_prefix, put_json, scan_prefix,
    trailing_id, LedgerView, StoreError, StoreResult, WriteScope,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredApiKey {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Hex SHA-256 of the raw secret
    pub secret_hash: String,
    /// First 16 characters of the raw secret, for display
    pub prefix: String,
    pub scopes: PermissionSet,
    /// `None` means the key never expires
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl StoredApiKey {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Active and not past its expiry.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now)
    }
}

pub trait ApiKeyRepository: LedgerView {
    fn api_key(&self, id: Uuid) -> StoreResult<Option<StoredApiKey>> {
        get_json(self.api_keys(), &id.to_string())
    }

    fn api_key_by_hash(&self, secret_hash: &str) -> StoreResult<Option<StoredApiKey>> {
        match get_index(self.api_key_hash_index(), secret_hash)? {
            Some(id) => get_json(self.api_keys(), &id),
            None => Ok(None),
        }
    }

    /// Every key of `owner_id`, newest first.
    fn api_keys_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<StoredApiKey>> {
        let prefix = make_prefix(&owner_id.to_string());
        let mut keys = Vec::new();
        for (index_key, _) in scan_prefix(self.api_key_owner_index(), &prefix)? {
            let id = trailing_id(&index_key, prefix.len())
                .ok_or_else(|| StoreError::CorruptIndex("api_key_owner_index".into()))?;
            let key = get_json(self.api_keys(), id)?
                .ok_or_else(|| StoreError::CorruptIndex(format!("api key {id}")))?;
            keys.push(key);
        }
        Ok(keys)
    }

    /// Keys still flagged active, whether or not they have expired.
    fn active_key_count(&self, owner_id: Uuid) -> StoreResult<usize> {
        Ok(self
            .api_keys_for_owner(owner_id)?
            .iter()
            .filter(|key| key.active)
            .count())
    }
}

impl<S: LedgerView + ?Sized> ApiKeyRepository for S {}

impl WriteScope<'_> {
    pub fn insert_api_key(&mut self, key: &StoredApiKey) -> StoreResult<()> {
        let id = key.id.to_string();
        claim_unique(&mut self.api_key_hash_index, &key.secret_hash, &id)?;
        let index_key = make_index_key(
            &key.owner_id.to_string(),
            key.created_at.timestamp_micros(),
            &id,
        );
        self.api_key_owner_index
            .insert(index_key.as_slice(), id.as_str())?;
        put_json(&mut self.api_keys, &id, key)
    }

    /// Persist a state change (revocation) on an existing key.
    pub fn save_api_key(&mut self, key: &StoredApiKey) -> StoreResult<()> {
        let id = key.id.to_string();
        if self.api_key(key.id)?.is_none() {
            return Err(StoreError::NotFound(format!("API key {id}")));
        }
        put_json(&mut self.api_keys, &id, key)
    }
}
