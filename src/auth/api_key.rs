// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Raw API key secrets.
//!
//! Format: `sk_live_` followed by 64 lowercase hex characters (256 bits).
//! The service stores only the SHA-256 of the full string plus its first 16
//! characters for display.

use crate::error::ApiError;
use crate::secrets::{random_hex, sha256_hex};

pub const API_KEY_PREFIX: &str = "sk_live_";

/// Length of the display prefix kept alongside the hash.
const DISPLAY_PREFIX_LEN: usize = 16;

/// Header carrying an API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// A raw secret. Shown to its owner exactly once.
pub struct ApiKeySecret(String);

impl ApiKeySecret {
    pub fn generate() -> Result<Self, ApiError> {
        Ok(Self(format!("{API_KEY_PREFIX}{}", random_hex(32)?)))
    }

    pub fn hash(&self) -> String {
        hash_api_key(&self.0)
    }

    pub fn display_prefix(&self) -> String {
        self.0.chars().take(DISPLAY_PREFIX_LEN).collect()
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for ApiKeySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKeySecret({}…)", self.display_prefix())
    }
}

/// Lookup hash for a presented secret.
pub fn hash_api_key(raw: &str) -> String {
    sha256_hex(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_has_expected_shape() {
        let secret = ApiKeySecret::generate().unwrap();
        let raw = secret.expose();
        assert!(raw.starts_with(API_KEY_PREFIX));
        assert_eq!(raw.len(), API_KEY_PREFIX.len() + 64);
        assert_eq!(secret.display_prefix(), &raw[..16]);
    }

    #[test]
    fn hash_is_stable_and_secret_free() {
        let secret = ApiKeySecret::generate().unwrap();
        assert_eq!(secret.hash(), hash_api_key(secret.expose()));
        assert_eq!(secret.hash().len(), 64);
        assert!(!secret.hash().contains(secret.expose()));
    }

    #[test]
    fn debug_redacts() {
        let secret = ApiKeySecret::generate().unwrap();
        let debug = format!("{secret:?}");
        assert!(!debug.contains(secret.expose()));
    }
}
