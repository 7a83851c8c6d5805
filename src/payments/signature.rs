// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Webhook signature verification.
//!
//! The gateway signs each webhook body with HMAC-SHA512 keyed by the shared
//! secret and sends the hex digest in `x-paystack-signature`.

use hmac::{Hmac, Mac};
use sha2::Sha512;

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

type HmacSha512 = Hmac<Sha512>;

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<Vec<u8>>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("configured", &self.secret.is_some())
            .finish()
    }
}

impl WebhookVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret
                .filter(|s| !s.is_empty())
                .map(String::into_bytes),
        }
    }

    /// `true` only for a configured secret and a hex digest matching `body`.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> bool {
        let Some(secret) = self.secret.as_deref() else {
            return false;
        };
        let Some(signature) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
            return false;
        };
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha512::new_from_slice(secret) else {
            return false;
        };
        mac.update(body);
        // constant-time comparison
        mac.verify_slice(&expected).is_ok()
    }

    /// Hex signature of `body`, as the gateway would compute it.
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        let mut mac = HmacSha512::new_from_slice(self.secret.as_deref()?).ok()?;
        mac.update(body);
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}
