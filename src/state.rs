// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{CredentialVerifier, SessionSigner};
use crate::identity::{IdentityProvider, IdentityResolver, OAuthStateStore};
use crate::keys::KeyManager;
use crate::ledger::Ledger;
use crate::payments::{PaymentGateway, Reconciler, WebhookVerifier};
use crate::storage::LedgerStore;

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LedgerStore>,
    pub ledger: Arc<Ledger>,
    pub keys: Arc<KeyManager>,
    pub identity: Arc<IdentityResolver>,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub oauth_states: Arc<OAuthStateStore>,
    pub sessions: Arc<SessionSigner>,
    pub verifier: Arc<CredentialVerifier>,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    /// Wire the services over one ledger store.
    pub fn new(
        store: Arc<LedgerStore>,
        sessions: SessionSigner,
        identity_provider: Arc<dyn IdentityProvider>,
        gateway: Arc<dyn PaymentGateway>,
        webhooks: WebhookVerifier,
    ) -> Self {
        let sessions = Arc::new(sessions);
        let ledger = Arc::new(Ledger::new(store.clone()));
        Self {
            keys: Arc::new(KeyManager::new(store.clone())),
            identity: Arc::new(IdentityResolver::new(store.clone())),
            identity_provider,
            oauth_states: Arc::new(OAuthStateStore::new()),
            verifier: Arc::new(CredentialVerifier::new(store.clone(), sessions.clone())),
            reconciler: Arc::new(Reconciler::new(ledger.clone(), gateway, webhooks)),
            sessions,
            ledger,
            store,
        }
    }
}
