// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process fixtures: a temp ledger plus fake upstreams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::SessionSigner;
use crate::identity::{ExternalIdentity, IdentityProvider, ProviderError};
use crate::payments::gateway::{
    GatewayError, InitializeRequest, InitializedCharge, PaymentGateway, VerifiedCharge,
};
use crate::payments::WebhookVerifier;
use crate::state::AppState;
use crate::storage::{LedgerStore, StoredUser};

pub const TEST_JWT_SECRET: &[u8] = b"test-only-session-secret-0123456789";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

#[derive(Default)]
pub struct FakeGateway {
    fail_initialize: AtomicBool,
    verify: Mutex<Option<VerifiedCharge>>,
    initialized: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    /// `None` makes `verify` fail as if the gateway were down.
    pub fn set_verify(&self, result: Option<VerifiedCharge>) {
        *self.verify.lock().unwrap() = result;
    }

    /// References passed to `initialize`, in call order.
    pub fn initialized(&self) -> Vec<String> {
        self.initialized.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initialize(
        &self,
        request: InitializeRequest<'_>,
    ) -> Result<InitializedCharge, GatewayError> {
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(GatewayError::Request("connection refused".into()));
        }
        self.initialized
            .lock()
            .unwrap()
            .push(request.reference.to_string());
        Ok(InitializedCharge {
            authorization_url: format!("https://checkout.test/{}", request.reference),
        })
    }

    async fn verify(&self, _reference: &str) -> Result<VerifiedCharge, GatewayError> {
        self.verify
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| GatewayError::Request("timed out".into()))
    }
}

#[derive(Default)]
pub struct FakeIdentityProvider {
    codes: Mutex<HashMap<String, ExternalIdentity>>,
}

impl FakeIdentityProvider {
    pub fn register(&self, code: &str, identity: ExternalIdentity) {
        self.codes.lock().unwrap().insert(code.to_string(), identity);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn authorization_url(&self, state: &str) -> Result<String, ProviderError> {
        Ok(format!("https://idp.test/authorize?state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, ProviderError> {
        self.codes
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(|| ProviderError::Rejected("unknown code".into()))
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub identity: Arc<FakeIdentityProvider>,
    webhooks: WebhookVerifier,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LedgerStore::open(&dir.path().join("ledger.redb")).unwrap());
        let gateway = Arc::new(FakeGateway::default());
        let identity = Arc::new(FakeIdentityProvider::default());
        let webhooks = WebhookVerifier::new(Some(TEST_WEBHOOK_SECRET.to_string()));

        let state = AppState::new(
            store,
            SessionSigner::new(TEST_JWT_SECRET, Duration::minutes(30)),
            identity.clone(),
            gateway.clone(),
            webhooks.clone(),
        );
        Self {
            state,
            gateway,
            identity,
            webhooks,
            _dir: dir,
        }
    }

    pub fn router(&self) -> Router {
        crate::api::router(self.state.clone())
    }

    /// Provision `email` (user + wallet) and mint a session token for it.
    pub fn user_with_session(&self, email: &str) -> (StoredUser, String) {
        let resolved = self
            .state
            .identity
            .resolve(
                &ExternalIdentity {
                    subject: format!("sub-{email}"),
                    email: Some(email.to_string()),
                    name: None,
                    picture_url: None,
                },
                Utc::now(),
            )
            .unwrap();
        let session = self.state.sessions.mint(resolved.user.id, Utc::now()).unwrap();
        (resolved.user, session.token)
    }

    /// Issue a non-expiring key with `permissions` and return the raw secret.
    pub fn api_key_for(&self, user_id: Uuid, permissions: &[&str]) -> String {
        let permissions: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
        self.state
            .keys
            .create(user_id, "test key", &permissions, None, Utc::now())
            .unwrap()
            .secret
            .into_inner()
    }

    /// Credit `amount` to the wallet of `user_id` through a confirmed deposit.
    pub fn fund(&self, user_id: Uuid, amount: u64) {
        let wallet = self.state.ledger.wallet_for_owner(user_id).unwrap();
        let reference = crate::ledger::new_reference().unwrap();
        self.state
            .ledger
            .open_deposit(user_id, wallet.id, reference.clone(), amount, Utc::now())
            .unwrap();
        self.state
            .ledger
            .confirm_deposit(&reference, None, Utc::now())
            .unwrap();
    }

    pub fn sign_webhook(&self, body: &[u8]) -> String {
        self.webhooks.sign(body).unwrap()
    }
}
