// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use relational_ledger::{
    api::router,
    auth::SessionSigner,
    config::{ConfigError, ServiceConfig},
    identity::{GoogleProvider, ProviderError},
    payments::{GatewayError, PaystackClient, WebhookVerifier},
    state::AppState,
    storage::{LedgerStore, StoreError},
    telemetry,
};

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("ledger store: {0}")]
    Store(#[from] StoreError),

    #[error("payment gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("identity provider: {0}")]
    Provider(#[from] ProviderError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    telemetry::init();
    if let Err(e) = run().await {
        error!(error = %e, "Ledger server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ServiceConfig::from_env()?;

    std::fs::create_dir_all(&config.data_dir)?;
    let ledger_path = config.ledger_path();
    let store = Arc::new(LedgerStore::open(&ledger_path)?);
    info!(path = %ledger_path.display(), "Ledger store opened");

    let gateway = PaystackClient::new(
        config.paystack_base_url.clone(),
        config.paystack_secret_key.clone(),
    )?;
    if !gateway.is_configured() {
        warn!("PAYSTACK_SECRET_KEY not set; deposits are disabled");
    }
    if config.google.is_none() {
        warn!("Google OAuth credentials not set; login is disabled");
    }

    let state = AppState::new(
        store,
        SessionSigner::new(config.jwt_secret.as_bytes(), config.jwt_ttl),
        Arc::new(GoogleProvider::new(config.google.clone())?),
        Arc::new(gateway),
        WebhookVerifier::new(config.paystack_webhook_secret.clone()),
    );

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(state.oauth_states.clone().run_sweeper(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Relational Ledger listening (docs at /docs)");

    let signal = shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "OAuth state sweeper did not stop cleanly");
    }
    info!("Ledger server stopped");
    Ok(())
}
