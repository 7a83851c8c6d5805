// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # OAuth Anti-Forgery States
//!
//! Single-use `state` tokens for the login redirect. A token is inserted when
//! the consent URL is issued and deleted when the callback consumes it;
//! entries older than [`STATE_TTL`] are refused and swept periodically.
//!
//! The set lives in process memory, so it only works for a single instance.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::secrets::random_urlsafe;

pub const STATE_TTL: TimeDelta = TimeDelta::minutes(10);

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
pub struct OAuthStateStore {
    issued: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl OAuthStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint and remember a fresh state token.
    pub async fn issue(&self, now: DateTime<Utc>) -> Result<String, ApiError> {
        let state = random_urlsafe(32)?;
        self.issued.lock().await.insert(state.clone(), now);
        Ok(state)
    }

    /// Remove `state`; `true` only if it was issued and is still fresh.
    pub async fn consume(&self, state: &str, now: DateTime<Utc>) -> bool {
        match self.issued.lock().await.remove(state) {
            Some(issued_at) => now - issued_at <= STATE_TTL,
            None => false,
        }
    }

    /// Drop expired entries, returning how many were removed.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut issued = self.issued.lock().await;
        let before = issued.len();
        issued.retain(|_, issued_at| now - *issued_at <= STATE_TTL);
        before - issued.len()
    }

    pub async fn len(&self) -> usize {
        self.issued.lock().await.len()
    }

    /// Sweep until `shutdown` fires.
    ///
    /// ```rust,ignore
    /// tokio::spawn(state.oauth_states.clone().run_sweeper(shutdown.clone()));
    /// ```
    pub async fn run_sweeper(self: std::sync::Arc<Self>, shutdown: CancellationToken) {
        info!(
            interval_secs = SWEEP_INTERVAL.as_secs(),
            "OAuth state sweeper starting"
        );
        loop {
            tokio::select! {
                _ = tokio::time::sleep(SWEEP_INTERVAL) => {
                    let removed = self.sweep(Utc::now()).await;
                    if removed > 0 {
                        debug!(removed, "Swept expired OAuth states");
                    }
                },
                _ = shutdown.cancelled() => {
                    info!("OAuth state sweeper shutting down");
                    return;
                }
            }
        }
    }
}
