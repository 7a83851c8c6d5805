// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup into a [`ServiceConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the ledger database | `./data` |
//! | `JWT_SECRET` | HS256 key for session tokens | Required |
//! | `JWT_TTL_MINUTES` | Session token lifetime | `30` |
//! | `GOOGLE_CLIENT_ID` | OAuth client id | Optional |
//! | `GOOGLE_CLIENT_SECRET` | OAuth client secret | Optional |
//! | `GOOGLE_REDIRECT_URI` | OAuth callback URL | `http://localhost:8080/auth/callback` |
//! | `PAYSTACK_SECRET_KEY` | Payment gateway secret key | Optional |
//! | `PAYSTACK_WEBHOOK_SECRET` | Webhook HMAC key | `PAYSTACK_SECRET_KEY` |
//! | `PAYSTACK_BASE_URL` | Payment gateway API root | `https://api.paystack.co` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! Missing OAuth or gateway credentials do not stop the server; the affected
//! endpoints answer `upstream_unavailable` instead.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::identity::provider::GoogleCredentials;
use crate::payments::paystack::DEFAULT_BASE_URL as PAYSTACK_DEFAULT_BASE_URL;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_TTL_MINUTES_ENV: &str = "JWT_TTL_MINUTES";
pub const GOOGLE_CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
pub const GOOGLE_CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";
pub const GOOGLE_REDIRECT_URI_ENV: &str = "GOOGLE_REDIRECT_URI";
pub const PAYSTACK_SECRET_KEY_ENV: &str = "PAYSTACK_SECRET_KEY";
pub const PAYSTACK_WEBHOOK_SECRET_ENV: &str = "PAYSTACK_WEBHOOK_SECRET";
pub const PAYSTACK_BASE_URL_ENV: &str = "PAYSTACK_BASE_URL";

/// Environment variable name for log output format.
///
/// # Values
/// - `json` - structured JSON lines
/// - `pretty` - human-readable (default)
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_JWT_TTL_MINUTES: i64 = 30;
pub const DEFAULT_GOOGLE_REDIRECT_URI: &str = "http://localhost:8080/auth/callback";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Shortest accepted `JWT_SECRET`, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Ledger database file inside `DATA_DIR`.
pub const LEDGER_DB_FILE: &str = "ledger.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_ttl: chrono::Duration,
    pub google: Option<GoogleCredentials>,
    pub paystack_secret_key: Option<String>,
    pub paystack_webhook_secret: Option<String>,
    pub paystack_base_url: String,
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(optional)
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let jwt_secret = lookup(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: JWT_SECRET_ENV,
                reason: format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            });
        }

        let ttl_minutes = match lookup(JWT_TTL_MINUTES_ENV) {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|m| *m > 0 && *m <= 24 * 60)
                .ok_or_else(|| ConfigError::Invalid {
                    name: JWT_TTL_MINUTES_ENV,
                    reason: "expected minutes between 1 and 1440".to_string(),
                })?,
            None => DEFAULT_JWT_TTL_MINUTES,
        };

        let google = match (lookup(GOOGLE_CLIENT_ID_ENV), lookup(GOOGLE_CLIENT_SECRET_ENV)) {
            (Some(client_id), Some(client_secret)) => Some(GoogleCredentials {
                client_id,
                client_secret,
                redirect_uri: lookup(GOOGLE_REDIRECT_URI_ENV)
                    .unwrap_or_else(|| DEFAULT_GOOGLE_REDIRECT_URI.to_string()),
            }),
            _ => None,
        };

        let paystack_secret_key = lookup(PAYSTACK_SECRET_KEY_ENV);
        // Paystack signs webhooks with the account secret key
        let paystack_webhook_secret =
            lookup(PAYSTACK_WEBHOOK_SECRET_ENV).or_else(|| paystack_secret_key.clone());

        Ok(Self {
            bind_addr,
            data_dir: PathBuf::from(
                lookup(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            jwt_secret,
            jwt_ttl: chrono::Duration::minutes(ttl_minutes),
            google,
            paystack_secret_key,
            paystack_webhook_secret,
            paystack_base_url: lookup(PAYSTACK_BASE_URL_ENV)
                .unwrap_or_else(|| PAYSTACK_DEFAULT_BASE_URL.to_string()),
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_DB_FILE)
    }
}
