// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth identity provider client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::ApiError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const GOOGLE_SCOPES: &str = "openid email profile";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// What the provider asserts about the signed-in person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Identity provider is not configured")]
    NotConfigured,

    #[error("Identity provider rejected the authorization code: {0}")]
    Rejected(String),

    #[error("Identity provider request failed: {0}")]
    Request(String),

    #[error("Identity provider response was invalid: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected(_) => ApiError::unauthenticated(err.to_string()),
            _ => {
                tracing::warn!(error = %err, "Identity provider call failed");
                ApiError::upstream(err.to_string())
            }
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent page URL carrying the anti-forgery `state`.
    fn authorization_url(&self, state: &str) -> Result<String, ProviderError>;

    /// Exchange an authorization code for the user's identity.
    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    credentials: Option<GoogleCredentials>,
    http: Client,
}

impl GoogleProvider {
    /// `None` yields a provider whose calls fail with
    /// [`ProviderError::NotConfigured`].
    pub fn new(credentials: Option<GoogleCredentials>) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { credentials, http })
    }

    fn credentials(&self) -> Result<&GoogleCredentials, ProviderError> {
        self.credentials.as_ref().ok_or(ProviderError::NotConfigured)
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_url(&self, state: &str) -> Result<String, ProviderError> {
        let credentials = self.credentials()?;
        let url = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", GOOGLE_SCOPES),
                ("access_type", "offline"),
                ("state", state),
            ],
        )
        .map_err(|e| ProviderError::InvalidResponse(format!("bad authorization URL: {e}")))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, ProviderError> {
        let credentials = self.credentials()?;

        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("token exchange failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected(format!(
                "token endpoint returned {status}: {body}"
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid token response: {e}")))?;

        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("userinfo request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ProviderError::Request(format!("userinfo returned {status}")));
        }
        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid userinfo: {e}")))?;

        Ok(ExternalIdentity {
            subject: info.id,
            email: info.email,
            name: info.name,
            picture_url: info.picture,
        })
    }
}
