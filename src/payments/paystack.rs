// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Paystack transaction API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::info;

use super::events::parse_timestamp;
use super::gateway::{
    map_charge_status, GatewayError, InitializeRequest, InitializedCharge, PaymentGateway,
    VerifiedCharge,
};

pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Every Paystack response is wrapped in `{ status, message, data }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    #[serde(default)]
    paid_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaystackClient {
    base_url: String,
    secret_key: Option<String>,
    http: Client,
}

impl PaystackClient {
    /// `secret_key = None` yields a client whose calls fail with
    /// [`GatewayError::NotConfigured`].
    pub fn new(
        base_url: impl Into<String>,
        secret_key: Option<String>,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.filter(|key| !key.trim().is_empty()),
            http,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    fn secret_key(&self) -> Result<&str, GatewayError> {
        self.secret_key.as_deref().ok_or(GatewayError::NotConfigured)
    }

    async fn read_envelope<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Request(format!("{path} body read failed: {e}")))?;

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                GatewayError::InvalidResponse(format!("{path} invalid JSON: {e}"))
            } else {
                GatewayError::Request(format!("{path} returned {status}: {body}"))
            }
        })?;

        if !status.is_success() || !envelope.status {
            let message = envelope
                .message
                .unwrap_or_else(|| format!("{path} returned {status}"));
            return Err(GatewayError::Rejected(message));
        }

        envelope
            .data
            .ok_or_else(|| GatewayError::InvalidResponse(format!("{path} response has no data")))
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(
        &self,
        request: InitializeRequest<'_>,
    ) -> Result<InitializedCharge, GatewayError> {
        let secret_key = self.secret_key()?;
        let path = "/transaction/initialize";
        let payload = json!({
            "email": request.email,
            "amount": request.amount,
            "reference": request.reference,
        });

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("POST {path} failed: {e}")))?;

        let data: InitializeData = Self::read_envelope(path, response).await?;
        info!(
            reference = %request.reference,
            amount = request.amount,
            "Paystack charge initialized"
        );

        Ok(InitializedCharge {
            authorization_url: data.authorization_url,
        })
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedCharge, GatewayError> {
        let secret_key = self.secret_key()?;
        let path = format!("/transaction/verify/{reference}");

        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("GET {path} failed: {e}")))?;

        let data: VerifyData = Self::read_envelope(&path, response).await?;
        Ok(VerifiedCharge {
            status: map_charge_status(&data.status),
            paid_at: data.paid_at.as_deref().and_then(parse_timestamp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_client_fails_without_network() {
        let client = PaystackClient::new(DEFAULT_BASE_URL, Some("  ".into())).unwrap();
        assert!(!client.is_configured());

        let err = client.verify("txn_abc").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured));

        let err = client
            .initialize(InitializeRequest {
                email: "a@x.com",
                amount: 500,
                reference: "txn_abc",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured));
    }

    #[test]
    fn envelope_tolerates_missing_message() {
        let parsed: Envelope<VerifyData> =
            serde_json::from_str(r#"{"status":true,"data":{"status":"success"}}"#).unwrap();
        assert!(parsed.status);
        assert_eq!(parsed.data.unwrap().status, "success");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = PaystackClient::new("http://localhost:9999/", Some("sk_test".into())).unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
