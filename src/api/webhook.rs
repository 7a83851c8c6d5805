// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment gateway webhook.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ErrorBody},
    payments::SIGNATURE_HEADER,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub status: bool,
}

/// Receive a signed charge event from Paystack.
///
/// The signature is checked over the raw body before anything is parsed.
/// Events for unknown references are acknowledged without effect.
#[utoipa::path(
    post,
    path = "/wallet/paystack/webhook",
    tag = "Webhooks",
    params(("x-paystack-signature" = String, Header, description = "HMAC-SHA512 of the body")),
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Malformed payload", body = ErrorBody),
        (status = 401, description = "Invalid signature", body = ErrorBody)
    )
)]
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    state
        .reconciler
        .handle_webhook(&body, signature, Utc::now())?;
    Ok(Json(WebhookAck { status: true }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{post_json, send};
    use crate::testutil::TestHarness;
    use axum::http::StatusCode;
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn signed_success_credits_once() {
        let harness = TestHarness::new();
        let (user, _) = harness.user_with_session("a@x.com");
        let initiated = harness
            .state
            .reconciler
            .initiate_deposit(user.id, &user.email, 500, Utc::now())
            .await
            .unwrap();

        let payload = json!({
            "event": "charge.success",
            "data": { "reference": initiated.transaction.reference }
        });
        let signature = harness.sign_webhook(payload.to_string().as_bytes());
        let headers = [("x-paystack-signature", signature.as_str())];

        for _ in 0..2 {
            let (status, body) = send(
                harness.router(),
                post_json("/wallet/paystack/webhook", &headers, payload.clone()),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], true);
        }
        assert_eq!(harness.state.ledger.wallet_for_owner(user.id).unwrap().balance(), 500);
    }

    #[tokio::test]
    async fn unsigned_and_malformed_deliveries_are_rejected() {
        let harness = TestHarness::new();
        let payload = json!({ "event": "charge.success", "data": { "reference": "txn_x" } });

        let (status, body) = send(
            harness.router(),
            post_json("/wallet/paystack/webhook", &[], payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "unauthenticated");

        let missing_reference = json!({ "event": "charge.success", "data": {} });
        let signature = harness.sign_webhook(missing_reference.to_string().as_bytes());
        let (status, body) = send(
            harness.router(),
            post_json(
                "/wallet/paystack/webhook",
                &[("x-paystack-signature", signature.as_str())],
                missing_reference,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_input");
    }
}
