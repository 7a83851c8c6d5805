// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Webhook payload parsing.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Option<RawData>,
}

#[derive(Debug, Deserialize)]
struct RawData {
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    paid_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    ChargeSuccess {
        reference: String,
        paid_at: Option<DateTime<Utc>>,
    },
    ChargeFailed {
        reference: String,
    },
    /// Any event this service does not act on
    Ignored {
        event: String,
        reference: String,
    },
}

impl WebhookEvent {
    pub fn reference(&self) -> &str {
        match self {
            WebhookEvent::ChargeSuccess { reference, .. }
            | WebhookEvent::ChargeFailed { reference }
            | WebhookEvent::Ignored { reference, .. } => reference,
        }
    }
}

/// RFC 3339 timestamp, or `None` when unparseable.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a raw webhook body. A body without `data.reference` is malformed.
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, ApiError> {
    let raw: RawEvent = serde_json::from_slice(body)
        .map_err(|_| ApiError::bad_request("Invalid JSON payload"))?;

    let data = raw.data.unwrap_or(RawData {
        reference: None,
        paid_at: None,
    });
    let reference = data
        .reference
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing transaction reference"))?;

    let event = raw.event.unwrap_or_default();
    Ok(match event.as_str() {
        "charge.success" => WebhookEvent::ChargeSuccess {
            reference,
            paid_at: data.paid_at.as_deref().and_then(parse_timestamp),
        },
        "charge.failed" => WebhookEvent::ChargeFailed { reference },
        _ => WebhookEvent::Ignored { event, reference },
    })
}
