// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Display-currency amounts.
//!
//! Clients send deposit amounts as decimals in major units (`"50.00"` or
//! `50.5`). The ledger only ever sees integer minor units; conversion is done
//! here with checked integer arithmetic, never floats. Digits past the second
//! decimal place are truncated toward zero.

use serde::Deserialize;

use crate::error::ApiError;

/// Minor units per major unit (kobo per naira).
pub const MINOR_UNITS_PER_MAJOR: u64 = 100;

/// Smallest accepted deposit: 1.00 in display currency.
pub const MIN_DEPOSIT_MINOR: u64 = 100;

/// Smallest accepted transfer, in minor units.
pub const MIN_TRANSFER_MINOR: u64 = 100;

/// A decimal amount as it arrives in JSON: string or number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DisplayAmount {
    Text(String),
    Number(serde_json::Number),
}

impl DisplayAmount {
    pub fn to_minor(&self) -> Result<u64, ApiError> {
        match self {
            DisplayAmount::Text(text) => parse_amount_to_minor(text),
            DisplayAmount::Number(number) => parse_amount_to_minor(&number.to_string()),
        }
    }
}

/// Parse a positive decimal into minor units, dropping fraction digits past
/// the second.
pub fn parse_amount_to_minor(amount: &str) -> Result<u64, ApiError> {
    let invalid = || ApiError::bad_request("amount must be a valid positive number");

    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let (whole_part, fraction_part) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    if whole_part.is_empty() || !whole_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if !fraction_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let too_large = || ApiError::bad_request("amount is too large");
    let whole = whole_part.parse::<u64>().map_err(|_| too_large())?;
    let fraction = fraction_part
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(2)
        .fold(0, |acc, digit| acc * 10 + u64::from(digit - b'0'));

    whole
        .checked_mul(MINOR_UNITS_PER_MAJOR)
        .and_then(|minor| minor.checked_add(fraction))
        .ok_or_else(too_large)
}

/// Render minor units as a two-decimal display string.
pub fn format_minor(minor: u64) -> String {
    format!(
        "{}.{:02}",
        minor / MINOR_UNITS_PER_MAJOR,
        minor % MINOR_UNITS_PER_MAJOR
    )
}
