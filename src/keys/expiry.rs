// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Expiry shorthand for API keys.
//!
//! A positive integer followed by a unit letter (case-insensitive):
//!
//! | Unit | Meaning  |
//! |------|----------|
//! | `H`  | hours    |
//! | `D`  | days     |
//! | `M`  | 30 days  |
//! | `Y`  | 365 days |
//!
//! `"2H"`, `"30d"` and `"1Y"` are valid; `"0D"`, `"-1H"`, `"+1H"`, `"1.5D"`
//! and `"H"` are not.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryUnit {
    Hours,
    Days,
    Months,
    Years,
}

impl ExpiryUnit {
    fn hours(&self) -> i64 {
        match self {
            ExpiryUnit::Hours => 1,
            ExpiryUnit::Days => 24,
            ExpiryUnit::Months => 30 * 24,
            ExpiryUnit::Years => 365 * 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirySpec {
    pub magnitude: u32,
    pub unit: ExpiryUnit,
}

impl ExpirySpec {
    pub fn parse(input: &str) -> Result<Self, ApiError> {
        let invalid = || {
            ApiError::bad_request(format!(
                "Invalid expiry '{input}': expected a positive integer followed by H, D, M or Y"
            ))
        };

        let unit_char = input.chars().last().ok_or_else(invalid)?;
        let unit = match unit_char.to_ascii_uppercase() {
            'H' => ExpiryUnit::Hours,
            'D' => ExpiryUnit::Days,
            'M' => ExpiryUnit::Months,
            'Y' => ExpiryUnit::Years,
            _ => return Err(invalid()),
        };

        let digits = &input[..input.len() - unit_char.len_utf8()];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let magnitude: u32 = digits.parse().map_err(|_| invalid())?;
        if magnitude == 0 {
            return Err(invalid());
        }

        Ok(Self { magnitude, unit })
    }

    /// Absolute expiry when applied at `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ApiError> {
        let out_of_range = || ApiError::bad_request("Expiry is too far in the future");
        let hours = i64::from(self.magnitude)
            .checked_mul(self.unit.hours())
            .ok_or_else(out_of_range)?;
        let delta = TimeDelta::try_hours(hours).ok_or_else(out_of_range)?;
        now.checked_add_signed(delta).ok_or_else(out_of_range)
    }
}

/// Parse and resolve an optional expiry; `None` means the key never expires.
pub fn resolve_expiry(
    expiry: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    expiry
        .map(|spec| ExpirySpec::parse(spec)?.resolve(now))
        .transpose()
}
