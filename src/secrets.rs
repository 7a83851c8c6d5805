// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Random secret material and digests.
//!
//! All randomness comes from the operating system CSPRNG via `ring`.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use crate::error::ApiError;

fn fill(buf: &mut [u8]) -> Result<(), ApiError> {
    SystemRandom::new().fill(buf).map_err(|_| {
        tracing::error!("System random generator failed");
        ApiError::internal("Random generator unavailable")
    })
}

/// `len` random bytes, lowercase hex encoded (`2 * len` characters).
pub fn random_hex(len: usize) -> Result<String, ApiError> {
    let mut buf = vec![0u8; len];
    fill(&mut buf)?;
    Ok(hex::encode(buf))
}

/// URL-safe, unpadded base64 of `len` random bytes.
pub fn random_urlsafe(len: usize) -> Result<String, ApiError> {
    let mut buf = vec![0u8; len];
    fill(&mut buf)?;
    Ok(Base64UrlUnpadded::encode_string(&buf))
}

/// `count` uniformly distributed decimal digits.
pub fn random_digits(count: usize) -> Result<String, ApiError> {
    let mut digits = String::with_capacity(count);
    let mut buf = [0u8; 32];
    while digits.len() < count {
        fill(&mut buf)?;
        // Bytes >= 250 would bias the modulo; drop them.
        for byte in buf.iter().filter(|b| **b < 250) {
            if digits.len() == count {
                break;
            }
            digits.push(char::from(b'0' + byte % 10));
        }
    }
    Ok(digits)
}

/// Lowercase hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
