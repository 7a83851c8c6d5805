// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Dual-mode authentication for the ledger API.
//!
//! ## Auth Flow
//!
//! 1. A user completes the OAuth handshake at `/auth/callback`
//! 2. The service mints an HS256 session token (`sub` = local user id)
//! 3. Requests carry either:
//!    - `Authorization: Bearer <session token>`, never scope-limited
//!    - `x-api-key: sk_live_...`, limited to the key's scopes
//!
//! ## Security
//!
//! - Key management endpoints accept session tokens only
//! - API keys are stored as SHA-256 hashes; the raw secret is shown once
//! - Clock skew tolerance is 60 seconds

pub mod api_key;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod permissions;
pub mod session;
pub mod verifier;

pub use claims::{AuthMethod, AuthenticatedUser, SessionClaims};
pub use error::AuthError;
pub use extractor::{Authorized, SessionAuth};
pub use permissions::{authorize, DepositAccess, ReadAccess, Requirement, TransferAccess};
pub use session::{IssuedSession, SessionSigner};
pub use verifier::CredentialVerifier;
