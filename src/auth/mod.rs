// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Google ID token authentication with account reconciliation.
//!
//! ## Auth Flow
//!
//! 1. Client signs in with Google and receives an ID token
//! 2. Client sends `Authorization: Bearer <ID token>`
//! 3. Server:
//!    - Fetches Google's key set over HTTPS (cached until its `Expires`)
//!    - Verifies the RS256 signature against the key named by `kid`
//!    - Validates issuer, audience and expiry against the policy
//!    - Creates the account on first sign-in, or refreshes the
//!      provider-managed fields when they changed
//!
//! ## Security
//!
//! - Callers only ever see "missing token", "invalid token" or an internal
//!   failure; the detailed reason stays in the server log
//! - Only RSA keys are accepted
//! - Expiry is checked with no leeway

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod reconcile;
pub mod verifier;

pub use authenticator::{AuthStage, Authenticator};
pub use claims::{ClaimField, ClaimSet, ValidationPolicy};
pub use error::AuthError;
pub use extractor::{bearer_token, Authenticated};
pub use jwks::{KeySet, KeySetCache, KeySource};
pub use reconcile::{reconcile, AccountResolution, Outcome};
pub use verifier::verify;
