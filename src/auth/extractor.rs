// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated accounts.
//!
//! Use the `Authenticated` extractor in handlers to require a valid ID token:
//!
//! ```rust,ignore
//! async fn my_handler(Authenticated(account): Authenticated) -> impl IntoResponse {
//!     // account is the reconciled Account
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::AuthError;
use crate::models::Account;
use crate::state::AppState;

/// Extract the token from an `Authorization: Bearer <token>` value.
///
/// A missing header, another scheme or an empty token is
/// [`AuthError::MissingToken`]. The token is returned as sent; stray
/// whitespace is left for verification to reject.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    authorization
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Extractor for authenticated accounts.
///
/// Runs the whole authenticate flow, so the account is created or refreshed
/// before the handler sees it.
pub struct Authenticated(pub Account);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A header that is not valid UTF-8 carries no usable token.
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let resolution = state.authenticator.authenticate(authorization).await?;
        Ok(Authenticated(resolution.into_account()))
    }
}
