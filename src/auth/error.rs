// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every variant keeps its detailed reason for server-side logs. The HTTP
//! response only ever carries one of three generic outcomes: a missing token,
//! an invalid token, or an internal failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::claims::ClaimField;

/// Authentication error type.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable `Authorization: Bearer <token>` header
    #[error("Authorization bearer token is missing")]
    MissingToken,
    /// Token structure, header or payload could not be decoded
    #[error("Token is malformed: {0}")]
    InvalidTokenFormat(String),
    /// Key set could not be fetched or parsed
    #[error("Failed to fetch signing keys: {0}")]
    KeyFetchFailure(String),
    /// Token names a key that is not in the current key set
    #[error("No signing key found for kid {0:?}")]
    UnknownKeyId(String),
    /// Key exists but is not an RSA key
    #[error("Unsupported signing key type: {0}")]
    UnsupportedKeyType(String),
    /// Signature does not match header and payload
    #[error("Token signature is invalid")]
    SignatureInvalid,
    /// A claim failed the validation policy
    #[error("Token {field} claim is invalid")]
    ClaimInvalid { field: ClaimField },
    /// Account lookup or write failed
    #[error("Account persistence failed: {0}")]
    PersistenceFailure(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
    error_code: &'static str,
}

impl AuthError {
    /// Detailed error code, for logs only.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidTokenFormat(_) => "invalid_token_format",
            AuthError::KeyFetchFailure(_) => "key_fetch_failure",
            AuthError::UnknownKeyId(_) => "unknown_key_id",
            AuthError::UnsupportedKeyType(_) => "unsupported_key_type",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::ClaimInvalid { field } => match field {
                ClaimField::Issuer => "invalid_issuer",
                ClaimField::Subject => "invalid_subject",
                ClaimField::Audience => "invalid_audience",
                ClaimField::Id => "invalid_id",
                ClaimField::Expiry => "token_expired",
                ClaimField::NotBefore => "token_not_yet_valid",
            },
            AuthError::PersistenceFailure(_) => "persistence_failure",
        }
    }

    /// Whether this error collapses to the generic "invalid token" outcome.
    pub fn is_invalid_token(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidTokenFormat(_)
                | AuthError::UnknownKeyId(_)
                | AuthError::UnsupportedKeyType(_)
                | AuthError::SignatureInvalid
                | AuthError::ClaimInvalid { .. }
        )
    }

    /// Caller-visible error code.
    pub fn public_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            err if err.is_invalid_token() => "invalid_token",
            _ => "internal_error",
        }
    }

    /// Caller-visible message.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Missing bearer token",
            err if err.is_invalid_token() => "Invalid token",
            _ => "Internal server error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken => StatusCode::BAD_REQUEST,
            err if err.is_invalid_token() => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                code = self.error_code(),
                reason = %self,
                "Authentication failed internally"
            );
        } else {
            tracing::debug!(code = self.error_code(), reason = %self, "Authentication rejected");
        }

        let body = Json(AuthErrorBody {
            error: self.public_message(),
            error_code: self.public_code(),
        });
        (status, body).into_response()
    }
}
