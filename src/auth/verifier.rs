// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature verification of compact ID tokens.
//!
//! This step is purely structural and cryptographic: it proves the token was
//! signed by a key from the provider's key set and decodes the payload. Claim
//! semantics (issuer, audience, expiry, ...) are left to
//! [`claims::validate`](super::claims::validate).

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, KeyAlgorithm};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use super::claims::ClaimSet;
use super::error::AuthError;
use super::jwks::KeySource;

/// Verify `token` against `keys` and return its claims.
pub async fn verify<K: KeySource>(token: &str, keys: &K) -> Result<ClaimSet, AuthError> {
    if token.split('.').count() != 3 {
        return Err(AuthError::InvalidTokenFormat(
            "expected three dot-separated segments".to_string(),
        ));
    }

    let header = decode_header(token)
        .map_err(|e| AuthError::InvalidTokenFormat(format!("unreadable header: {e}")))?;

    let kid = header
        .kid
        .as_deref()
        .filter(|kid| !kid.is_empty())
        .ok_or_else(|| AuthError::InvalidTokenFormat("header has no kid".to_string()))?;

    let jwk = keys.key(kid).await?;
    let (decoding_key, algorithm) = rsa_decoding_key(&jwk)?;

    // Signature only; claim checks happen in the validator.
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data =
        decode::<ClaimSet>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                AuthError::SignatureInvalid
            }
            _ => AuthError::InvalidTokenFormat(e.to_string()),
        })?;

    Ok(token_data.claims)
}

/// Convert an RSA JWK to a DecodingKey. Other key types are refused.
fn rsa_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    let rsa = match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => rsa,
        AlgorithmParameters::EllipticCurve(_) => {
            return Err(AuthError::UnsupportedKeyType("EC".to_string()))
        }
        AlgorithmParameters::OctetKey(_) => {
            return Err(AuthError::UnsupportedKeyType("oct".to_string()))
        }
        _ => return Err(AuthError::UnsupportedKeyType("OKP".to_string())),
    };

    let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
        .map_err(|e| AuthError::UnsupportedKeyType(format!("unusable RSA key: {e}")))?;

    let algorithm = match jwk.common.key_algorithm {
        None | Some(KeyAlgorithm::RS256) => Algorithm::RS256,
        Some(KeyAlgorithm::RS384) => Algorithm::RS384,
        Some(KeyAlgorithm::RS512) => Algorithm::RS512,
        Some(KeyAlgorithm::PS256) => Algorithm::PS256,
        Some(KeyAlgorithm::PS384) => Algorithm::PS384,
        Some(KeyAlgorithm::PS512) => Algorithm::PS512,
        Some(other) => {
            return Err(AuthError::UnsupportedKeyType(format!(
                "RSA key declared for {other:?}"
            )))
        }
    };

    Ok((key, algorithm))
}
