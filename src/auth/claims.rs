// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ID token claims and the claim validation policy.
//!
//! A [`ClaimSet`] is the registered JWT claims ([`StandardClaims`]) plus the
//! profile claims the identity provider adds ([`ProviderClaims`]). Both are
//! filled from the same payload in one decode. Validation only ever looks at
//! the standard claims.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Issuers Google uses for its ID tokens.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Registered JWT claims. Timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardClaims {
    #[serde(rename = "iss", default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,

    #[serde(rename = "sub", default, skip_serializing_if = "String::is_empty")]
    pub subject: String,

    #[serde(rename = "aud", default, skip_serializing_if = "String::is_empty")]
    pub audience: String,

    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    #[serde(rename = "nbf", default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<i64>,

    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,

    #[serde(rename = "jti", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

/// Profile claims added by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderClaims {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub email_verified: bool,

    /// Display name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub given_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub family_name: String,

    /// BCP 47 language tag, e.g. `en-GB`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub locale: String,

    /// Profile picture URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub picture: String,

    #[serde(rename = "azp", default, skip_serializing_if = "String::is_empty")]
    pub authorized_presenter: String,

    #[serde(rename = "at_hash", default, skip_serializing_if = "String::is_empty")]
    pub access_token_hash: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Full claim set of a verified ID token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    #[serde(flatten)]
    pub standard: StandardClaims,

    #[serde(flatten)]
    pub profile: ProviderClaims,
}

/// The claim a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimField {
    Issuer,
    Subject,
    Audience,
    Id,
    Expiry,
    NotBefore,
}

impl ClaimField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimField::Issuer => "issuer",
            ClaimField::Subject => "subject",
            ClaimField::Audience => "audience",
            ClaimField::Id => "id",
            ClaimField::Expiry => "expiry",
            ClaimField::NotBefore => "not-before",
        }
    }
}

impl fmt::Display for ClaimField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which claims a token must carry to be accepted.
///
/// An empty allow-list places no restriction on its claim. A non-empty one
/// requires an exact match with one of its entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub issuers: Vec<String>,
    pub subjects: Vec<String>,
    pub audiences: Vec<String>,
    pub ids: Vec<String>,
    pub check_expiry: bool,
    pub check_not_before: bool,
}

impl ValidationPolicy {
    /// Policy for Google ID tokens issued to the given OAuth client IDs.
    pub fn google<I, S>(client_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            issuers: GOOGLE_ISSUERS.iter().map(|iss| iss.to_string()).collect(),
            audiences: client_ids.into_iter().map(Into::into).collect(),
            check_expiry: true,
            ..Self::default()
        }
    }

    pub fn with_issuers<I, S>(mut self, issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.issuers = issuers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_not_before(mut self, check: bool) -> Self {
        self.check_not_before = check;
        self
    }
}

/// Validate claims against a policy at the current time.
pub fn validate(claims: &StandardClaims, policy: &ValidationPolicy) -> Result<(), AuthError> {
    validate_at(claims, policy, Utc::now().timestamp())
}

/// Validate claims against a policy at `now` (Unix seconds).
///
/// Checks run in a fixed order and the first failure is returned: issuer,
/// subject, audience, id, expiry, not-before.
pub fn validate_at(
    claims: &StandardClaims,
    policy: &ValidationPolicy,
    now: i64,
) -> Result<(), AuthError> {
    check_allowed(ClaimField::Issuer, &claims.issuer, &policy.issuers)?;
    check_allowed(ClaimField::Subject, &claims.subject, &policy.subjects)?;
    check_allowed(ClaimField::Audience, &claims.audience, &policy.audiences)?;
    check_allowed(ClaimField::Id, &claims.id, &policy.ids)?;

    if policy.check_expiry {
        check_expiry(claims, now)?;
    }
    if policy.check_not_before {
        check_not_before(claims, now)?;
    }

    Ok(())
}

/// Allow-list check for a single claim value.
pub fn check_allowed(field: ClaimField, value: &str, allowed: &[String]) -> Result<(), AuthError> {
    if allowed.is_empty() || allowed.iter().any(|entry| entry == value) {
        Ok(())
    } else {
        Err(AuthError::ClaimInvalid { field })
    }
}

/// Passes only when `now` is strictly before `exp`. A token without `exp`
/// never passes.
pub fn check_expiry(claims: &StandardClaims, now: i64) -> Result<(), AuthError> {
    match claims.expires_at {
        Some(exp) if now < exp => Ok(()),
        _ => Err(AuthError::ClaimInvalid {
            field: ClaimField::Expiry,
        }),
    }
}

/// Passes when `now` is strictly after `nbf`, or when there is no `nbf`.
pub fn check_not_before(claims: &StandardClaims, now: i64) -> Result<(), AuthError> {
    match claims.not_before {
        Some(nbf) if now <= nbf => Err(AuthError::ClaimInvalid {
            field: ClaimField::NotBefore,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;
    const HOUR: i64 = 3600;

    fn list(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn failed_field(result: Result<(), AuthError>) -> Option<ClaimField> {
        match result {
            Err(AuthError::ClaimInvalid { field }) => Some(field),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(()) => None,
        }
    }

    #[test]
    fn empty_policy_accepts_anything() {
        let claims = StandardClaims {
            issuer: "iss-val".into(),
            subject: "sub-val".into(),
            audience: "aud-val".into(),
            expires_at: Some(NOW - HOUR),
            not_before: Some(NOW + HOUR),
            ..Default::default()
        };
        assert!(validate_at(&claims, &ValidationPolicy::default(), NOW).is_ok());
    }

    #[test]
    fn expired_token_rejected_only_when_checked() {
        let claims = StandardClaims {
            expires_at: Some(NOW - HOUR),
            ..Default::default()
        };
        let checking = ValidationPolicy {
            check_expiry: true,
            ..Default::default()
        };
        assert_eq!(
            failed_field(validate_at(&claims, &checking, NOW)),
            Some(ClaimField::Expiry)
        );
        assert!(validate_at(&claims, &ValidationPolicy::default(), NOW).is_ok());
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let claims = StandardClaims {
            expires_at: Some(NOW),
            ..Default::default()
        };
        assert!(check_expiry(&claims, NOW).is_err());
        assert!(check_expiry(&claims, NOW - 1).is_ok());
    }

    #[test]
    fn missing_expiry_fails_check() {
        assert!(check_expiry(&StandardClaims::default(), NOW).is_err());
    }

    #[test]
    fn not_before_in_future_rejected() {
        let claims = StandardClaims {
            not_before: Some(NOW + HOUR),
            ..Default::default()
        };
        let policy = ValidationPolicy::default().with_not_before(true);
        assert_eq!(
            failed_field(validate_at(&claims, &policy, NOW)),
            Some(ClaimField::NotBefore)
        );

        let started = StandardClaims {
            not_before: Some(NOW - HOUR),
            ..Default::default()
        };
        assert!(validate_at(&started, &policy, NOW).is_ok());
        assert!(check_not_before(&StandardClaims::default(), NOW).is_ok());
    }

    #[test]
    fn allow_lists_match_exactly() {
        let claims = StandardClaims {
            issuer: "iss-val".into(),
            subject: "sub-val".into(),
            audience: "aud-val".into(),
            id: "id-val".into(),
            ..Default::default()
        };

        let cases = [
            (
                ClaimField::Issuer,
                ValidationPolicy {
                    issuers: list(&["issuer"]),
                    ..Default::default()
                },
            ),
            (
                ClaimField::Subject,
                ValidationPolicy {
                    subjects: list(&["subject"]),
                    ..Default::default()
                },
            ),
            (
                ClaimField::Audience,
                ValidationPolicy {
                    audiences: list(&["audience"]),
                    ..Default::default()
                },
            ),
            (
                ClaimField::Id,
                ValidationPolicy {
                    ids: list(&["id"]),
                    ..Default::default()
                },
            ),
        ];
        for (field, policy) in cases {
            assert_eq!(failed_field(validate_at(&claims, &policy, NOW)), Some(field));
        }

        let permissive = ValidationPolicy {
            issuers: list(&["issuer", "iss-val"]),
            subjects: list(&["subject", "sub-val"]),
            audiences: list(&["audience", "aud-val"]),
            ids: list(&["id", "id-val"]),
            ..Default::default()
        };
        assert!(validate_at(&claims, &permissive, NOW).is_ok());
    }

    #[test]
    fn audience_accepted_once_listed() {
        let claims = StandardClaims {
            audience: "ios_client_id".into(),
            ..Default::default()
        };
        let mut policy = ValidationPolicy::google(["webapp_client_id"]);
        policy.check_expiry = false;
        policy.issuers.clear();
        assert_eq!(
            failed_field(validate_at(&claims, &policy, NOW)),
            Some(ClaimField::Audience)
        );

        policy.audiences.push("ios_client_id".into());
        assert!(validate_at(&claims, &policy, NOW).is_ok());
    }

    #[test]
    fn first_violation_wins() {
        let claims = StandardClaims {
            issuer: "evil".into(),
            audience: "other".into(),
            expires_at: Some(NOW - HOUR),
            ..Default::default()
        };
        let policy = ValidationPolicy::google(["webapp_client_id"]);
        assert_eq!(
            failed_field(validate_at(&claims, &policy, NOW)),
            Some(ClaimField::Issuer)
        );
    }

    #[test]
    fn google_policy_defaults() {
        let policy = ValidationPolicy::google(["webapp_client_id"]);
        assert_eq!(policy.issuers, list(&GOOGLE_ISSUERS));
        assert_eq!(policy.audiences, list(&["webapp_client_id"]));
        assert!(policy.check_expiry);
        assert!(!policy.check_not_before);
    }

    #[test]
    fn decodes_standard_and_profile_claims_from_one_payload() {
        let payload = r#"{
            "iss": "https://accounts.google.com",
            "azp": "webapp_client_id",
            "aud": "webapp_client_id",
            "sub": "110169484474386276334",
            "email": "ada@example.com",
            "email_verified": true,
            "at_hash": "HK6E_P6Dh8Y93mRNtsDB1Q",
            "name": "Ada Lovelace",
            "picture": "https://lh3.googleusercontent.com/a/ada.jpg",
            "given_name": "Ada",
            "family_name": "Lovelace",
            "locale": "en-GB",
            "iat": 1760000000,
            "exp": 1760003600,
            "hd": "example.com"
        }"#;

        let claims: ClaimSet = serde_json::from_str(payload).unwrap();
        assert_eq!(claims.standard.issuer, "https://accounts.google.com");
        assert_eq!(claims.standard.subject, "110169484474386276334");
        assert_eq!(claims.standard.expires_at, Some(1_760_003_600));
        assert_eq!(claims.standard.not_before, None);
        assert_eq!(claims.profile.family_name, "Lovelace");
        assert_eq!(claims.profile.authorized_presenter, "webapp_client_id");
        assert_eq!(claims.profile.access_token_hash, "HK6E_P6Dh8Y93mRNtsDB1Q");
        assert!(claims.profile.email_verified);
    }
}
