//! Compact HS256 admin tokens.
//!
//! Tokens are ordinary three-part JWTs. Expiry and role are checked here
//! rather than by `jsonwebtoken`, because `exp` may be given in seconds or
//! in milliseconds: values below 10^12 are read as seconds.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Timestamps below this are epoch seconds, others epoch milliseconds.
pub const SECONDS_THRESHOLD: i64 = 1_000_000_000_000;

pub const ADMIN_ROLE: &str = "admin";

/// Payload of an admin token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AdminClaims {
    /// Admin claims for `email` expiring at `exp_ms`.
    pub fn admin(email: impl Into<String>, exp_ms: i64) -> Self {
        Self {
            exp: Some(exp_ms),
            role: Some(ADMIN_ROLE.to_string()),
            email: Some(email.into()),
            extra: Map::new(),
        }
    }

    /// `exp` in epoch milliseconds.
    pub fn expires_at_ms(&self) -> Option<i64> {
        self.exp.map(|exp| if exp < SECONDS_THRESHOLD { exp * 1000 } else { exp })
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token must have three non-empty parts")]
    Malformed,
    #[error("Token expired")]
    Expired,
    #[error("Token role '{0}' is not admin")]
    WrongRole(String),
    #[error("Invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Signs `claims` with HMAC-SHA256.
pub fn sign(claims: &AdminClaims, secret: &str) -> Result<String, TokenError> {
    let key = EncodingKey::from_secret(secret.as_bytes());
    Ok(encode(&Header::new(Algorithm::HS256), claims, &key)?)
}

pub fn verify(token: &str, secret: &str) -> Result<AdminClaims, TokenError> {
    verify_at(token, secret, Utc::now().timestamp_millis())
}

/// Verifies `token` as of `now_ms`.
///
/// The signature comparison is constant time. A token without `exp` never
/// expires; a token without `role` is accepted.
pub fn verify_at(token: &str, secret: &str, now_ms: i64) -> Result<AdminClaims, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(TokenError::Malformed);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let key = DecodingKey::from_secret(secret.as_bytes());
    let claims = decode::<AdminClaims>(token, &key, &validation)?.claims;

    if let Some(exp_ms) = claims.expires_at_ms() {
        if exp_ms <= now_ms {
            return Err(TokenError::Expired);
        }
    }
    if let Some(role) = &claims.role {
        if role != ADMIN_ROLE {
            return Err(TokenError::WrongRole(role.clone()));
        }
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn claims(exp: Option<i64>, role: Option<&str>) -> AdminClaims {
        AdminClaims {
            exp,
            role: role.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn token_expires_after_its_lifetime() {
        let exp = Utc::now().timestamp_millis() + 1000;
        let token = sign(&claims(Some(exp), Some("admin")), "s1").unwrap();

        assert!(verify(&token, "s1").is_ok());
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(matches!(verify(&token, "s1"), Err(TokenError::Expired)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign(&AdminClaims::admin("a@b.c", i64::MAX / 2), "s1").unwrap();
        assert!(matches!(verify(&token, "s2"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expiry_accepts_seconds_and_milliseconds() {
        let now_ms = 1_700_000_000_000;
        let seconds = sign(&claims(Some(1_700_000_100), None), "k").unwrap();
        let millis = sign(&claims(Some(1_700_000_100_000), None), "k").unwrap();
        let past = sign(&claims(Some(1_699_999_999), None), "k").unwrap();

        assert!(verify_at(&seconds, "k", now_ms).is_ok());
        assert!(verify_at(&millis, "k", now_ms).is_ok());
        assert!(matches!(verify_at(&past, "k", now_ms), Err(TokenError::Expired)));
    }

    #[test]
    fn role_must_be_admin_when_present() {
        let no_role = sign(&claims(None, None), "k").unwrap();
        let editor = sign(&claims(None, Some("editor")), "k").unwrap();

        assert!(verify(&no_role, "k").is_ok());
        assert!(matches!(verify(&editor, "k"), Err(TokenError::WrongRole(r)) if r == "editor"));
    }

    #[test]
    fn malformed_tokens_fail_closed() {
        for token in ["", "abc", "a.b", "a..c", "a.b.c.d", ".b.c"] {
            assert!(matches!(verify(token, "k"), Err(TokenError::Malformed)), "{token}");
        }
        assert!(matches!(verify("a.b.c", "k"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn other_algorithms_are_rejected() {
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims(None, Some("admin")),
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap();
        assert!(matches!(verify(&token, "k"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn extra_claims_survive() {
        let mut original = AdminClaims::admin("owner@example.com", i64::MAX / 2);
        original.extra.insert("name".into(), Value::String("Owner".into()));
        let token = sign(&original, "k").unwrap();
        assert_eq!(verify(&token, "k").unwrap(), original);
    }
}
