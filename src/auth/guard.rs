use axum::http::HeaderMap;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

use super::token::{self, AdminClaims, TokenError};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// How a write request was let through.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminAccess {
    /// No admin secret is configured; every request is allowed.
    Open,
    /// The credential was the configured secret itself.
    SharedSecret,
    /// The credential was a valid signed token.
    Token(AdminClaims),
}

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("Missing admin credential")]
    MissingCredential,
    #[error(transparent)]
    Rejected(#[from] TokenError),
}

/// Decides whether a request may write.
#[derive(Debug, Clone, Default)]
pub struct AdminGuard {
    secret: Option<String>,
}

impl AdminGuard {
    /// A blank secret counts as not configured.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.secret.is_none()
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn authorize(&self, headers: &HeaderMap) -> Result<AdminAccess, GuardError> {
        self.check(extract_credential(headers).as_deref())
    }

    /// Accepts the configured secret verbatim, otherwise a token signed with it.
    pub fn check(&self, credential: Option<&str>) -> Result<AdminAccess, GuardError> {
        let Some(secret) = self.secret.as_deref() else {
            return Ok(AdminAccess::Open);
        };
        let credential = credential.ok_or(GuardError::MissingCredential)?;

        if constant_time_eq(credential, secret) {
            return Ok(AdminAccess::SharedSecret);
        }
        let claims = token::verify(credential, secret).map_err(|e| {
            debug!("Admin token rejected: {}", e);
            e
        })?;
        Ok(AdminAccess::Token(claims))
    }
}

/// `X-Admin-Token`, else `Authorization` without its `Bearer` prefix.
/// Blank values count as absent.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(token) = header(ADMIN_TOKEN_HEADER) {
        return Some(token.to_string());
    }
    let auth = header("authorization")?;
    let stripped = strip_bearer(auth).trim();
    (!stripped.is_empty()).then(|| stripped.to_string())
}

fn strip_bearer(value: &str) -> &str {
    match value.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {
            let rest = &value[6..];
            let trimmed = rest.trim_start();
            if rest.is_empty() || trimmed.len() < rest.len() {
                trimmed
            } else {
                value
            }
        }
        _ => value,
    }
}

pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
