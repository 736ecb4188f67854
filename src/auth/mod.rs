pub mod guard;
pub mod token;

pub use guard::{extract_credential, AdminAccess, AdminGuard, GuardError};
pub use token::{AdminClaims, TokenError};

use chrono::{Duration, Utc};

/// Signs an admin token for `email` valid for `ttl_hours`, with `exp` in
/// epoch milliseconds.
pub fn issue_admin_token(secret: &str, email: &str, ttl_hours: u64) -> Result<String, TokenError> {
    let exp = Utc::now() + Duration::hours(ttl_hours as i64);
    token::sign(&AdminClaims::admin(email, exp.timestamp_millis()), secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify() {
        let token = issue_admin_token("secret", "owner@example.com", 24).unwrap();
        let claims = token::verify(&token, "secret").unwrap();
        assert_eq!(claims.role.as_deref(), Some("admin"));
        assert!(claims.exp.unwrap() > Utc::now().timestamp_millis());
    }
}
