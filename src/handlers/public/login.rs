// handlers/public/login.rs - POST /api/login
//
// Exchanges the configured admin email and password for a signed admin
// token. Input: `{ "email": "...", "password": "..." }`.
// Output: `{ "ok": true, "token": "...", "user": { "email", "role" } }`.

use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::guard::constant_time_eq;
use crate::auth::{issue_admin_token, token::ADMIN_ROLE};
use crate::error::ApiError;
use crate::middleware::JsonBody;
use crate::resources::normalize::opt_text;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "opt_text")]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub async fn post(State(state): State<AppState>, JsonBody(body): JsonBody<LoginRequest>) -> Result<Json<Value>, ApiError> {
    let security = &state.config.security;

    let matches = |given: Option<&str>, expected: Option<&str>| match (given, expected) {
        (Some(given), Some(expected)) => constant_time_eq(given, expected),
        _ => false,
    };
    let email_ok = matches(body.email.as_deref(), security.admin_email.as_deref());
    let password_ok = matches(body.password.as_deref(), security.admin_password.as_deref());
    if !(email_ok && password_ok) {
        warn!("Rejected admin login for {:?}", body.email);
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let secret = state
        .guard
        .secret()
        .ok_or_else(|| ApiError::internal_server_error("Missing ADMIN_TOKEN_SECRET"))?;

    let email = body.email.unwrap_or_default();
    let token = issue_admin_token(secret, &email, security.token_ttl_hours)?;
    info!("Issued admin token for {}", email);

    Ok(Json(json!({
        "ok": true,
        "token": token,
        "user": { "email": email, "role": ADMIN_ROLE },
    })))
}
