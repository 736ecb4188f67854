use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::auth::AdminAccess;
use crate::error::ApiError;
use crate::state::AppState;

/// Extractor that rejects the request with 401 unless the admin guard
/// accepts its credential. Handlers taking it never run for rejected
/// requests.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AdminAccess);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(RequireAdmin(state.guard.authorize(&parts.headers)?))
    }
}
