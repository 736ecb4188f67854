// handlers/mod.rs - HTTP handlers grouped by resource
//
// Reads are public unless noted; writes take the `RequireAdmin` extractor,
// which rejects the request before the handler body (and any spreadsheet
// write) runs.

pub mod catalog;
pub mod orders;
pub mod public;
pub mod service_orders;

use axum::http::Uri;

use crate::error::ApiError;

/// Router fallback for unknown paths.
pub async fn not_found(uri: Uri) -> ApiError {
    tracing::debug!("No route for {}", uri.path());
    ApiError::not_found("Not found")
}

/// Method fallback for known paths.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
