// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::{GuardError, TokenError};
use crate::sheets::SheetsError;
use crate::store::StoreError;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized (missing/invalid token)";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        fields: Vec<String>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 405 Method Not Allowed
    MethodNotAllowed,

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed => 405,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::MethodNotAllowed => "Method not allowed",
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, fields } if !fields.is_empty() => json!({
                "ok": false,
                "message": message,
                "fields": fields,
            }),
            _ => json!({
                "ok": false,
                "message": self.message(),
            }),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, fields: Vec<String>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            fields,
        }
    }

    /// Validation failure about a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::validation_error(message, vec![field.to_string()])
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ApiError::not_found(msg),
            StoreError::Sheets(e) => e.into(),
            err @ StoreError::MissingColumn { .. } => {
                tracing::error!("Store error: {}", err);
                ApiError::internal_server_error(err.to_string())
            }
            err => {
                let fields = err.fields();
                ApiError::validation_error(err.to_string(), fields)
            }
        }
    }
}

impl From<SheetsError> for ApiError {
    fn from(err: SheetsError) -> Self {
        match err {
            SheetsError::TableNotFound(_) => ApiError::not_found(err.to_string()),
            err => {
                tracing::error!("Spreadsheet error: {}", err);
                ApiError::internal_server_error(err.to_string())
            }
        }
    }
}

impl From<GuardError> for ApiError {
    fn from(_: GuardError) -> Self {
        ApiError::unauthorized(UNAUTHORIZED_MESSAGE)
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        tracing::error!("Token signing failed: {}", err);
        ApiError::internal_server_error("Failed to sign token")
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let err: ApiError = StoreError::MissingFields(vec!["name".into()]).into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_json()["fields"], json!(["name"]));

        let err: ApiError = StoreError::not_found("Order not found").into();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_json(), json!({"ok": false, "message": "Order not found"}));

        let err: ApiError = StoreError::Sheets(SheetsError::TableNotFound("orders".into())).into();
        assert_eq!(err.status_code(), 404);

        let err: ApiError = StoreError::Sheets(SheetsError::ConfigMissing("GOOGLE_SHEETS_ID")).into();
        assert_eq!(err.status_code(), 500);
        assert!(err.message().contains("GOOGLE_SHEETS_ID"));

        let err: ApiError = StoreError::missing_column("service_order_shoes", "deleted").into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_json().get("fields").is_none());
    }

    #[test]
    fn envelope_omits_empty_field_lists() {
        let err = ApiError::validation_error("Missing query: id", Vec::new());
        assert_eq!(err.to_json(), json!({"ok": false, "message": "Missing query: id"}));
        assert_eq!(ApiError::MethodNotAllowed.status_code(), 405);
    }
}
