use axum::response::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult};
use crate::resources::{ServiceOffer, SERVICE_OFFERS};

/// GET / and GET /api
pub async fn root() -> Json<Value> {
    Json(json!({
        "ok": true,
        "message": "api index",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/ping
pub async fn ping() -> Json<Value> {
    Json(json!({
        "ok": true,
        "message": "pong",
        "time": Utc::now().to_rfc3339(),
    }))
}

/// GET /health
pub async fn health() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": Utc::now(),
    })))
}

/// GET /api/services - fixed price list
pub async fn services() -> ApiResult<[ServiceOffer; 2]> {
    Ok(ApiResponse::success(SERVICE_OFFERS))
}
