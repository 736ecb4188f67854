// handlers/orders.rs - /api/orders (storefront checkout)

use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, JsonBody, RequireAdmin};
use crate::resources::normalize::opt_text;
use crate::resources::orders::{Checkout, ShopOrder};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StatusChange {
    #[serde(default, deserialize_with = "opt_text")]
    pub status: Option<String>,
}

/// GET /api/orders
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ShopOrder>> {
    Ok(ApiResponse::success(state.orders.list().await?))
}

/// GET /api/orders/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ShopOrder> {
    Ok(ApiResponse::success(state.orders.get(&id).await?))
}

/// POST /api/orders - public checkout
pub async fn create(State(state): State<AppState>, JsonBody(body): JsonBody<Checkout>) -> ApiResult<ShopOrder> {
    Ok(ApiResponse::created(state.orders.checkout(body).await?))
}

/// PATCH /api/orders/:id - status only
pub async fn patch(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StatusChange>,
) -> ApiResult<ShopOrder> {
    Ok(ApiResponse::success(state.orders.set_status(&id, body.status.as_deref()).await?))
}

/// DELETE /api/orders/:id - marks the order cancelled
pub async fn delete(State(state): State<AppState>, _admin: RequireAdmin, Path(id): Path<String>) -> ApiResult<Value> {
    state.orders.cancel(&id).await?;
    Ok(ApiResponse::success(json!({ "id": id })))
}
