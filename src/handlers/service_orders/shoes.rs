use axum::extract::{Path, State};
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, JsonBody, RequireAdmin};
use crate::resources::service_orders::{NewShoe, Shoe, ShoePatch};
use crate::state::AppState;

/// POST /api/service-orders/:id/shoes
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(order_id): Path<String>,
    JsonBody(body): JsonBody<NewShoe>,
) -> ApiResult<Shoe> {
    Ok(ApiResponse::success(state.service_orders.add_shoe(&order_id, body).await?))
}

/// PATCH /api/service-orders/:id/shoes/:shoe_id
pub async fn patch(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path((order_id, shoe_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<ShoePatch>,
) -> ApiResult<Shoe> {
    Ok(ApiResponse::success(
        state.service_orders.update_shoe(&order_id, &shoe_id, body).await?,
    ))
}

/// DELETE /api/service-orders/:id/shoes/:shoe_id
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path((order_id, shoe_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    state.service_orders.remove_shoe(&order_id, &shoe_id).await?;
    Ok(ApiResponse::success(json!({ "id": shoe_id, "orderId": order_id })))
}
