use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody, RequireAdmin};
use crate::resources::service_orders::{NewServiceOrder, ServiceOrder, ServiceOrderPatch};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackQuery {
    pub order: Option<String>,
    pub order_number: Option<String>,
    pub code: Option<String>,
}

impl TrackQuery {
    /// First non-blank of `order`, `orderNumber`, `code`.
    fn code(&self) -> Option<&str> {
        [&self.order, &self.order_number, &self.code]
            .into_iter()
            .filter_map(|v| v.as_deref().map(str::trim))
            .find(|v| !v.is_empty())
    }
}

/// GET /api/service-orders - all orders, newest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ServiceOrder>> {
    Ok(ApiResponse::keyed("orders", state.service_orders.list().await?))
}

/// GET /api/service-orders/track?order=ORD-001
pub async fn track(State(state): State<AppState>, Query(query): Query<TrackQuery>) -> ApiResult<ServiceOrder> {
    let code = query
        .code()
        .ok_or_else(|| ApiError::bad_request("Missing query: order / orderNumber"))?;
    Ok(ApiResponse::keyed("order", state.service_orders.track(code).await?))
}

/// GET /api/service-orders/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ServiceOrder> {
    Ok(ApiResponse::keyed("order", state.service_orders.get(&id).await?))
}

/// POST /api/service-orders
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    JsonBody(body): JsonBody<NewServiceOrder>,
) -> ApiResult<ServiceOrder> {
    Ok(ApiResponse::success(state.service_orders.create(body).await?))
}

/// PATCH /api/service-orders/:id
pub async fn patch(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ServiceOrderPatch>,
) -> ApiResult<ServiceOrder> {
    Ok(ApiResponse::success(state.service_orders.update(&id, body).await?))
}

/// DELETE /api/service-orders/:id - soft delete
pub async fn delete(State(state): State<AppState>, _admin: RequireAdmin, Path(id): Path<String>) -> ApiResult<Value> {
    state.service_orders.delete(&id).await?;
    Ok(ApiResponse::success(json!({ "id": id })))
}
