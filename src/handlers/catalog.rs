// handlers/catalog.rs - /api/:resource for the declarative resources
//
// GET lists (or fetches one with `?id=`), POST creates, PATCH and DELETE
// take the record id from `?id=`. Which of these need an admin credential
// is part of each resource's definition.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query},
    http::{request::Parts, Method},
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::resources::CatalogResource;
use crate::state::AppState;

type Params = HashMap<String, String>;

/// The resource named by the path, once the request has passed its access
/// rule. Resolved from the request head, so a rejected request is answered
/// before its body is read.
pub struct Admitted(pub CatalogResource);

#[async_trait]
impl FromRequestParts<AppState> for Admitted {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(path) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found("Not found"))?;
        let resource = state
            .catalog_resource(&path)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Not found"))?;

        let public = match parts.method {
            Method::GET => resource.def().public_reads,
            Method::POST => resource.def().public_create,
            _ => false,
        };
        if !public {
            state.guard.authorize(&parts.headers)?;
        }
        Ok(Admitted(resource))
    }
}

fn id_param(params: &Params) -> Option<&str> {
    params.get("id").map(|id| id.trim()).filter(|id| !id.is_empty())
}

fn require_id(params: &Params) -> Result<&str, ApiError> {
    id_param(params).ok_or_else(|| ApiError::bad_request("Missing query: id"))
}

/// GET /api/:resource[?id=]
pub async fn get(Admitted(resource): Admitted, Query(params): Query<Params>) -> ApiResult<Value> {
    if let Some(id) = id_param(&params) {
        return Ok(ApiResponse::success(resource.get(id).await?));
    }
    Ok(ApiResponse::success(Value::Array(resource.list(&params).await?)))
}

/// POST /api/:resource
pub async fn post(Admitted(resource): Admitted, JsonBody(body): JsonBody<Map<String, Value>>) -> ApiResult<Value> {
    Ok(ApiResponse::success(resource.create(&body).await?))
}

/// PATCH /api/:resource?id=
pub async fn patch(
    Admitted(resource): Admitted,
    Query(params): Query<Params>,
    JsonBody(body): JsonBody<Map<String, Value>>,
) -> ApiResult<Value> {
    let id = require_id(&params)?;
    Ok(ApiResponse::success(resource.update(id, &body).await?))
}

/// DELETE /api/:resource?id=
pub async fn delete(Admitted(resource): Admitted, Query(params): Query<Params>) -> ApiResult<Value> {
    let id = require_id(&params)?;
    resource.delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id })))
}
