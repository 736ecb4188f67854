#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use giaycung_api::config::{AppConfig, ShoeStorage};
use giaycung_api::sheets::{Grid, MemorySheets};
use giaycung_api::state::{memory_sheets, AppState};

pub const SECRET: &str = "test-admin-secret";
pub const ADMIN_EMAIL: &str = "admin@giaycung.test";
pub const ADMIN_PASSWORD: &str = "hunter2";

/// The router wired to an in-memory spreadsheet, plus a handle on that
/// spreadsheet for inspecting what was written.
pub struct TestApp {
    pub router: Router,
    pub sheets: Arc<MemorySheets>,
}

impl TestApp {
    /// Admin secret configured, joined shoe storage.
    pub fn new() -> Self {
        Self::with_config(config(Some(SECRET)))
    }

    /// No admin secret: every write is open.
    pub fn open() -> Self {
        Self::with_config(config(None))
    }

    pub fn embedded() -> Self {
        let mut config = config(Some(SECRET));
        config.service_orders.shoe_storage = ShoeStorage::Embedded;
        Self::with_config(config)
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_sheets(config, memory_sheets())
    }

    /// Admin secret configured, over a spreadsheet prepared by the caller
    /// (e.g. tabs seeded with an older header).
    pub fn seeded(sheets: MemorySheets) -> Self {
        Self::with_sheets(config(Some(SECRET)), sheets)
    }

    pub fn with_sheets(config: AppConfig, sheets: MemorySheets) -> Self {
        let sheets = Arc::new(sheets);
        let state = AppState::new(config, sheets.clone());
        Self {
            router: giaycung_api::app(state),
            sheets,
        }
    }

    pub async fn get(&self, uri: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        self.send(method, uri, body, Some(SECRET)).await
    }

    pub async fn anonymous(&self, method: Method, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        self.send(method, uri, body, None).await
    }

    /// Sends one request through the router; `credential` goes in `X-Admin-Token`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        credential: Option<&str>,
    ) -> Result<(StatusCode, Value)> {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(credential) = credential {
            request = request.header("x-admin-token", credential);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => request.body(Body::empty())?,
        };
        self.request(request).await
    }

    pub async fn request(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| {
                format!("response body is not JSON: {}", String::from_utf8_lossy(&bytes))
            })?
        };
        Ok((status, json))
    }
}

fn config(secret: Option<&str>) -> AppConfig {
    let mut config = AppConfig::for_memory(secret);
    config.security.admin_email = Some(ADMIN_EMAIL.to_string());
    config.security.admin_password = Some(ADMIN_PASSWORD.to_string());
    config
}

/// A grid from literal cells, header first.
pub fn grid(rows: &[&[&str]]) -> Grid {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}
