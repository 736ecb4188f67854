mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use common::{TestApp, ADMIN_EMAIL, ADMIN_PASSWORD, SECRET};
use giaycung_api::auth::token::{sign, AdminClaims};

fn new_order() -> serde_json::Value {
    json!({ "customerName": "Nguyen Van A", "customerPhone": "0900000000" })
}

#[tokio::test]
async fn write_without_credential_is_rejected_before_any_write() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.anonymous(Method::POST, "/api/service-orders", Some(new_order())).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], false);
    assert_eq!(body["message"], "Unauthorized (missing/invalid token)");

    let (status, _) = app
        .anonymous(Method::POST, "/api/products", Some(json!({ "name": "Brush" })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.anonymous(Method::DELETE, "/api/orders/ORD-ABC123", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.sheets.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn wrong_secret_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let (status, _) = app
        .send(Method::POST, "/api/service-orders", Some(new_order()), Some("not-the-secret"))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.sheets.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn shared_secret_in_bearer_header_is_accepted() -> Result<()> {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/service-orders")
        .header(header::AUTHORIZATION, format!("Bearer {}", SECRET))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(new_order().to_string()))?;

    let (status, body) = app.request(request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["orderNumber"], "ORD-001");
    Ok(())
}

#[tokio::test]
async fn open_mode_allows_writes_without_credential() -> Result<()> {
    let app = TestApp::open();
    let (status, _) = app.anonymous(Method::POST, "/api/service-orders", Some(new_order())).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn login_issues_a_token_the_guard_accepts() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .anonymous(
            Method::POST,
            "/api/login",
            Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);
    assert_eq!(body["user"]["role"], "admin");

    let token = body["token"].as_str().unwrap_or_default().to_string();
    assert_eq!(token.split('.').count(), 3);

    let (status, body) = app
        .send(Method::POST, "/api/service-orders", Some(new_order()), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    Ok(())
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .anonymous(
            Method::POST,
            "/api/login",
            Some(json!({ "email": ADMIN_EMAIL, "password": "wrong" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], false);
    assert!(body.get("token").is_none());
    Ok(())
}

#[tokio::test]
async fn login_without_secret_configured_is_a_server_error() -> Result<()> {
    let app = TestApp::open();
    let (status, body) = app
        .anonymous(
            Method::POST,
            "/api/login",
            Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["ok"], false);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let past = chrono::Utc::now().timestamp_millis() - 60_000;
    let token = sign(&AdminClaims::admin(ADMIN_EMAIL, past), SECRET)?;

    let (status, _) = app
        .send(Method::POST, "/api/service-orders", Some(new_order()), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.sheets.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let future = chrono::Utc::now().timestamp_millis() + 60_000;
    let token = sign(&AdminClaims::admin(ADMIN_EMAIL, future), "some-other-secret")?;

    let (status, _) = app
        .send(Method::POST, "/api/service-orders", Some(new_order()), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
