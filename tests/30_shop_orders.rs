mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::TestApp;

fn checkout() -> Value {
    json!({
        "customerName": "Tran Thi B",
        "customerPhone": "0911111111",
        "customerAddress": "12 Le Loi, Q1",
        "items": [
            { "productId": "prd_1", "productName": "Shoe cleaner", "quantity": 2, "price": 45000 },
            { "productName": "Laces", "quantity": "1", "price": "15000" },
        ],
    })
}

#[tokio::test]
async fn checkout_is_public_and_totals_the_items() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.anonymous(Method::POST, "/api/orders", Some(checkout())).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let order = &body["data"];
    assert!(order["id"].as_str().is_some_and(|id| id.starts_with("ORD-")));
    assert_eq!(order["status"], "pending");
    assert_eq!(order["totalAmount"].as_f64(), Some(105000.0));
    assert_eq!(order["items"].as_array().map(Vec::len), Some(2));

    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap_or_default());
    let (status, body) = app.get(&uri).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["productName"], "Shoe cleaner");
    assert_eq!(body["data"]["items"][1]["quantity"].as_f64(), Some(1.0));

    // parent row plus one row per item, each table also got its header
    let items = app.sheets.grid("order_items").await.unwrap_or_default();
    assert_eq!(items.len(), 3);
    Ok(())
}

#[tokio::test]
async fn checkout_without_items_writes_nothing() -> Result<()> {
    let app = TestApp::new();
    let mut body = checkout();
    body["items"] = json!([{ "productName": "Laces", "quantity": 0, "price": 1000 }]);

    let (status, body) = app.anonymous(Method::POST, "/api/orders", Some(body)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"], json!(["items"]));

    let (status, body) = app
        .anonymous(Method::POST, "/api/orders", Some(json!({ "customerName": "B" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"], json!(["customerPhone", "customerAddress"]));

    assert_eq!(app.sheets.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn status_changes_are_validated_and_admin_only() -> Result<()> {
    let app = TestApp::new();
    let (_, body) = app.anonymous(Method::POST, "/api/orders", Some(checkout())).await?;
    let uri = format!("/api/orders/{}", body["data"]["id"].as_str().unwrap_or_default());

    let (status, _) = app
        .anonymous(Method::PATCH, &uri, Some(json!({ "status": "completed" })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.admin(Method::PATCH, &uri, Some(json!({ "status": "shipped" }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"], json!(["status"]));

    let (status, body) = app.admin(Method::PATCH, &uri, Some(json!({ "status": "processing" }))).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "processing");
    assert_eq!(body["data"]["customerName"], "Tran Thi B");
    Ok(())
}

#[tokio::test]
async fn cancelled_orders_leave_the_list() -> Result<()> {
    let app = TestApp::new();
    let (_, first) = app.anonymous(Method::POST, "/api/orders", Some(checkout())).await?;
    let (_, second) = app.anonymous(Method::POST, "/api/orders", Some(checkout())).await?;
    let first_id = first["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, body) = app.admin(Method::DELETE, &format!("/api/orders/{}", first_id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], first_id.as_str());

    let (_, body) = app.get("/api/orders").await?;
    let ids: Vec<&str> = body["data"]
        .as_array()
        .map(|orders| orders.iter().filter_map(|o| o["id"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec![second["data"]["id"].as_str().unwrap_or_default()]);

    let (status, _) = app.get(&format!("/api/orders/{}", first_id)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
