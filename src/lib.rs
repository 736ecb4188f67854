pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod resources;
pub mod sheets;
pub mod state;
pub mod store;

use std::any::Any;

use axum::{
    http::{header, HeaderName, Method},
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::guard::ADMIN_TOKEN_HEADER;
use crate::error::ApiError;
use crate::state::AppState;

/// Builds the full router. Used by `serve` and by the integration tests.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(service_order_routes())
        .merge(shop_order_routes())
        .merge(catalog_routes())
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
}

/// Known path, unknown verb -> 405 envelope.
fn guarded(router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    router.fallback(handlers::method_not_allowed)
}

fn public_routes() -> Router<AppState> {
    use handlers::public;

    Router::new()
        .route("/", guarded(get(public::root)))
        .route("/api", guarded(get(public::root)))
        .route("/api/ping", guarded(get(public::ping)))
        .route("/health", guarded(get(public::health)))
        .route("/api/services", guarded(get(public::services)))
        .route("/api/login", guarded(post(public::login_post)))
}

fn service_order_routes() -> Router<AppState> {
    use handlers::service_orders as so;

    Router::new()
        .route("/api/service-orders", guarded(get(so::order_list).post(so::order_create)))
        // static segment wins over `:id`
        .route("/api/service-orders/track", guarded(get(so::order_track)))
        .route(
            "/api/service-orders/:id",
            guarded(get(so::order_get).patch(so::order_patch).delete(so::order_delete)),
        )
        .route("/api/service-orders/:id/shoes", guarded(post(so::shoe_create)))
        .route(
            "/api/service-orders/:id/shoes/:shoe_id",
            guarded(axum::routing::patch(so::shoe_patch).delete(so::shoe_delete)),
        )
}

fn shop_order_routes() -> Router<AppState> {
    use handlers::orders;

    Router::new()
        .route("/api/orders", guarded(get(orders::list).post(orders::create)))
        .route(
            "/api/orders/:id",
            guarded(get(orders::get).patch(orders::patch).delete(orders::delete)),
        )
}

fn catalog_routes() -> Router<AppState> {
    use handlers::catalog;

    Router::new().route(
        "/api/:resource",
        guarded(
            get(catalog::get)
                .post(catalog::post)
                .patch(catalog::patch)
                .delete(catalog::delete),
        ),
    )
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(ADMIN_TOKEN_HEADER),
        ])
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Handler panicked: {}", detail);
    ApiError::internal_server_error("Internal server error").into_response()
}
