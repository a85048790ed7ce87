use axum::{
    Json, Router,
    http::{HeaderName, StatusCode, Uri},
    middleware::from_fn,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    middleware::session::{SESSION_HEADER, ensure_session},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub mod auth;
pub mod basket;
pub mod doc;
pub mod health;
pub mod item;
pub mod menu;
pub mod order;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(basket::router())
        .merge(order::router())
        .merge(menu::router())
        .merge(item::router())
        .nest("/auth", auth::router())
}

/// Full application router with session issuing and CORS applied.
/// Transport layers (tracing, request ids, limits) are added by the binary.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .layer(from_fn(ensure_session))
        .layer(cors)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
