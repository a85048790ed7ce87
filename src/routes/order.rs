use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::orders::{OrderDetailsRequest, OrderList, OrderReceipt, OrderWithLines},
    error::AppResult,
    middleware::auth::Identity,
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/order/", get(list_orders).post(finalize_order))
        .route("/order/{id}/", get(get_order).post(attach_details))
}

#[utoipa::path(
    get,
    path = "/api/order/",
    responses(
        (status = 200, description = "Caller's orders, newest first", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = []), ("session_token" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &identity).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/order/",
    responses(
        (status = 200, description = "Active order finalized", body = ApiResponse<OrderReceipt>),
        (status = 409, description = "No active order"),
    ),
    security(("bearer_auth" = []), ("session_token" = [])),
    tag = "Orders"
)]
pub async fn finalize_order(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<ApiResponse<OrderReceipt>>> {
    let resp = order_service::finalize_order(&state, &identity).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/order/{id}/",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with its lines", body = ApiResponse<OrderWithLines>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = []), ("session_token" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithLines>>> {
    let resp = order_service::get_order(&state, &identity, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/order/{id}/",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = OrderDetailsRequest,
    responses(
        (status = 200, description = "Details recorded", body = ApiResponse<OrderReceipt>),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not awaiting details"),
    ),
    security(("bearer_auth" = []), ("session_token" = [])),
    tag = "Orders"
)]
pub async fn attach_details(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderDetailsRequest>,
) -> AppResult<Json<ApiResponse<OrderReceipt>>> {
    let resp = order_service::attach_details(&state, &identity, id, payload).await?;
    Ok(Json(resp))
}
