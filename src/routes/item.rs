use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};
use uuid::Uuid;

use crate::{
    dto::menu::{ArchiveItemRequest, CreateMenuItemRequest, UpdateMenuItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::MenuItem,
    response::ApiResponse,
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/item/", post(create_item).delete(archive_item))
        .route("/item/{id}/", put(update_item))
}

#[utoipa::path(
    post,
    path = "/api/item/",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<MenuItem>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Staff only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateMenuItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<MenuItem>>)> {
    let resp = catalog_service::create_item(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/item/{id}/",
    params(
        ("id" = Uuid, Path, description = "Menu item ID")
    ),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<MenuItem>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Menu item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMenuItemRequest>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = catalog_service::update_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/item/",
    request_body = ArchiveItemRequest,
    responses(
        (status = 200, description = "Item archived", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Menu item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn archive_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ArchiveItemRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::archive_item(&state, &user, payload).await?;
    Ok(Json(resp))
}
