use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::menu::{CategoryList, MenuList, MenuQuery, TagList},
    error::AppResult,
    models::MenuItem,
    response::ApiResponse,
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/menu/", get(list_menu))
        .route("/menu/{id}/", get(get_menu_item))
        .route("/category/", get(list_categories))
        .route("/tags/", get(list_tags))
}

#[utoipa::path(
    get,
    path = "/api/menu/",
    params(MenuQuery),
    responses(
        (status = 200, description = "Orderable menu items", body = ApiResponse<MenuList>),
        (status = 404, description = "Unknown category"),
    ),
    tag = "Menu"
)]
pub async fn list_menu(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> AppResult<Json<ApiResponse<MenuList>>> {
    let resp = catalog_service::list_menu(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/menu/{id}/",
    params(
        ("id" = Uuid, Path, description = "Menu item ID")
    ),
    responses(
        (status = 200, description = "Menu item", body = ApiResponse<MenuItem>),
        (status = 404, description = "Menu item not found"),
    ),
    tag = "Menu"
)]
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = catalog_service::get_menu_item(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/category/",
    responses(
        (status = 200, description = "Categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Menu"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = catalog_service::list_categories(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tags/",
    responses(
        (status = 200, description = "Tags", body = ApiResponse<TagList>)
    ),
    tag = "Menu"
)]
pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<ApiResponse<TagList>>> {
    let resp = catalog_service::list_tags(&state).await?;
    Ok(Json(resp))
}
