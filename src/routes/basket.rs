use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    dto::basket::{AddToBasketRequest, BasketList, RemoveFromBasketRequest},
    error::AppResult,
    middleware::auth::Identity,
    models::BasketLine,
    response::ApiResponse,
    services::basket_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/basket/", get(basket_list).post(add_to_basket))
        .route("/basket/{id}/", delete(remove_from_basket))
}

#[utoipa::path(
    get,
    path = "/api/basket/",
    responses(
        (status = 200, description = "Lines of the caller's active order", body = ApiResponse<BasketList>)
    ),
    security(("bearer_auth" = []), ("session_token" = [])),
    tag = "Basket"
)]
pub async fn basket_list(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<ApiResponse<BasketList>>> {
    let resp = basket_service::get_basket(&state, &identity).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/basket/",
    request_body = AddToBasketRequest,
    responses(
        (status = 200, description = "Line added or quantity increased", body = ApiResponse<BasketLine>),
        (status = 400, description = "Invalid count"),
        (status = 404, description = "Item not found or not orderable"),
    ),
    security(("bearer_auth" = []), ("session_token" = [])),
    tag = "Basket"
)]
pub async fn add_to_basket(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<AddToBasketRequest>,
) -> AppResult<Json<ApiResponse<BasketLine>>> {
    let resp = basket_service::add_to_basket(&state, &identity, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/basket/{id}/",
    params(
        ("id" = Uuid, Path, description = "Menu item ID")
    ),
    request_body = RemoveFromBasketRequest,
    responses(
        (status = 200, description = "Remaining basket lines", body = ApiResponse<BasketList>),
        (status = 404, description = "Item is not in the basket"),
        (status = 409, description = "No active order"),
    ),
    security(("bearer_auth" = []), ("session_token" = [])),
    tag = "Basket"
)]
pub async fn remove_from_basket(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<RemoveFromBasketRequest>,
) -> AppResult<Json<ApiResponse<BasketList>>> {
    let resp = basket_service::remove_from_basket(&state, &identity, id, payload).await?;
    Ok(Json(resp))
}
