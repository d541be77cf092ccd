//! Handlers for items.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use builder_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::services::item::{ItemInput, ItemRef};
use crate::services::ItemService;
use crate::state::AppState;

/// GET /api/v1/items/{id}
pub async fn get_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let item = ItemService::get(&state, id, &auth.eth_address).await?;
    Ok(Json(DataResponse { data: item }))
}

/// PUT /api/v1/items/{id}
///
/// `{id}` is either the item id or, for an existing third party item, its
/// full URN.
pub async fn upsert_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(target): Path<String>,
    Json(input): Json<ItemInput>,
) -> AppResult<impl IntoResponse> {
    let item = ItemService::upsert(&state, ItemRef::parse(&target), input, &auth.eth_address).await?;
    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/v1/items/{id}
pub async fn delete_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ItemService::delete(&state, id, &auth.eth_address).await?;
    Ok(StatusCode::NO_CONTENT)
}
