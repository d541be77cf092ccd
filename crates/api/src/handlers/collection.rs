//! Handlers for collections.
//!
//! All endpoints require authentication via [`AuthUser`]; the caller's
//! address is what ownership and management are checked against.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use builder_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::services::collection::{CollectionInput, PublishInput};
use crate::services::{CollectionService, ItemService};
use crate::state::AppState;

/// GET /api/v1/collections/{id}
pub async fn get_collection(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let collection = CollectionService::get(&state, id, &auth.eth_address).await?;
    Ok(Json(DataResponse { data: collection }))
}

/// PUT /api/v1/collections/{id}
///
/// Create the collection or update it while it is still a draft.
pub async fn upsert_collection(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CollectionInput>,
) -> AppResult<impl IntoResponse> {
    let collection = CollectionService::upsert(&state, id, input, &auth.eth_address).await?;
    Ok(Json(DataResponse { data: collection }))
}

/// DELETE /api/v1/collections/{id}
pub async fn delete_collection(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    CollectionService::delete(&state, id, &auth.eth_address).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/collections/{id}/lock
pub async fn lock_collection(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let collection = CollectionService::lock(&state, id, &auth.eth_address).await?;
    Ok(Json(DataResponse { data: collection }))
}

/// POST /api/v1/collections/{id}/publish
///
/// Standard collections take an empty body. Third party collections name
/// the items to send to curation and carry a signed slot usage cheque.
pub async fn publish_collection(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let input: PublishInput = if body.is_empty() {
        PublishInput::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid publish body: {e}")))?
    };
    let outcome = CollectionService::publish(&state, id, input, &auth.eth_address).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// GET /api/v1/collections/{id}/approval-data
pub async fn get_approval_data(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let data = CollectionService::approval_data(&state, id, &auth.eth_address).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/collections/{id}/items
pub async fn list_collection_items(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let items = ItemService::list_by_collection(&state, id, &auth.eth_address).await?;
    Ok(Json(DataResponse { data: items }))
}
