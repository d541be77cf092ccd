//! Handlers for per-address listings.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::services::{CollectionService, ItemService};
use crate::state::AppState;

/// GET /api/v1/addresses/{address}/collections
///
/// Collections the address created plus those of the third parties it
/// manages, consolidated with the subgraph.
pub async fn list_collections(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> AppResult<impl IntoResponse> {
    let collections = CollectionService::list_by_owner(&state, &address).await?;
    Ok(Json(DataResponse { data: collections }))
}

/// GET /api/v1/addresses/{address}/items
///
/// Only the address itself and committee members may list its items.
pub async fn list_items(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> AppResult<impl IntoResponse> {
    let items = ItemService::list_by_owner(&state, &address, &auth.eth_address).await?;
    Ok(Json(DataResponse { data: items }))
}
