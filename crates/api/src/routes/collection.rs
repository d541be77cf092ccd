//! Route definitions for collections, mounted at `/collections`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::collection;
use crate::state::AppState;

/// ```text
/// GET    /{id}                 -> get_collection
/// PUT    /{id}                 -> upsert_collection
/// DELETE /{id}                 -> delete_collection
/// POST   /{id}/lock            -> lock_collection
/// POST   /{id}/publish         -> publish_collection
/// GET    /{id}/approval-data   -> get_approval_data
/// GET    /{id}/items           -> list_collection_items
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(collection::get_collection)
                .put(collection::upsert_collection)
                .delete(collection::delete_collection),
        )
        .route("/{id}/lock", post(collection::lock_collection))
        .route("/{id}/publish", post(collection::publish_collection))
        .route("/{id}/approval-data", get(collection::get_approval_data))
        .route("/{id}/items", get(collection::list_collection_items))
}
