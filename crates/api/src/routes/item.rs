//! Route definitions for items, mounted at `/items`.

use axum::routing::get;
use axum::Router;

use crate::handlers::item;
use crate::state::AppState;

/// ```text
/// GET    /{id}   -> get_item
/// PUT    /{id}   -> upsert_item (id or third party URN)
/// DELETE /{id}   -> delete_item
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        get(item::get_item)
            .put(item::upsert_item)
            .delete(item::delete_item),
    )
}
