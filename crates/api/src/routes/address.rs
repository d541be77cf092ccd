//! Route definitions for per-address listings, mounted at `/addresses`.

use axum::routing::get;
use axum::Router;

use crate::handlers::address;
use crate::state::AppState;

/// ```text
/// GET /{address}/collections   -> list_collections
/// GET /{address}/items         -> list_items
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{address}/collections", get(address::list_collections))
        .route("/{address}/items", get(address::list_items))
}
