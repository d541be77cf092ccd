pub mod address;
pub mod collection;
pub mod health;
pub mod item;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /collections/{id}                                get, upsert (PUT), delete
/// /collections/{id}/lock                           start the lock window (POST)
/// /collections/{id}/publish                        publish (POST)
/// /collections/{id}/approval-data                  cheque and curation snapshot
/// /collections/{id}/items                          consolidated items
///
/// /items/{id}                                      get, upsert (PUT, id or URN), delete
///
/// /addresses/{address}/collections                 owned and managed collections
/// /addresses/{address}/items                       owned and managed items
/// ```
///
/// Every route requires a Bearer token; `/health` lives outside this tree.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/collections", collection::router())
        .nest("/items", item::router())
        .nest("/addresses", address::router())
}
