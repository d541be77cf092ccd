use std::sync::Arc;

use builder_core::committee::{Clock, CommitteeCache};
use builder_remote::{CatalystReader, ChainReader, ObjectStore, SubgraphReader};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: builder_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Collections and third party subgraphs.
    pub subgraph: Arc<dyn SubgraphReader>,
    /// Chain RPC, for contracts the subgraph has not indexed yet.
    pub chain: Arc<dyn ChainReader>,
    /// Catalyst peer.
    pub catalyst: Arc<dyn CatalystReader>,
    /// Uploaded item contents.
    pub objects: Arc<dyn ObjectStore>,
    /// Curation committee members, refreshed from the subgraph.
    pub committee: Arc<CommitteeCache>,
    /// Source of "now" for lock windows.
    pub clock: Arc<dyn Clock>,
}
