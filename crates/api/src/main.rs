use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use builder_core::committee::{Clock, CommitteeCache, SystemClock};
use builder_remote::{GraphQlSubgraph, HttpCatalyst, JsonRpcChain, S3ObjectStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use builder_api::config::ServerConfig;
use builder_api::router::build_app_router;
use builder_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "builder_api=debug,builder_remote=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        network = %config.network.as_str(),
        chain_id = config.chain_id,
        "Loaded server configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = builder_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    builder_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    builder_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Remote collaborators ---
    let remote_timeout = Duration::from_secs(config.remote_timeout_secs);
    let subgraph = GraphQlSubgraph::new(
        config.collections_subgraph_url.clone(),
        config.third_party_subgraph_url.clone(),
        remote_timeout,
    )
    .expect("Failed to build subgraph client");
    let chain = JsonRpcChain::new(config.chain_rpc_url.clone(), remote_timeout)
        .expect("Failed to build chain RPC client");
    let catalyst = HttpCatalyst::new(config.catalyst_url.clone(), remote_timeout)
        .expect("Failed to build catalyst client");
    let objects = S3ObjectStore::from_env(config.s3_bucket.clone(), remote_timeout).await;
    tracing::info!(bucket = %config.s3_bucket, "Remote clients ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let committee = CommitteeCache::new(
        Duration::from_secs(config.committee_cache_ttl_secs),
        Arc::clone(&clock),
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        subgraph: Arc::new(subgraph),
        chain: Arc::new(chain),
        catalyst: Arc::new(catalyst),
        objects: Arc::new(objects),
        committee: Arc::new(committee),
        clock,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
