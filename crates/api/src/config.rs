use builder_core::content_hash::EmoteFormat;
use builder_core::urn::Network;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Bind and timeout settings have defaults suitable for local development;
/// the remote collaborator endpoints must always be provided.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Timeout applied to every remote call, S3 included (default: `10`).
    pub remote_timeout_secs: u64,
    /// Network segment of standard collection URNs (default: `amoy`).
    pub network: Network,
    /// Chain id used as the salt of the cheque signing domain (default: `80002`).
    pub chain_id: u64,
    /// Third party registry contract, the cheque verifying contract.
    pub third_party_registry_address: String,
    pub collections_subgraph_url: String,
    pub third_party_subgraph_url: String,
    /// JSON-RPC endpoint of the chain collections are deployed on.
    pub chain_rpc_url: String,
    pub catalyst_url: String,
    pub s3_bucket: String,
    /// Hash emotes with the ADR-74 metadata shape (default: `false`).
    pub emotes_v2_enabled: bool,
    /// Lifetime of the committee member list in seconds (default: `3600`).
    pub committee_cache_ttl_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
}

fn required(name: &str) -> String {
    let value = std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"));
    assert!(!value.trim().is_empty(), "{name} must not be empty");
    value
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                    |
    /// |--------------------------------|----------------------------|
    /// | `HOST`                         | `0.0.0.0`                  |
    /// | `PORT`                         | `3000`                     |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                       |
    /// | `REMOTE_TIMEOUT_SECS`          | `10`                       |
    /// | `CHAIN_NETWORK`                | `amoy`                     |
    /// | `CHAIN_ID`                     | `80002`                    |
    /// | `THIRD_PARTY_REGISTRY_ADDRESS` | required                   |
    /// | `COLLECTIONS_SUBGRAPH_URL`     | required                   |
    /// | `THIRD_PARTY_SUBGRAPH_URL`     | required                   |
    /// | `CHAIN_RPC_URL`                | required                   |
    /// | `CATALYST_URL`                 | required                   |
    /// | `S3_BUCKET`                    | required                   |
    /// | `EMOTES_V2_ENABLED`            | `false`                    |
    /// | `COMMITTEE_CACHE_TTL_SECS`     | `3600`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let remote_timeout_secs: u64 = std::env::var("REMOTE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("REMOTE_TIMEOUT_SECS must be a valid u64");

        let network: Network = std::env::var("CHAIN_NETWORK")
            .unwrap_or_else(|_| "amoy".into())
            .parse()
            .expect("CHAIN_NETWORK must be a known network");

        let chain_id: u64 = std::env::var("CHAIN_ID")
            .unwrap_or_else(|_| "80002".into())
            .parse()
            .expect("CHAIN_ID must be a valid u64");

        let emotes_v2_enabled: bool = std::env::var("EMOTES_V2_ENABLED")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("EMOTES_V2_ENABLED must be true or false");

        let committee_cache_ttl_secs: u64 = std::env::var("COMMITTEE_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("COMMITTEE_CACHE_TTL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            remote_timeout_secs,
            network,
            chain_id,
            third_party_registry_address: required("THIRD_PARTY_REGISTRY_ADDRESS"),
            collections_subgraph_url: required("COLLECTIONS_SUBGRAPH_URL"),
            third_party_subgraph_url: required("THIRD_PARTY_SUBGRAPH_URL"),
            chain_rpc_url: required("CHAIN_RPC_URL"),
            catalyst_url: required("CATALYST_URL"),
            s3_bucket: required("S3_BUCKET"),
            emotes_v2_enabled,
            committee_cache_ttl_secs,
            jwt: JwtConfig::from_env(),
        }
    }

    pub fn emote_format(&self) -> EmoteFormat {
        EmoteFormat::from_flag(self.emotes_v2_enabled)
    }
}
