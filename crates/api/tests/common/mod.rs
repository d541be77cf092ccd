#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use k256::ecdsa::SigningKey;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use builder_api::auth::jwt::{generate_access_token, JwtConfig};
use builder_api::config::ServerConfig;
use builder_api::router::build_app_router;
use builder_api::state::AppState;
use builder_core::cheque::{
    address_from_verifying_key, cheque_message_hash, to_hex_prefixed, SlotUsageCheque,
};
use builder_core::collection::{CollectionKind, StandardCollection, ThirdPartyCollection};
use builder_core::committee::{Clock, CommitteeCache, SystemClock};
use builder_core::fragments::{
    CatalystEntity, CollectionFragment, ItemFragment, ThirdPartyFragment, ThirdPartyItemFragment,
};
use builder_core::types::{normalize_address, DbId};
use builder_core::urn::Network;
use builder_db::models::collection::UpsertCollection;
use builder_db::repositories::CollectionRepo;
use builder_remote::{CatalystReader, ChainReader, ObjectStore, RemoteError, SubgraphReader};

pub const OWNER: &str = "0x1111111111111111111111111111111111111111";
pub const STRANGER: &str = "0x2222222222222222222222222222222222222222";
pub const COMMITTEE_MEMBER: &str = "0x3333333333333333333333333333333333333333";
pub const CONTRACT: &str = "0xabc0000000000000000000000000000000000001";
pub const TP_ID: &str = "urn:decentraland:amoy:collections-thirdparty:crypto-motors";
pub const REGISTRY: &str = "0x1C436C1EFb4608dFfDC8bace99d2B03c314f3348";
pub const CHAIN_ID: u64 = 80002;
pub const SALT: &str = "0x0000000000000000000000000000000000000000000000000000000000000abc";
pub const THUMBNAIL_HASH: &str = "bafkreithumbnail";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// In-memory subgraph. Tests mutate the fields to shape the chain state.
#[derive(Default)]
pub struct FakeSubgraph {
    pub collections: Mutex<Vec<CollectionFragment>>,
    pub items: Mutex<Vec<ItemFragment>>,
    pub committee: Mutex<Vec<String>>,
    pub third_parties: Mutex<Vec<ThirdPartyFragment>>,
    pub tp_items: Mutex<Vec<ThirdPartyItemFragment>>,
    pub receipts: Mutex<HashSet<String>>,
}

impl FakeSubgraph {
    pub fn add_third_party(&self, id: &str, managers: &[&str], max_items: u64) {
        self.third_parties.lock().unwrap().push(ThirdPartyFragment {
            id: id.to_string(),
            name: Some("Crypto Motors".into()),
            managers: managers.iter().map(|m| normalize_address(m)).collect(),
            max_items: max_items.to_string(),
            is_approved: true,
        });
    }

    /// Index a deployed standard collection and its first `items` items.
    pub fn deploy_collection(&self, contract: &str, creator: &str, items: usize) {
        let contract = normalize_address(contract);
        self.collections.lock().unwrap().push(CollectionFragment {
            id: contract.clone(),
            creator: normalize_address(creator),
            name: "Deployed".into(),
            urn: format!("urn:decentraland:amoy:collections-v2:{contract}"),
            is_approved: false,
            minters: vec![],
            managers: vec![],
            reviewed_at: None,
            created_at: "1700000000".into(),
            updated_at: "1700000000".into(),
        });
        let mut remote_items = self.items.lock().unwrap();
        for index in 0..items {
            remote_items.push(ItemFragment {
                id: format!("{contract}-{index}"),
                collection_address: contract.clone(),
                blockchain_id: index.to_string(),
                urn: format!("urn:decentraland:amoy:collections-v2:{contract}:{index}"),
                price: "1000000000000000000".into(),
                beneficiary: normalize_address(creator),
                total_supply: "0".into(),
                content_hash: None,
                rarity: Some("rare".into()),
                is_approved: false,
                created_at: "1700000000".into(),
                updated_at: "1700000000".into(),
                reviewed_at: None,
            });
        }
    }
}

#[async_trait]
impl SubgraphReader for FakeSubgraph {
    async fn collection(
        &self,
        contract_address: &str,
    ) -> Result<Option<CollectionFragment>, RemoteError> {
        let address = normalize_address(contract_address);
        Ok(self
            .collections
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == address)
            .cloned())
    }

    async fn collections(
        &self,
        contract_addresses: &[String],
    ) -> Result<Vec<CollectionFragment>, RemoteError> {
        let wanted: HashSet<String> = contract_addresses.iter().map(|a| normalize_address(a)).collect();
        Ok(self
            .collections
            .lock()
            .unwrap()
            .iter()
            .filter(|c| wanted.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn collection_items(
        &self,
        contract_address: &str,
    ) -> Result<Vec<ItemFragment>, RemoteError> {
        let address = normalize_address(contract_address);
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.collection_address == address)
            .cloned()
            .collect())
    }

    async fn committee_members(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self.committee.lock().unwrap().clone())
    }

    async fn third_party(
        &self,
        third_party_id: &str,
    ) -> Result<Option<ThirdPartyFragment>, RemoteError> {
        Ok(self
            .third_parties
            .lock()
            .unwrap()
            .iter()
            .find(|tp| tp.id == third_party_id)
            .cloned())
    }

    async fn third_parties_by_manager(
        &self,
        manager: &str,
    ) -> Result<Vec<ThirdPartyFragment>, RemoteError> {
        Ok(self
            .third_parties
            .lock()
            .unwrap()
            .iter()
            .filter(|tp| tp.is_manager(manager))
            .cloned()
            .collect())
    }

    async fn third_party_items(
        &self,
        collection_urn: &str,
    ) -> Result<Vec<ThirdPartyItemFragment>, RemoteError> {
        let prefix = format!("{collection_urn}:");
        Ok(self
            .tp_items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.urn.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn last_third_party_item(
        &self,
        collection_urn: &str,
    ) -> Result<Option<ThirdPartyItemFragment>, RemoteError> {
        let items = self.third_party_items(collection_urn).await?;
        Ok(items.into_iter().max_by(|a, b| a.updated_at.cmp(&b.updated_at)))
    }

    async fn receipt_exists(&self, message_hash: &str) -> Result<bool, RemoteError> {
        Ok(self.receipts.lock().unwrap().contains(message_hash))
    }
}

#[derive(Default)]
pub struct FakeCatalyst {
    pub entities: Mutex<Vec<CatalystEntity>>,
}

impl FakeCatalyst {
    pub fn deploy(&self, urn: &str) {
        self.entities.lock().unwrap().push(CatalystEntity {
            id: "bafkreientity".into(),
            pointers: vec![urn.to_string()],
            timestamp: 1_700_000_000_000,
            content: vec![],
            metadata: json!({ "id": urn }),
        });
    }
}

#[async_trait]
impl CatalystReader for FakeCatalyst {
    async fn entities_by_pointers(
        &self,
        pointers: &[String],
    ) -> Result<Vec<CatalystEntity>, RemoteError> {
        Ok(self
            .entities
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.pointers.iter().any(|p| pointers.contains(p)))
            .cloned()
            .collect())
    }
}

/// Chain with bytecode at the addresses passed to [`FakeChain::deploy_bytecode`].
#[derive(Default)]
pub struct FakeChain {
    pub deployed: Mutex<HashSet<String>>,
}

impl FakeChain {
    pub fn deploy_bytecode(&self, address: &str) {
        self.deployed.lock().unwrap().insert(normalize_address(address));
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn has_code(&self, address: &str) -> Result<bool, RemoteError> {
        Ok(self.deployed.lock().unwrap().contains(&normalize_address(address)))
    }
}

/// Object store that knows the thumbnail hash used by [`item_body`].
pub struct FakeObjectStore {
    pub uploaded: Mutex<HashSet<String>>,
}

impl Default for FakeObjectStore {
    fn default() -> Self {
        Self {
            uploaded: Mutex::new(HashSet::from([THUMBNAIL_HASH.to_string()])),
        }
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn exists(&self, hash: &str) -> Result<bool, RemoteError> {
        Ok(self.uploaded.lock().unwrap().contains(hash))
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        remote_timeout_secs: 5,
        network: Network::Amoy,
        chain_id: CHAIN_ID,
        third_party_registry_address: REGISTRY.to_string(),
        collections_subgraph_url: "http://subgraph.test/collections".to_string(),
        third_party_subgraph_url: "http://subgraph.test/third-parties".to_string(),
        chain_rpc_url: "http://chain.test".to_string(),
        catalyst_url: "http://catalyst.test".to_string(),
        s3_bucket: "builder-test".to_string(),
        emotes_v2_enabled: false,
        committee_cache_ttl_secs: 60,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// The router plus handles on the fakes behind it.
pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub subgraph: Arc<FakeSubgraph>,
    pub chain: Arc<FakeChain>,
    pub catalyst: Arc<FakeCatalyst>,
    pub objects: Arc<FakeObjectStore>,
}

impl TestApp {
    /// A fresh handle on the router for a single `oneshot` call.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool and in-memory remote collaborators.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let config = test_config();
    let subgraph = Arc::new(FakeSubgraph::default());
    let chain = Arc::new(FakeChain::default());
    let catalyst = Arc::new(FakeCatalyst::default());
    let objects = Arc::new(FakeObjectStore::default());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        subgraph: subgraph.clone(),
        chain: chain.clone(),
        catalyst: catalyst.clone(),
        objects: objects.clone(),
        committee: Arc::new(CommitteeCache::new(Duration::from_secs(60), Arc::clone(&clock))),
        clock,
    };

    TestApp {
        router: build_app_router(state, &config),
        pool,
        subgraph,
        chain,
        catalyst,
        objects,
    }
}

pub fn token_for(address: &str) -> String {
    generate_access_token(address, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    caller: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(caller)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, caller: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(caller), None).await
}

pub async fn put_json(app: Router, uri: &str, caller: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(caller), Some(body)).await
}

pub async fn post_json(app: Router, uri: &str, caller: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(caller), Some(body)).await
}

pub async fn delete(app: Router, uri: &str, caller: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(caller), None).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn seed_standard_collection(pool: &PgPool, name: &str, contract: Option<&str>) -> DbId {
    let input = UpsertCollection {
        id: DbId::new_v4(),
        name: name.to_string(),
        eth_address: OWNER.to_string(),
        kind: CollectionKind::Standard(StandardCollection {
            contract_address: contract.map(normalize_address),
            salt: None,
        }),
        minters: vec![],
        managers: vec![],
    };
    CollectionRepo::upsert(pool, &input).await.unwrap().id
}

pub async fn seed_tp_collection(pool: &PgPool, owner: &str, urn_suffix: &str) -> DbId {
    let input = UpsertCollection {
        id: DbId::new_v4(),
        name: format!("Third party {urn_suffix}"),
        eth_address: normalize_address(owner),
        kind: CollectionKind::ThirdParty(ThirdPartyCollection {
            third_party_id: TP_ID.to_string(),
            urn_suffix: urn_suffix.to_string(),
        }),
        minters: vec![],
        managers: vec![],
    };
    CollectionRepo::upsert(pool, &input).await.unwrap().id
}

/// A minimal wearable body, optionally attached to a collection.
pub fn item_body(collection_id: Option<DbId>) -> Value {
    json!({
        "name": "Summer hat",
        "description": "A hat for the summer",
        "thumbnail": "thumbnail.png",
        "collection_id": collection_id,
        "rarity": "rare",
        "type": "wearable",
        "data": {
            "category": "hat",
            "representations": [{
                "bodyShapes": ["urn:decentraland:off-chain:base-avatars:BaseMale"],
                "mainFile": "hat.glb",
                "contents": ["hat.glb"]
            }],
            "replaces": [],
            "hides": [],
            "tags": ["summer"]
        },
        "contents": { "thumbnail.png": THUMBNAIL_HASH }
    })
}

pub fn tags(count: usize) -> Value {
    Value::Array((0..count).map(|i| Value::String(format!("tag{i}"))).collect())
}

// ---------------------------------------------------------------------------
// Cheques
// ---------------------------------------------------------------------------

pub fn manager_key() -> SigningKey {
    SigningKey::from_slice(&[7u8; 32]).unwrap()
}

pub fn address_of(key: &SigningKey) -> String {
    address_from_verifying_key(key.verifying_key())
}

/// Sign a slot usage cheque the way a manager's wallet would.
pub fn sign_cheque(key: &SigningKey, third_party_id: &str, qty: u64, salt: &str) -> SlotUsageCheque {
    let hash = cheque_message_hash(third_party_id, qty, salt, REGISTRY, CHAIN_ID).unwrap();
    let (signature, recovery_id) = key.sign_prehash_recoverable(&hash).unwrap();
    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    SlotUsageCheque {
        signature: to_hex_prefixed(&bytes),
        qty,
        salt: salt.to_string(),
    }
}

pub async fn count_item_curations(pool: &PgPool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM item_curations")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}
