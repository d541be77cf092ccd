//! GraphQL client for the collections subgraph and the third party subgraph.

use std::time::Duration;

use async_trait::async_trait;
use builder_core::fragments::{
    CollectionFragment, ItemFragment, ThirdPartyFragment, ThirdPartyItemFragment,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::error::RemoteError;

const COLLECTIONS_SERVICE: &str = "collections subgraph";
const THIRD_PARTY_SERVICE: &str = "third party subgraph";

/// Page size used by every list query; the subgraph caps `first` at 1000.
const PAGE_SIZE: usize = 1000;

/// Read access to the indexed chain state.
#[async_trait]
pub trait SubgraphReader: Send + Sync {
    async fn collection(&self, contract_address: &str)
        -> Result<Option<CollectionFragment>, RemoteError>;

    async fn collections(
        &self,
        contract_addresses: &[String],
    ) -> Result<Vec<CollectionFragment>, RemoteError>;

    async fn collection_items(&self, contract_address: &str)
        -> Result<Vec<ItemFragment>, RemoteError>;

    async fn committee_members(&self) -> Result<Vec<String>, RemoteError>;

    async fn third_party(&self, third_party_id: &str)
        -> Result<Option<ThirdPartyFragment>, RemoteError>;

    async fn third_parties_by_manager(
        &self,
        manager: &str,
    ) -> Result<Vec<ThirdPartyFragment>, RemoteError>;

    /// Items published under a third party collection URN.
    async fn third_party_items(
        &self,
        collection_urn: &str,
    ) -> Result<Vec<ThirdPartyItemFragment>, RemoteError>;

    /// The most recently updated item under a third party collection URN.
    async fn last_third_party_item(
        &self,
        collection_urn: &str,
    ) -> Result<Option<ThirdPartyItemFragment>, RemoteError>;

    /// Whether the registry has a receipt for a consumed cheque.
    async fn receipt_exists(&self, message_hash: &str) -> Result<bool, RemoteError>;
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionWire {
    id: String,
    creator: String,
    name: String,
    urn: String,
    is_approved: bool,
    #[serde(default)]
    minters: Vec<String>,
    #[serde(default)]
    managers: Vec<String>,
    reviewed_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<CollectionWire> for CollectionFragment {
    fn from(w: CollectionWire) -> Self {
        Self {
            id: w.id,
            creator: w.creator,
            name: w.name,
            urn: w.urn,
            is_approved: w.is_approved,
            minters: w.minters,
            managers: w.managers,
            reviewed_at: w.reviewed_at,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdWire {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemWire {
    id: String,
    collection: IdWire,
    blockchain_id: String,
    urn: String,
    price: String,
    beneficiary: String,
    total_supply: String,
    content_hash: Option<String>,
    rarity: Option<String>,
    is_approved: bool,
    created_at: String,
    updated_at: String,
    reviewed_at: Option<String>,
}

impl From<ItemWire> for ItemFragment {
    fn from(w: ItemWire) -> Self {
        Self {
            id: w.id,
            collection_address: w.collection.id,
            blockchain_id: w.blockchain_id,
            urn: w.urn,
            price: w.price,
            beneficiary: w.beneficiary,
            total_supply: w.total_supply,
            content_hash: w.content_hash,
            rarity: w.rarity,
            is_approved: w.is_approved,
            created_at: w.created_at,
            updated_at: w.updated_at,
            reviewed_at: w.reviewed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ThirdPartyMetadataWire {
    #[serde(rename = "thirdParty")]
    third_party: Option<ThirdPartyNameWire>,
}

#[derive(Debug, Deserialize)]
struct ThirdPartyNameWire {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThirdPartyWire {
    id: String,
    metadata: Option<ThirdPartyMetadataWire>,
    #[serde(default)]
    managers: Vec<String>,
    max_items: String,
    is_approved: bool,
}

impl From<ThirdPartyWire> for ThirdPartyFragment {
    fn from(w: ThirdPartyWire) -> Self {
        Self {
            id: w.id,
            name: w
                .metadata
                .and_then(|m| m.third_party)
                .and_then(|tp| tp.name),
            managers: w.managers,
            max_items: w.max_items,
            is_approved: w.is_approved,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThirdPartyItemWire {
    urn: String,
    blockchain_item_id: String,
    content_hash: Option<String>,
    is_approved: bool,
    created_at: String,
    updated_at: String,
    reviewed_at: Option<String>,
}

impl From<ThirdPartyItemWire> for ThirdPartyItemFragment {
    fn from(w: ThirdPartyItemWire) -> Self {
        Self {
            urn: w.urn,
            blockchain_item_id: w.blockchain_item_id,
            content_hash: w.content_hash,
            is_approved: w.is_approved,
            created_at: w.created_at,
            updated_at: w.updated_at,
            reviewed_at: w.reviewed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CollectionsData {
    collections: Vec<CollectionWire>,
}

#[derive(Debug, Deserialize)]
struct ItemsData {
    items: Vec<ItemWire>,
}

#[derive(Debug, Deserialize)]
struct AccountsData {
    accounts: Vec<AccountWire>,
}

#[derive(Debug, Deserialize)]
struct AccountWire {
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThirdPartiesData {
    third_parties: Vec<ThirdPartyWire>,
}

#[derive(Debug, Deserialize)]
struct ThirdPartyItemsData {
    items: Vec<ThirdPartyItemWire>,
}

#[derive(Debug, Deserialize)]
struct ReceiptsData {
    receipts: Vec<IdWire>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

const COLLECTION_FIELDS: &str =
    "id creator name urn isApproved minters managers reviewedAt createdAt updatedAt";

const ITEM_FIELDS: &str = "id collection { id } blockchainId urn price beneficiary totalSupply \
    contentHash rarity isApproved createdAt updatedAt reviewedAt";

const THIRD_PARTY_FIELDS: &str = "id metadata { thirdParty { name } } managers maxItems isApproved";

const THIRD_PARTY_ITEM_FIELDS: &str =
    "urn blockchainItemId contentHash isApproved createdAt updatedAt reviewedAt";

fn collections_query() -> String {
    format!(
        "query Collections($ids: [String!]!, $first: Int!) {{
            collections(where: {{ id_in: $ids }}, first: $first) {{ {COLLECTION_FIELDS} }}
        }}"
    )
}

fn items_query() -> String {
    format!(
        "query Items($collection: String!, $first: Int!) {{
            items(where: {{ collection: $collection }}, first: $first) {{ {ITEM_FIELDS} }}
        }}"
    )
}

const COMMITTEE_QUERY: &str = "query Committee($first: Int!) {
    accounts(where: { isCommitteeMember: true }, first: $first) { address }
}";

fn third_party_query() -> String {
    format!(
        "query ThirdParty($id: String!) {{
            thirdParties(where: {{ id: $id }}, first: 1) {{ {THIRD_PARTY_FIELDS} }}
        }}"
    )
}

fn third_parties_by_manager_query() -> String {
    format!(
        "query ThirdPartiesByManager($manager: String!, $first: Int!) {{
            thirdParties(where: {{ managers_contains: [$manager] }}, first: $first) {{ {THIRD_PARTY_FIELDS} }}
        }}"
    )
}

fn third_party_items_query(order: &str) -> String {
    format!(
        "query ThirdPartyItems($prefix: String!, $first: Int!) {{
            items(where: {{ urn_starts_with: $prefix }}, first: $first{order}) {{ {THIRD_PARTY_ITEM_FIELDS} }}
        }}"
    )
}

const RECEIPT_QUERY: &str = "query Receipt($id: String!) {
    receipts(where: { id: $id }, first: 1) { id }
}";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`SubgraphReader`] over the two subgraph GraphQL endpoints.
#[derive(Clone)]
pub struct GraphQlSubgraph {
    client: reqwest::Client,
    collections_url: String,
    third_party_url: String,
}

impl GraphQlSubgraph {
    pub fn new(
        collections_url: impl Into<String>,
        third_party_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport {
                service: COLLECTIONS_SERVICE,
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            collections_url: collections_url.into(),
            third_party_url: third_party_url.into(),
        })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, RemoteError> {
        let response = self
            .client
            .post(url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| RemoteError::Transport {
                service,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                service,
                status: status.as_u16(),
                body,
            });
        }

        let body: GraphQlResponse<T> = response.json().await.map_err(|e| RemoteError::Decode {
            service,
            message: e.to_string(),
        })?;
        decode_response(service, body)
    }

    async fn query_collections<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, RemoteError> {
        self.query(COLLECTIONS_SERVICE, &self.collections_url, query, variables)
            .await
    }

    async fn query_third_parties<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, RemoteError> {
        self.query(THIRD_PARTY_SERVICE, &self.third_party_url, query, variables)
            .await
    }
}

fn decode_response<T>(service: &'static str, body: GraphQlResponse<T>) -> Result<T, RemoteError> {
    if !body.errors.is_empty() {
        let message = body
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(RemoteError::GraphQl { service, message });
    }
    body.data.ok_or_else(|| RemoteError::Decode {
        service,
        message: "response has neither data nor errors".into(),
    })
}

#[async_trait]
impl SubgraphReader for GraphQlSubgraph {
    async fn collection(
        &self,
        contract_address: &str,
    ) -> Result<Option<CollectionFragment>, RemoteError> {
        let found = self.collections(&[contract_address.to_string()]).await?;
        Ok(found.into_iter().next())
    }

    async fn collections(
        &self,
        contract_addresses: &[String],
    ) -> Result<Vec<CollectionFragment>, RemoteError> {
        if contract_addresses.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = contract_addresses.iter().map(|a| a.to_lowercase()).collect();
        let data: CollectionsData = self
            .query_collections(&collections_query(), json!({ "ids": ids, "first": PAGE_SIZE }))
            .await?;
        Ok(data.collections.into_iter().map(Into::into).collect())
    }

    async fn collection_items(
        &self,
        contract_address: &str,
    ) -> Result<Vec<ItemFragment>, RemoteError> {
        let data: ItemsData = self
            .query_collections(
                &items_query(),
                json!({ "collection": contract_address.to_lowercase(), "first": PAGE_SIZE }),
            )
            .await?;
        Ok(data.items.into_iter().map(Into::into).collect())
    }

    async fn committee_members(&self) -> Result<Vec<String>, RemoteError> {
        let data: AccountsData = self
            .query_collections(COMMITTEE_QUERY, json!({ "first": PAGE_SIZE }))
            .await?;
        Ok(data.accounts.into_iter().map(|a| a.address).collect())
    }

    async fn third_party(
        &self,
        third_party_id: &str,
    ) -> Result<Option<ThirdPartyFragment>, RemoteError> {
        let data: ThirdPartiesData = self
            .query_third_parties(&third_party_query(), json!({ "id": third_party_id }))
            .await?;
        Ok(data.third_parties.into_iter().next().map(Into::into))
    }

    async fn third_parties_by_manager(
        &self,
        manager: &str,
    ) -> Result<Vec<ThirdPartyFragment>, RemoteError> {
        let data: ThirdPartiesData = self
            .query_third_parties(
                &third_parties_by_manager_query(),
                json!({ "manager": manager.to_lowercase(), "first": PAGE_SIZE }),
            )
            .await?;
        Ok(data.third_parties.into_iter().map(Into::into).collect())
    }

    async fn third_party_items(
        &self,
        collection_urn: &str,
    ) -> Result<Vec<ThirdPartyItemFragment>, RemoteError> {
        let data: ThirdPartyItemsData = self
            .query_third_parties(
                &third_party_items_query(""),
                json!({ "prefix": format!("{collection_urn}:"), "first": PAGE_SIZE }),
            )
            .await?;
        Ok(data.items.into_iter().map(Into::into).collect())
    }

    async fn last_third_party_item(
        &self,
        collection_urn: &str,
    ) -> Result<Option<ThirdPartyItemFragment>, RemoteError> {
        let data: ThirdPartyItemsData = self
            .query_third_parties(
                &third_party_items_query(", orderBy: updatedAt, orderDirection: desc"),
                json!({ "prefix": format!("{collection_urn}:"), "first": 1 }),
            )
            .await?;
        Ok(data.items.into_iter().next().map(Into::into))
    }

    async fn receipt_exists(&self, message_hash: &str) -> Result<bool, RemoteError> {
        let data: ReceiptsData = self
            .query_third_parties(RECEIPT_QUERY, json!({ "id": message_hash.to_lowercase() }))
            .await?;
        Ok(!data.receipts.is_empty())
    }
}
