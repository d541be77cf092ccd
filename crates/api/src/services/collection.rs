//! Collection lifecycle: upsert, lock, publish and delete, plus the
//! consolidated read views.
//!
//! States are `draft` (no contract, unlocked), `locked` (lock set less than
//! a day ago, unpublished) and `published`. A standard collection is
//! published once the subgraph indexes its contract; a third party
//! collection once any of its items was sent to curation.

use std::collections::{HashMap, HashSet};

use builder_core::cheque::{cheque_message_hash, to_hex_prefixed, verify_cheque, SlotUsageCheque};
use builder_core::collection::{
    collection_state, ensure_editable, merge_kind, Collection, CollectionKind,
    StandardCollection, ThirdPartyCollection,
};
use builder_core::consolidation::{
    consolidate_collection, consolidate_collections, consolidate_items, consolidate_tp_collection,
    consolidate_tp_item, FullCollection, FullItem, RemoteItemData,
};
use builder_core::content_hash::calculate_item_content_hash;
use builder_core::error::CoreError;
use builder_core::fragments::ThirdPartyItemFragment;
use builder_core::types::{normalize_address, DbId};
use builder_core::urn::{build_tp_collection_urn, decode_tp_collection_urn};
use builder_db::models::cheque::CreateSlotUsageCheque;
use builder_db::models::collection::{CollectionRow, UpsertCollection};
use builder_db::models::curation::{CreateItemCuration, CurationStatus, ItemCuration};
use builder_db::models::item::{into_domain_items, BlockchainIdUpdate};
use builder_db::repositories::publication_repo::ThirdPartyPublication;
use builder_db::repositories::{
    CollectionCurationRepo, CollectionRepo, ItemCurationRepo, ItemRepo, PublicationRepo,
    SlotUsageChequeRepo, VirtualThirdPartyRepo,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::services::access;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Body of a collection upsert. The kind is given by its nullable columns:
/// `third_party_id` and `urn_suffix` together make a third party collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionInput {
    #[serde(default)]
    pub id: Option<DbId>,
    pub name: String,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub salt: Option<String>,
    #[serde(default)]
    pub third_party_id: Option<String>,
    #[serde(default)]
    pub urn_suffix: Option<String>,
    #[serde(default)]
    pub minters: Vec<String>,
    #[serde(default)]
    pub managers: Vec<String>,
}

impl CollectionInput {
    fn kind(&self) -> Result<CollectionKind, CoreError> {
        match (&self.third_party_id, &self.urn_suffix) {
            (Some(third_party_id), Some(urn_suffix)) => {
                if self.contract_address.is_some() {
                    return Err(CoreError::Validation(
                        "Third party collections can't have a contract address".into(),
                    ));
                }
                decode_tp_collection_urn(&build_tp_collection_urn(third_party_id, urn_suffix))?;
                Ok(CollectionKind::ThirdParty(ThirdPartyCollection {
                    third_party_id: third_party_id.clone(),
                    urn_suffix: urn_suffix.clone(),
                }))
            }
            (None, None) => Ok(CollectionKind::Standard(StandardCollection {
                contract_address: self.contract_address.as_deref().map(normalize_address),
                salt: self.salt.clone(),
            })),
            _ => Err(CoreError::Validation(
                "third_party_id and urn_suffix must be set together".into(),
            )),
        }
    }
}

/// Body of a publish request. Third party collections name the items to
/// send to curation and carry the cheque paying for their slots.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishInput {
    #[serde(default)]
    pub items: Vec<DbId>,
    #[serde(default)]
    pub cheque: Option<SlotUsageCheque>,
}

#[derive(Debug, Serialize)]
pub struct PublishOutcome {
    pub collection: FullCollection,
    pub items: Vec<FullItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub item_curations: Vec<ItemCuration>,
}

/// What curators need to approve a third party publication.
#[derive(Debug, Serialize)]
pub struct ApprovalData {
    pub cheque: SlotUsageCheque,
    /// Hash of the signed cheque, also the id of its on-chain receipt.
    pub message_hash: String,
    pub cheque_was_consumed: bool,
    pub content_hashes: Vec<String>,
    pub curation_status: Option<CurationStatus>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct CollectionService;

impl CollectionService {
    /// Load a stored collection with its kind resolved.
    pub async fn load(state: &AppState, id: DbId) -> AppResult<Collection> {
        let row = CollectionRepo::find_by_id(&state.pool, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Collection", id))?;
        Ok(row.into_domain()?)
    }

    /// Publication state used by the write guards.
    pub async fn is_published(state: &AppState, collection: &Collection) -> AppResult<bool> {
        match &collection.kind {
            CollectionKind::Standard(standard) => match standard.contract_address.as_deref() {
                Some(address) => {
                    // A fresh deployment has bytecode before the subgraph indexes it.
                    let (fragment, has_code) = tokio::try_join!(
                        state.subgraph.collection(address),
                        state.chain.has_code(address),
                    )?;
                    Ok(fragment.is_some() || has_code)
                }
                None => Ok(false),
            },
            CollectionKind::ThirdParty(_) => {
                Ok(ItemCurationRepo::exists_for_collection(&state.pool, collection.id).await?)
            }
        }
    }

    /// Merge a stored collection with what the subgraph knows about it.
    pub async fn consolidate(state: &AppState, collection: &Collection) -> AppResult<FullCollection> {
        let network = state.config.network;
        match &collection.kind {
            CollectionKind::Standard(standard) => {
                let fragment = match standard.contract_address.as_deref() {
                    Some(address) => state.subgraph.collection(address).await?,
                    None => None,
                };
                Ok(consolidate_collection(collection, network, fragment.as_ref()))
            }
            CollectionKind::ThirdParty(tp) => {
                let last_item = state.subgraph.last_third_party_item(&tp.urn()).await?;
                Ok(consolidate_tp_collection(collection, network, last_item.as_ref()))
            }
        }
    }

    /// Consolidate a batch with one subgraph query for all standard
    /// collections and one last-item lookup per third party collection.
    async fn consolidate_many(
        state: &AppState,
        collections: &[Collection],
    ) -> AppResult<Vec<FullCollection>> {
        let addresses: Vec<String> = collections
            .iter()
            .filter_map(Collection::contract_address)
            .map(normalize_address)
            .collect();
        let tp_urns: Vec<String> = collections
            .iter()
            .filter_map(Collection::third_party)
            .map(ThirdPartyCollection::urn)
            .collect();

        let remote = async {
            if addresses.is_empty() {
                Ok(Vec::new())
            } else {
                state.subgraph.collections(&addresses).await
            }
        };
        let last_items = futures::future::try_join_all(tp_urns.iter().map(|urn| async move {
            let item = state.subgraph.last_third_party_item(urn).await?;
            Ok::<_, builder_remote::RemoteError>((urn.clone(), item))
        }));
        let (remote, last_items) = tokio::try_join!(remote, last_items)?;

        let tp_last_items: HashMap<String, ThirdPartyItemFragment> = last_items
            .into_iter()
            .filter_map(|(urn, item)| item.map(|item| (urn, item)))
            .collect();
        Ok(consolidate_collections(
            collections,
            state.config.network,
            &remote,
            &tp_last_items,
        ))
    }

    /// A consolidated collection. Unpublished ones are only visible to
    /// their owner, managers and the committee.
    pub async fn get(state: &AppState, id: DbId, caller: &str) -> AppResult<FullCollection> {
        let collection = Self::load(state, id).await?;
        let full = Self::consolidate(state, &collection).await?;
        if !full.is_published {
            access::ensure_can_read(state, &collection, caller).await?;
        }
        Ok(full)
    }

    /// Collections created by `address` plus the collections of every third
    /// party it manages.
    pub async fn list_by_owner(state: &AppState, address: &str) -> AppResult<Vec<FullCollection>> {
        let collections = Self::find_owned_or_managed(state, address).await?;
        Self::consolidate_many(state, &collections).await
    }

    /// Stored rows behind [`Self::list_by_owner`], without remote data.
    pub async fn find_owned_or_managed(state: &AppState, address: &str) -> AppResult<Vec<Collection>> {
        let (owned, remote_tps, virtual_tps) = tokio::try_join!(
            async {
                CollectionRepo::list_by_owner(&state.pool, address)
                    .await
                    .map_err(AppError::from)
            },
            async {
                state
                    .subgraph
                    .third_parties_by_manager(address)
                    .await
                    .map_err(AppError::from)
            },
            async {
                VirtualThirdPartyRepo::list_by_manager(&state.pool, address)
                    .await
                    .map_err(AppError::from)
            },
        )?;

        let mut third_party_ids: Vec<String> = remote_tps
            .into_iter()
            .map(|tp| tp.id)
            .chain(virtual_tps.into_iter().map(|tp| tp.id))
            .collect();
        third_party_ids.sort();
        third_party_ids.dedup();
        let managed = if third_party_ids.is_empty() {
            Vec::new()
        } else {
            CollectionRepo::list_by_third_parties(&state.pool, &third_party_ids).await?
        };

        let mut seen = HashSet::new();
        let collections = owned
            .into_iter()
            .chain(managed)
            .filter(|row| seen.insert(row.id))
            .map(CollectionRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(collections)
    }

    /// Create a collection or update a draft one.
    pub async fn upsert(
        state: &AppState,
        id: DbId,
        input: CollectionInput,
        caller: &str,
    ) -> AppResult<FullCollection> {
        if let Some(body_id) = input.id.filter(|body_id| *body_id != id) {
            return Err(CoreError::IdMismatch {
                entity: "collection",
                path_id: id.to_string(),
                body_id: body_id.to_string(),
            }
            .into());
        }
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::Validation("Collection name must not be empty".into()).into());
        }
        let kind = input.kind()?;

        let stored = match CollectionRepo::find_by_id(&state.pool, id).await? {
            Some(row) => Some(row.into_domain()?),
            None => None,
        };

        let (eth_address, kind) = match &stored {
            Some(stored) => {
                access::ensure_owned_or_managed(state, stored, caller).await?;
                let kind = merge_kind(id, &stored.kind, kind)?;
                let published = Self::is_published(state, stored).await?;
                ensure_editable(id, collection_state(published, stored.lock, state.clock.now()))?;
                (stored.eth_address.clone(), kind)
            }
            None => (normalize_address(caller), kind),
        };

        // Creating or editing a third party collection takes a manager of
        // the third party it is written under.
        if let CollectionKind::ThirdParty(tp) = &kind {
            if !access::is_third_party_manager(state, &tp.third_party_id, caller).await? {
                return Err(CoreError::NotOwnerOrManager {
                    entity: "ThirdParty",
                    id: tp.third_party_id.clone(),
                    eth_address: caller.to_string(),
                }
                .into());
            }
        }

        match &kind {
            CollectionKind::Standard(_) => {
                if CollectionRepo::is_name_in_use(&state.pool, &name, id).await? {
                    return Err(CoreError::CollectionNameInUse { name }.into());
                }
            }
            CollectionKind::ThirdParty(tp) => {
                if CollectionRepo::is_urn_suffix_in_use(
                    &state.pool,
                    &tp.third_party_id,
                    &tp.urn_suffix,
                    id,
                )
                .await?
                {
                    return Err(CoreError::UrnAlreadyInUse { urn: tp.urn() }.into());
                }
            }
        }

        let input = UpsertCollection {
            id,
            name,
            eth_address,
            kind,
            minters: input.minters.iter().map(|m| normalize_address(m)).collect(),
            managers: input.managers.iter().map(|m| normalize_address(m)).collect(),
        };
        let collection = CollectionRepo::upsert(&state.pool, &input).await?.into_domain()?;

        tracing::info!(
            collection_id = %id,
            eth_address = %caller,
            third_party = collection.is_third_party(),
            created = stored.is_none(),
            "Collection upserted",
        );
        Self::consolidate(state, &collection).await
    }

    /// Start the lock window. Any owner or manager may lock.
    pub async fn lock(state: &AppState, id: DbId, caller: &str) -> AppResult<FullCollection> {
        let collection = Self::load(state, id).await?;
        access::ensure_owned_or_managed(state, &collection, caller).await?;

        let now = state.clock.now();
        let collection = CollectionRepo::lock(&state.pool, id, now)
            .await?
            .ok_or_else(|| CoreError::not_found("Collection", id))?
            .into_domain()?;

        tracing::info!(collection_id = %id, eth_address = %caller, lock = %now, "Collection locked");
        Self::consolidate(state, &collection).await
    }

    pub async fn publish(
        state: &AppState,
        id: DbId,
        input: PublishInput,
        caller: &str,
    ) -> AppResult<PublishOutcome> {
        let collection = Self::load(state, id).await?;
        access::ensure_owned_or_managed(state, &collection, caller).await?;

        match &collection.kind {
            CollectionKind::Standard(_) => Self::publish_standard(state, &collection).await,
            CollectionKind::ThirdParty(tp) => {
                Self::publish_third_party(state, &collection, tp, input, caller).await
            }
        }
    }

    /// Reconcile the stored items with the deployed contract. The contract
    /// is created client-side; item `n` (oldest first) must exist on chain
    /// with blockchain id `n`.
    async fn publish_standard(
        state: &AppState,
        collection: &Collection,
    ) -> AppResult<PublishOutcome> {
        let unpublished = || CoreError::UnpublishedCollection { id: collection.id };
        let contract = collection.contract_address().ok_or_else(unpublished)?;

        let (fragment, remote_items) = tokio::try_join!(
            state.subgraph.collection(contract),
            state.subgraph.collection_items(contract),
        )?;
        let fragment = fragment.ok_or_else(unpublished)?;

        let rows = ItemRepo::list_by_collection(&state.pool, collection.id).await?;
        let mut items = into_domain_items(rows)?;

        let on_chain: HashSet<&str> = remote_items
            .iter()
            .map(|remote| remote.blockchain_id.as_str())
            .collect();
        let network = state.config.network;
        let emote_format = state.config.emote_format();

        let mut updates = Vec::new();
        for (index, item) in items.iter_mut().enumerate() {
            let blockchain_id = index.to_string();
            if !on_chain.contains(blockchain_id.as_str()) {
                return Err(CoreError::ItemMissingOnChain {
                    collection_id: collection.id,
                    item_id: item.id,
                }
                .into());
            }
            if item.blockchain_item_id.as_deref() == Some(blockchain_id.as_str()) {
                continue;
            }
            item.blockchain_item_id = Some(blockchain_id.clone());
            let hash = calculate_item_content_hash(item, collection, network, emote_format)?;
            item.local_content_hash = Some(hash.clone());
            updates.push(BlockchainIdUpdate {
                item_id: item.id,
                blockchain_item_id: blockchain_id,
                local_content_hash: Some(hash),
            });
        }

        if !updates.is_empty() {
            ItemRepo::set_blockchain_ids(&state.pool, &updates).await?;
        }
        tracing::info!(
            collection_id = %collection.id,
            items = items.len(),
            backfilled = updates.len(),
            "Standard collection publication reconciled",
        );

        let pointers: Vec<String> = remote_items.iter().map(|remote| remote.urn.clone()).collect();
        let catalyst = if pointers.is_empty() {
            Vec::new()
        } else {
            state.catalyst.entities_by_pointers(&pointers).await?
        };

        let fragments = [fragment];
        let collections = HashMap::from([(collection.id, collection.clone())]);
        let remote = RemoteItemData {
            items: &remote_items,
            collections: &fragments,
            catalyst: &catalyst,
            ..Default::default()
        };
        Ok(PublishOutcome {
            collection: consolidate_collection(collection, network, fragments.first()),
            items: consolidate_items(items, &collections, &remote),
            item_curations: Vec::new(),
        })
    }

    /// Spend slots with a signed cheque and send the items to curation.
    ///
    /// Checks, in order: enough slots left, a cheque for exactly these items
    /// signed by the caller, no publication already waiting for curation.
    /// The cheque and every curation are then written in one transaction.
    async fn publish_third_party(
        state: &AppState,
        collection: &Collection,
        tp: &ThirdPartyCollection,
        input: PublishInput,
        caller: &str,
    ) -> AppResult<PublishOutcome> {
        let cheque = input.cheque.ok_or_else(|| {
            CoreError::Validation(
                "A slot usage cheque is required to publish a third party collection".into(),
            )
        })?;
        let mut item_ids = input.items;
        item_ids.sort();
        item_ids.dedup();
        if item_ids.is_empty() {
            return Err(CoreError::NoItemsToPublish { id: collection.id }.into());
        }

        let items = into_domain_items(ItemRepo::find_by_ids(&state.pool, &item_ids).await?)?;
        for item_id in &item_ids {
            let item = items
                .iter()
                .find(|item| item.id == *item_id)
                .ok_or_else(|| CoreError::not_found("Item", item_id))?;
            if item.collection_id != Some(collection.id) {
                return Err(CoreError::Validation(format!(
                    "Item {item_id} doesn't belong to collection {}",
                    collection.id
                ))
                .into());
            }
        }

        let third_party = state
            .subgraph
            .third_party(&tp.third_party_id)
            .await?
            .ok_or_else(|| CoreError::not_found("ThirdParty", &tp.third_party_id))?;
        let used = ItemCurationRepo::count_items_by_third_party(&state.pool, &tp.third_party_id).await?;
        let available = third_party.max_items() - used;
        if items.len() as i64 > available {
            return Err(CoreError::InsufficientSlots {
                id: collection.id,
                available,
                requested: items.len(),
            }
            .into());
        }

        verify_cheque(
            collection.id,
            &cheque,
            &tp.third_party_id,
            items.len(),
            caller,
            &state.config.third_party_registry_address,
            state.config.chain_id,
        )?;

        if CollectionCurationRepo::has_pending(&state.pool, collection.id).await? {
            return Err(CoreError::PublicationInProgress { id: collection.id }.into());
        }

        let network = state.config.network;
        let emote_format = state.config.emote_format();
        let curations = items
            .iter()
            .map(|item| {
                let content_hash = match &item.local_content_hash {
                    Some(hash) => hash.clone(),
                    None => calculate_item_content_hash(item, collection, network, emote_format)?,
                };
                Ok(CreateItemCuration {
                    item_id: item.id,
                    content_hash: Some(content_hash),
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        let qty = i64::try_from(cheque.qty)
            .map_err(|_| CoreError::Validation(format!("Cheque quantity {} is too large", cheque.qty)))?;
        let publication = ThirdPartyPublication {
            collection_id: collection.id,
            cheque: CreateSlotUsageCheque {
                signature: cheque.signature.clone(),
                qty,
                salt: cheque.salt.clone(),
                collection_id: collection.id,
                third_party_id: tp.third_party_id.clone(),
            },
            items: curations,
        };
        let record = PublicationRepo::publish_third_party(&state.pool, &publication).await?;

        tracing::info!(
            collection_id = %collection.id,
            third_party_id = %tp.third_party_id,
            eth_address = %caller,
            items = record.item_curations.len(),
            "Third party collection sent to curation",
        );

        let full_collection = Self::consolidate(state, collection).await?;
        let full_items = items
            .into_iter()
            .map(|item| consolidate_tp_item(item, tp, None, None))
            .collect();
        Ok(PublishOutcome {
            collection: full_collection,
            items: full_items,
            item_curations: record.item_curations,
        })
    }

    /// Delete a draft collection and, through the foreign keys, its items.
    pub async fn delete(state: &AppState, id: DbId, caller: &str) -> AppResult<()> {
        let collection = Self::load(state, id).await?;
        access::ensure_owned_or_managed(state, &collection, caller).await?;

        let published = match &collection.kind {
            CollectionKind::Standard(_) => ItemRepo::count_published(&state.pool, id).await? > 0,
            CollectionKind::ThirdParty(_) => {
                ItemCurationRepo::exists_for_collection(&state.pool, id).await?
            }
        };
        ensure_editable(id, collection_state(published, collection.lock, state.clock.now()))?;

        if !CollectionRepo::delete(&state.pool, id).await? {
            return Err(CoreError::not_found("Collection", id).into());
        }
        tracing::info!(collection_id = %id, eth_address = %caller, "Collection deleted");
        Ok(())
    }

    /// The latest cheque and curation snapshot of a third party collection.
    pub async fn approval_data(state: &AppState, id: DbId, caller: &str) -> AppResult<ApprovalData> {
        let collection = Self::load(state, id).await?;
        let tp = collection.third_party().ok_or_else(|| {
            CoreError::Validation(format!("Collection {id} is not a third party collection"))
        })?;
        access::ensure_can_read(state, &collection, caller).await?;

        let cheque = SlotUsageChequeRepo::find_latest_by_collection(&state.pool, id)
            .await?
            .ok_or_else(|| CoreError::not_found("SlotUsageCheque", id))?;
        let qty = u64::try_from(cheque.qty)
            .map_err(|_| CoreError::Inconsistent(format!("Cheque {} has a negative qty", cheque.id)))?;
        let message_hash = to_hex_prefixed(&cheque_message_hash(
            &tp.third_party_id,
            qty,
            &cheque.salt,
            &state.config.third_party_registry_address,
            state.config.chain_id,
        )?);

        let (cheque_was_consumed, item_curations, collection_curation) = tokio::try_join!(
            async {
                state
                    .subgraph
                    .receipt_exists(&message_hash)
                    .await
                    .map_err(AppError::from)
            },
            async {
                ItemCurationRepo::find_latest_by_collection(&state.pool, id)
                    .await
                    .map_err(AppError::from)
            },
            async {
                CollectionCurationRepo::find_latest_by_collection(&state.pool, id)
                    .await
                    .map_err(AppError::from)
            },
        )?;

        Ok(ApprovalData {
            cheque: SlotUsageCheque {
                signature: cheque.signature,
                qty,
                salt: cheque.salt,
            },
            message_hash,
            cheque_was_consumed,
            content_hashes: item_curations
                .into_iter()
                .filter_map(|curation| curation.content_hash)
                .collect(),
            curation_status: collection_curation.map(|curation| curation.status),
        })
    }
}

