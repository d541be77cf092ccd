//! Item upsert, read and delete.
//!
//! Standard items are frozen once their collection is published (rarity
//! and collection can't change; smart wearable videos stay pinned). Third
//! party items are addressed by URN, may not leave their collection, and
//! keep their URN suffix once sent to curation.

use std::collections::{BTreeMap, HashMap, HashSet};

use builder_core::collection::{Collection, CollectionKind, ThirdPartyCollection};
use builder_core::consolidation::{consolidate_items, merge_discovered, FullItem, RemoteItemData};
use builder_core::content_hash::calculate_item_content_hash;
use builder_core::error::CoreError;
use builder_core::fragments::{CollectionFragment, ItemFragment, ThirdPartyItemFragment};
use builder_core::item::{
    check_move, resolve_video, validate_outcomes, validate_tags, Item, ItemData, ItemMetrics,
    ItemType, Rarity,
};
use builder_core::types::{normalize_address, same_address, DbId, Timestamp};
use builder_core::urn::{build_tp_item_urn, decode_tp_item_urn};
use builder_db::models::curation::ItemCuration;
use builder_db::models::item::into_domain_items;
use builder_db::repositories::{CollectionRepo, ItemCurationRepo, ItemRepo};
use builder_remote::RemoteError;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::services::{access, CollectionService};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// How an item is addressed in a path: its id, or for third party items
/// its full URN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRef {
    Id(DbId),
    Urn(String),
}

impl ItemRef {
    pub fn parse(value: &str) -> Self {
        match value.parse::<DbId>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Urn(value.to_string()),
        }
    }
}

/// Body of an item upsert.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemInput {
    #[serde(default)]
    pub id: Option<DbId>,
    /// Full URN of a third party item; its last segment becomes the suffix.
    #[serde(default)]
    pub urn: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub collection_id: Option<DbId>,
    #[serde(default)]
    pub rarity: Option<Rarity>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub data: ItemData,
    #[serde(default)]
    pub metrics: ItemMetrics,
    #[serde(default)]
    pub contents: BTreeMap<String, String>,
    #[serde(default)]
    pub video: Option<String>,
}

/// Remote state of one collection, as needed to consolidate its items.
#[derive(Debug, Default)]
struct RemoteBundle {
    collections: Vec<CollectionFragment>,
    items: Vec<ItemFragment>,
    tp_items: Vec<ThirdPartyItemFragment>,
}

impl RemoteBundle {
    fn extend(&mut self, other: RemoteBundle) {
        self.collections.extend(other.collections);
        self.items.extend(other.items);
        self.tp_items.extend(other.tp_items);
    }

    fn is_published(&self) -> bool {
        !self.collections.is_empty() || !self.tp_items.is_empty()
    }
}

async fn fetch_remote(state: &AppState, collection: &Collection) -> Result<RemoteBundle, RemoteError> {
    match &collection.kind {
        CollectionKind::Standard(standard) => match standard.contract_address.as_deref() {
            Some(address) => {
                let (fragment, items) = tokio::try_join!(
                    state.subgraph.collection(address),
                    state.subgraph.collection_items(address),
                )?;
                Ok(RemoteBundle {
                    collections: fragment.into_iter().collect(),
                    items,
                    tp_items: Vec::new(),
                })
            }
            None => Ok(RemoteBundle::default()),
        },
        CollectionKind::ThirdParty(tp) => Ok(RemoteBundle {
            tp_items: state.subgraph.third_party_items(&tp.urn()).await?,
            ..Default::default()
        }),
    }
}

fn tp_item_urn(tp: &ThirdPartyCollection, item_urn_suffix: &str) -> String {
    build_tp_item_urn(&tp.third_party_id, &tp.urn_suffix, item_urn_suffix)
}

fn ensure_item_owner(item: &Item, caller: &str) -> Result<(), CoreError> {
    if same_address(&item.eth_address, caller) {
        return Ok(());
    }
    Err(CoreError::NotOwnerOrManager {
        entity: "Item",
        id: item.id.to_string(),
        eth_address: caller.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct ItemService;

impl ItemService {
    pub async fn load(state: &AppState, id: DbId) -> AppResult<Item> {
        let row = ItemRepo::find_by_id(&state.pool, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Item", id))?;
        Ok(row.into_domain()?)
    }

    async fn load_collection(state: &AppState, id: Option<DbId>) -> AppResult<Option<Collection>> {
        match id {
            Some(id) => Ok(Some(CollectionService::load(state, id).await?)),
            None => Ok(None),
        }
    }

    async fn load_collections(
        state: &AppState,
        ids: impl IntoIterator<Item = DbId>,
    ) -> AppResult<HashMap<DbId, Collection>> {
        let mut ids: Vec<DbId> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        CollectionRepo::find_by_ids(&state.pool, &ids)
            .await?
            .into_iter()
            .map(|row| row.into_domain().map(|collection| (collection.id, collection)))
            .collect::<Result<_, _>>()
            .map_err(AppError::from)
    }

    /// Consolidate items against freshly fetched remote state of their
    /// collections.
    async fn consolidate(
        state: &AppState,
        items: Vec<Item>,
        collections: &HashMap<DbId, Collection>,
    ) -> AppResult<Vec<FullItem>> {
        let bundles =
            futures::future::try_join_all(collections.values().map(|c| fetch_remote(state, c)))
                .await?;
        let mut remote = RemoteBundle::default();
        for bundle in bundles {
            remote.extend(bundle);
        }
        Self::consolidate_with(state, items, collections, &remote).await
    }

    /// Look the items up in the catalyst and merge everything.
    async fn consolidate_with(
        state: &AppState,
        items: Vec<Item>,
        collections: &HashMap<DbId, Collection>,
        remote: &RemoteBundle,
    ) -> AppResult<Vec<FullItem>> {
        let tp_urns = items.iter().filter_map(|item| {
            let tp = item.collection_id.and_then(|id| collections.get(&id))?.third_party()?;
            Some(tp_item_urn(tp, item.urn_suffix.as_deref()?))
        });
        let mut pointers: Vec<String> = remote
            .items
            .iter()
            .map(|fragment| fragment.urn.clone())
            .chain(tp_urns)
            .collect();
        pointers.sort();
        pointers.dedup();

        let catalyst = if pointers.is_empty() {
            Vec::new()
        } else {
            state.catalyst.entities_by_pointers(&pointers).await?
        };

        let data = RemoteItemData {
            items: &remote.items,
            collections: &remote.collections,
            tp_items: &remote.tp_items,
            catalyst: &catalyst,
        };
        Ok(consolidate_items(items, collections, &data))
    }

    async fn consolidate_one(
        state: &AppState,
        item: Item,
        collection: Option<Collection>,
    ) -> AppResult<FullItem> {
        let id = item.id;
        let collections: HashMap<DbId, Collection> =
            collection.into_iter().map(|c| (c.id, c)).collect();
        Self::consolidate(state, vec![item], &collections)
            .await?
            .pop()
            .ok_or_else(|| CoreError::Internal(format!("Item {id} was lost while consolidating")).into())
    }

    /// A consolidated item. Unpublished ones are only visible to their
    /// creator, the collection's owner or managers, and the committee.
    pub async fn get(state: &AppState, id: DbId, caller: &str) -> AppResult<FullItem> {
        let item = Self::load(state, id).await?;
        let collection = Self::load_collection(state, item.collection_id).await?;
        let full = Self::consolidate_one(state, item, collection.clone()).await?;

        if !full.is_published && ensure_item_owner(&full.item, caller).is_err() {
            match &collection {
                Some(collection) => access::ensure_can_read(state, collection, caller).await?,
                None if access::is_committee_member(state, caller).await => {}
                None => ensure_item_owner(&full.item, caller)?,
            }
        }
        Ok(full)
    }

    /// Items of a collection, oldest first.
    pub async fn list_by_collection(
        state: &AppState,
        collection_id: DbId,
        caller: &str,
    ) -> AppResult<Vec<FullItem>> {
        let collection = CollectionService::load(state, collection_id).await?;
        let (rows, remote) = tokio::try_join!(
            async {
                ItemRepo::list_by_collection(&state.pool, collection_id)
                    .await
                    .map_err(AppError::from)
            },
            async { fetch_remote(state, &collection).await.map_err(AppError::from) },
        )?;
        if !remote.is_published() {
            access::ensure_can_read(state, &collection, caller).await?;
        }

        let items = into_domain_items(rows)?;
        let collections = HashMap::from([(collection.id, collection)]);
        Self::consolidate_with(state, items, &collections, &remote).await
    }

    /// Items created by `address` followed by the rest of the items in the
    /// collections it owns or manages.
    pub async fn list_by_owner(state: &AppState, address: &str, caller: &str) -> AppResult<Vec<FullItem>> {
        if !same_address(address, caller) && !access::is_committee_member(state, caller).await {
            return Err(CoreError::Unauthorized(format!(
                "{caller} can't list the items of {address}"
            ))
            .into());
        }

        let managed = CollectionService::find_owned_or_managed(state, address).await?;
        let managed_ids: Vec<DbId> = managed.iter().map(|c| c.id).collect();
        let (owned_rows, managed_rows) = tokio::try_join!(
            ItemRepo::list_by_owner(&state.pool, address),
            async {
                if managed_ids.is_empty() {
                    Ok(Vec::new())
                } else {
                    ItemRepo::list_by_collections(&state.pool, &managed_ids).await
                }
            },
        )?;
        let owned = into_domain_items(owned_rows)?;
        let in_managed = into_domain_items(managed_rows)?;

        let mut collections: HashMap<DbId, Collection> =
            managed.into_iter().map(|c| (c.id, c)).collect();
        let foreign: Vec<DbId> = owned
            .iter()
            .filter_map(|item| item.collection_id)
            .filter(|id| !collections.contains_key(id))
            .collect();
        collections.extend(Self::load_collections(state, foreign).await?);

        let owned_count = owned.len();
        let mut all = owned;
        all.extend(in_managed);
        let mut known = Self::consolidate(state, all, &collections).await?;
        let discovered = known.split_off(owned_count);
        Ok(merge_discovered(known, discovered))
    }

    /// Create or update an item, possibly moving it between collections.
    pub async fn upsert(
        state: &AppState,
        target: ItemRef,
        input: ItemInput,
        caller: &str,
    ) -> AppResult<FullItem> {
        let (id, stored) = match target {
            ItemRef::Id(id) => {
                let stored = match ItemRepo::find_by_id(&state.pool, id).await? {
                    Some(row) => Some(row.into_domain()?),
                    None => None,
                };
                (id, stored)
            }
            ItemRef::Urn(urn) => {
                let decoded = decode_tp_item_urn(&urn)?;
                let row = ItemRepo::find_by_urn(
                    &state.pool,
                    &decoded.third_party_id,
                    &decoded.collection_urn_suffix,
                    &decoded.item_urn_suffix,
                )
                .await?
                .ok_or_else(|| CoreError::not_found("Item", &urn))?;
                let item = row.into_domain()?;
                (item.id, Some(item))
            }
        };

        if let Some(body_id) = input.id.filter(|body_id| *body_id != id) {
            return Err(CoreError::IdMismatch {
                entity: "item",
                path_id: id.to_string(),
                body_id: body_id.to_string(),
            }
            .into());
        }
        if input.name.trim().is_empty() {
            return Err(CoreError::Validation("Item name must not be empty".into()).into());
        }
        validate_outcomes(&input.data)?;
        validate_tags(
            id,
            stored.as_ref().map(|s| s.data.tags.len()),
            input.data.tags.len(),
        )?;

        let from = Self::load_collection(state, stored.as_ref().and_then(|s| s.collection_id)).await?;
        let to = match input.collection_id {
            Some(to_id) if from.as_ref().is_some_and(|from| from.id == to_id) => from.clone(),
            other => Self::load_collection(state, other).await?,
        };
        let moving = from.as_ref().map(|c| c.id) != to.as_ref().map(|c| c.id);

        match (&stored, &from) {
            (Some(stored), None) => ensure_item_owner(stored, caller)?,
            (_, Some(from)) => access::ensure_owned_or_managed(state, from, caller).await?,
            (None, None) => {}
        }
        if let Some(to) = to.as_ref().filter(|_| moving) {
            access::ensure_owned_or_managed(state, to, caller).await?;
        }
        check_move(id, from.as_ref(), to.as_ref())?;

        let now = state.clock.now();
        let mut item = Item {
            id,
            urn_suffix: stored.as_ref().and_then(|s| s.urn_suffix.clone()),
            name: input.name.trim().to_string(),
            description: input.description,
            thumbnail: input.thumbnail,
            eth_address: stored
                .as_ref()
                .map_or_else(|| normalize_address(caller), |s| s.eth_address.clone()),
            collection_id: to.as_ref().map(|c| c.id),
            blockchain_item_id: stored.as_ref().and_then(|s| s.blockchain_item_id.clone()),
            price: stored.as_ref().and_then(|s| s.price.clone()),
            beneficiary: stored.as_ref().and_then(|s| s.beneficiary.clone()),
            rarity: input.rarity,
            item_type: input.item_type,
            data: input.data,
            metrics: input.metrics,
            contents: input.contents,
            video: input.video,
            local_content_hash: None,
            created_at: stored.as_ref().map_or(now, |s| s.created_at),
            updated_at: now,
        };

        let third_party = input.urn.is_some()
            || item.urn_suffix.is_some()
            || to.as_ref().or(from.as_ref()).is_some_and(Collection::is_third_party);
        let curation = if third_party {
            Self::apply_third_party_rules(
                state,
                &mut item,
                stored.as_ref(),
                from.as_ref(),
                to.as_ref(),
                input.urn.as_deref(),
                now,
            )
            .await?
        } else {
            Self::apply_standard_rules(state, &mut item, stored.as_ref(), from.as_ref(), to.as_ref(), now)
                .await?;
            None
        };

        Self::ensure_contents_uploaded(state, &item, stored.as_ref()).await?;

        let saved = ItemRepo::upsert(&state.pool, &item).await?.into_domain()?;
        if let Some(curation) = curation.filter(|c| c.content_hash != saved.local_content_hash) {
            ItemCurationRepo::update_content_hash(
                &state.pool,
                curation.id,
                saved.local_content_hash.as_deref(),
            )
            .await?;
            tracing::debug!(item_id = %id, curation_id = %curation.id, "Curation content hash synced");
        }

        tracing::info!(
            item_id = %id,
            eth_address = %caller,
            collection_id = ?saved.collection_id,
            created = stored.is_none(),
            "Item upserted",
        );
        Self::consolidate_one(state, saved, to).await
    }

    /// Rules for items of standard collections.
    async fn apply_standard_rules(
        state: &AppState,
        item: &mut Item,
        stored: Option<&Item>,
        from: Option<&Collection>,
        to: Option<&Collection>,
        now: Timestamp,
    ) -> AppResult<()> {
        let moving = from.map(|c| c.id) != to.map(|c| c.id);
        let from_published = match from {
            Some(from) => CollectionService::is_published(state, from).await?,
            None => false,
        };
        let to_published = match to {
            Some(_) if !moving => from_published,
            Some(to) => CollectionService::is_published(state, to).await?,
            None => false,
        };

        if let Some(from) = from {
            if from_published {
                if moving {
                    return Err(CoreError::AlreadyPublished {
                        entity: "Collection",
                        id: from.id,
                    }
                    .into());
                }
                if let Some(stored) = stored {
                    if stored.rarity != item.rarity {
                        return Err(CoreError::ItemPublishedRarityChange { id: item.id }.into());
                    }
                    item.video = resolve_video(
                        true,
                        stored.is_smart_wearable(),
                        stored.video.as_deref(),
                        item.video.take(),
                    );
                }
            } else if from.is_lock_active(now) {
                return Err(CoreError::Locked {
                    entity: "Collection",
                    id: from.id,
                }
                .into());
            }
        }

        if let Some(to) = to.filter(|_| moving) {
            if to_published {
                return Err(CoreError::AlreadyPublished {
                    entity: "Collection",
                    id: to.id,
                }
                .into());
            }
            if to.is_lock_active(now) {
                return Err(CoreError::Locked {
                    entity: "Collection",
                    id: to.id,
                }
                .into());
            }
            // Chain ids only mean something inside the contract that minted them.
            item.blockchain_item_id = None;
        }
        if to.is_none() {
            item.blockchain_item_id = None;
        }

        if to_published && item.rarity.is_none() {
            return Err(CoreError::Validation(format!(
                "Item {} belongs to a published collection and needs a rarity",
                item.id
            ))
            .into());
        }

        item.urn_suffix = None;
        item.local_content_hash = match to {
            Some(collection)
                if item.blockchain_item_id.is_some() && collection.contract_address().is_some() =>
            {
                Some(calculate_item_content_hash(
                    item,
                    collection,
                    state.config.network,
                    state.config.emote_format(),
                )?)
            }
            _ => None,
        };
        Ok(())
    }

    /// Rules for third party items. Returns the item's latest curation so
    /// its content hash can follow the item's.
    async fn apply_third_party_rules(
        state: &AppState,
        item: &mut Item,
        stored: Option<&Item>,
        from: Option<&Collection>,
        to: Option<&Collection>,
        urn: Option<&str>,
        now: Timestamp,
    ) -> AppResult<Option<ItemCuration>> {
        let moving = from.map(|c| c.id) != to.map(|c| c.id);
        let touched = from.into_iter().chain(to.filter(|_| moving));
        for collection in touched {
            if collection.is_lock_active(now)
                && !CollectionService::is_published(state, collection).await?
            {
                return Err(CoreError::Locked {
                    entity: "Collection",
                    id: collection.id,
                }
                .into());
            }
        }

        let destination_tp = to.and_then(Collection::third_party);
        if to.is_some() && destination_tp.is_none() {
            return Err(CoreError::Validation(format!(
                "Third party item {} can only belong to a third party collection",
                item.id
            ))
            .into());
        }

        let suffix = match urn {
            Some(urn) => {
                let decoded = decode_tp_item_urn(urn)?;
                let tp = destination_tp.ok_or_else(|| {
                    CoreError::Validation(format!(
                        "The URN '{urn}' needs a third party collection"
                    ))
                })?;
                if decoded.third_party_id != tp.third_party_id
                    || decoded.collection_urn_suffix != tp.urn_suffix
                {
                    return Err(CoreError::Validation(format!(
                        "The URN '{urn}' doesn't belong to collection {}",
                        tp.urn()
                    ))
                    .into());
                }
                decoded.item_urn_suffix
            }
            None => item.urn_suffix.clone().ok_or_else(|| {
                CoreError::Validation(format!("Third party item {} needs a URN", item.id))
            })?,
        };

        let stored_suffix = stored.and_then(|s| s.urn_suffix.as_deref());
        let suffix_changed = stored_suffix != Some(suffix.as_str());
        let curation = match stored {
            Some(_) => ItemCurationRepo::find_latest_by_item(&state.pool, item.id).await?,
            None => None,
        };
        if suffix_changed && stored_suffix.is_some() && curation.is_some() {
            return Err(CoreError::UrnSuffixChange { id: item.id }.into());
        }

        if let Some(tp) = destination_tp.filter(|_| suffix_changed || moving) {
            let full_urn = tp_item_urn(tp, &suffix);
            let in_use = ItemRepo::is_urn_in_use(
                &state.pool,
                &tp.third_party_id,
                &tp.urn_suffix,
                &suffix,
                item.id,
            )
            .await?;
            if in_use || state.catalyst.entity_by_urn(&full_urn).await?.is_some() {
                return Err(CoreError::UrnAlreadyInUse { urn: full_urn }.into());
            }
        }

        item.urn_suffix = Some(suffix);
        item.local_content_hash = match to {
            Some(collection) => Some(calculate_item_content_hash(
                item,
                collection,
                state.config.network,
                state.config.emote_format(),
            )?),
            None => None,
        };
        Ok(curation)
    }

    /// Every content hash the item did not have before must be in the
    /// object store.
    async fn ensure_contents_uploaded(
        state: &AppState,
        item: &Item,
        stored: Option<&Item>,
    ) -> AppResult<()> {
        let known: HashSet<&str> = stored
            .map(|s| s.contents.values().map(String::as_str).collect())
            .unwrap_or_default();
        let mut fresh: Vec<String> = item
            .contents
            .values()
            .filter(|hash| !known.contains(hash.as_str()))
            .cloned()
            .collect();
        fresh.sort();
        fresh.dedup();
        if fresh.is_empty() {
            return Ok(());
        }

        let missing = state.objects.missing(&fresh).await?;
        if !missing.is_empty() {
            return Err(CoreError::ItemContentsNotUploaded { id: item.id, missing }.into());
        }
        Ok(())
    }

    /// Delete an item that was never published.
    pub async fn delete(state: &AppState, id: DbId, caller: &str) -> AppResult<()> {
        let item = Self::load(state, id).await?;
        let collection = Self::load_collection(state, item.collection_id).await?;

        match &collection {
            Some(collection) => access::ensure_owned_or_managed(state, collection, caller).await?,
            None => ensure_item_owner(&item, caller)?,
        }

        if let Some(collection) = &collection {
            match &collection.kind {
                CollectionKind::Standard(_) => {
                    if CollectionService::is_published(state, collection).await? {
                        return Err(CoreError::AlreadyPublished {
                            entity: "Collection",
                            id: collection.id,
                        }
                        .into());
                    }
                }
                CollectionKind::ThirdParty(tp) => {
                    if collection.is_lock_active(state.clock.now()) {
                        return Err(CoreError::Locked {
                            entity: "Collection",
                            id: collection.id,
                        }
                        .into());
                    }
                    let curated = ItemCurationRepo::find_latest_by_item(&state.pool, id)
                        .await?
                        .is_some();
                    if let Some(suffix) = item.urn_suffix.as_deref().filter(|_| curated) {
                        let urn = tp_item_urn(tp, suffix);
                        if state.catalyst.entity_by_urn(&urn).await?.is_some() {
                            return Err(CoreError::AlreadyPublished { entity: "Item", id }.into());
                        }
                    }
                }
            }
        }

        if !ItemRepo::delete(&state.pool, id).await? {
            return Err(CoreError::not_found("Item", id).into());
        }
        tracing::info!(item_id = %id, eth_address = %caller, "Item deleted");
        Ok(())
    }
}
