//! Merge stored rows with subgraph and catalyst data into the API-facing
//! read models.
//!
//! Nothing here writes anywhere. Field precedence per source:
//!
//! - Standard collections: a subgraph fragment with the same (lower-cased)
//!   contract address overrides name, owner, contract, approval, minters,
//!   managers and timestamps, and marks the collection published.
//! - Third party collections: published once any of their items is known to
//!   the third party subgraph; only the timestamps are taken from that item.
//! - Standard items: published when both the item fragment and its
//!   collection fragment are found. Rarity is only overridden when the chain
//!   states one; the catalyst URN wins over the chain URN.
//! - Third party items: matched by URN built locally.

use std::collections::HashMap;

use serde::Serialize;

use crate::collection::{Collection, CollectionKind, ThirdPartyCollection};
use crate::fragments::{
    item_key, parse_unix_seconds, CatalystEntity, CollectionFragment, ItemFragment,
    ThirdPartyItemFragment,
};
use crate::item::{Item, Rarity};
use crate::types::{normalize_address, DbId, Timestamp};
use crate::urn::{build_tp_item_urn, Network};

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullCollection {
    pub id: DbId,
    pub name: String,
    pub eth_address: String,
    pub contract_address: Option<String>,
    pub salt: Option<String>,
    pub third_party_id: Option<String>,
    pub urn_suffix: Option<String>,
    pub urn: Option<String>,
    pub lock: Option<Timestamp>,
    pub minters: Vec<String>,
    pub managers: Vec<String>,
    pub is_published: bool,
    pub is_approved: bool,
    pub reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FullCollection {
    /// The unpublished view of a stored collection.
    pub fn from_stored(collection: &Collection, network: Network) -> Self {
        let (contract_address, salt, third_party_id, urn_suffix) = match &collection.kind {
            CollectionKind::Standard(s) => (s.contract_address.clone(), s.salt.clone(), None, None),
            CollectionKind::ThirdParty(tp) => (
                None,
                None,
                Some(tp.third_party_id.clone()),
                Some(tp.urn_suffix.clone()),
            ),
        };

        Self {
            id: collection.id,
            name: collection.name.clone(),
            eth_address: collection.eth_address.clone(),
            contract_address,
            salt,
            third_party_id,
            urn_suffix,
            urn: collection.urn(network),
            lock: collection.lock,
            minters: collection.minters.clone(),
            managers: collection.managers.clone(),
            is_published: false,
            is_approved: false,
            reviewed_at: collection.reviewed_at,
            created_at: collection.created_at,
            updated_at: collection.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullItem {
    #[serde(flatten)]
    pub item: Item,
    pub is_published: bool,
    pub is_approved: bool,
    pub in_catalyst: bool,
    pub total_supply: u64,
    pub content_hash: Option<String>,
    pub urn: Option<String>,
}

impl FullItem {
    /// The unpublished view of a stored item.
    pub fn from_stored(item: Item) -> Self {
        Self {
            item,
            is_published: false,
            is_approved: false,
            in_catalyst: false,
            total_supply: 0,
            content_hash: None,
            urn: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Merge a standard collection with its subgraph fragment, if any.
///
/// A fragment for a different contract is ignored. Third party collections
/// are returned unpublished; use [`consolidate_tp_collection`] for them.
pub fn consolidate_collection(
    collection: &Collection,
    network: Network,
    remote: Option<&CollectionFragment>,
) -> FullCollection {
    let mut full = FullCollection::from_stored(collection, network);

    let Some(contract) = collection.contract_address() else {
        return full;
    };
    let Some(remote) = remote.filter(|r| normalize_address(&r.id) == normalize_address(contract))
    else {
        return full;
    };

    full.name = remote.name.clone();
    full.eth_address = remote.creator.clone();
    full.contract_address = Some(remote.id.clone());
    full.urn = Some(remote.urn.clone());
    full.is_published = true;
    full.is_approved = remote.is_approved;
    full.minters = remote.minters.clone();
    full.managers = remote.managers.clone();
    full.reviewed_at = remote.reviewed_at.as_deref().and_then(parse_unix_seconds);
    full.created_at = parse_unix_seconds(&remote.created_at).unwrap_or(full.created_at);
    full.updated_at = parse_unix_seconds(&remote.updated_at).unwrap_or(full.updated_at);
    full
}

/// Merge a third party collection with the last item the third party
/// subgraph knows for it.
pub fn consolidate_tp_collection(
    collection: &Collection,
    network: Network,
    last_item: Option<&ThirdPartyItemFragment>,
) -> FullCollection {
    let mut full = FullCollection::from_stored(collection, network);

    if collection.is_third_party() {
        if let Some(item) = last_item {
            full.is_published = true;
            full.reviewed_at = item.reviewed_at.as_deref().and_then(parse_unix_seconds);
            full.created_at = parse_unix_seconds(&item.created_at).unwrap_or(full.created_at);
            full.updated_at = parse_unix_seconds(&item.updated_at).unwrap_or(full.updated_at);
        }
    }
    full
}

/// Consolidate a batch of collections.
///
/// `tp_last_items` is keyed by third party collection URN.
pub fn consolidate_collections(
    collections: &[Collection],
    network: Network,
    remote: &[CollectionFragment],
    tp_last_items: &HashMap<String, ThirdPartyItemFragment>,
) -> Vec<FullCollection> {
    let by_address: HashMap<String, &CollectionFragment> = remote
        .iter()
        .map(|r| (normalize_address(&r.id), r))
        .collect();

    collections
        .iter()
        .map(|collection| match &collection.kind {
            CollectionKind::Standard(s) => {
                let fragment = s
                    .contract_address
                    .as_deref()
                    .and_then(|address| by_address.get(&normalize_address(address)).copied());
                consolidate_collection(collection, network, fragment)
            }
            CollectionKind::ThirdParty(tp) => {
                consolidate_tp_collection(collection, network, tp_last_items.get(&tp.urn()))
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Merge a standard item with its on-chain fragment, the fragment of its
/// collection, and the catalyst entity deployed for it.
pub fn consolidate_item(
    item: Item,
    remote_item: Option<&ItemFragment>,
    remote_collection: Option<&CollectionFragment>,
    catalyst: Option<&CatalystEntity>,
) -> FullItem {
    let in_catalyst = catalyst.is_some();

    let (Some(remote_item), Some(remote_collection)) = (remote_item, remote_collection) else {
        return FullItem {
            in_catalyst,
            ..FullItem::from_stored(item)
        };
    };

    let mut item = item;
    item.price = Some(remote_item.price.clone());
    item.beneficiary = Some(remote_item.beneficiary.clone());
    item.blockchain_item_id = Some(remote_item.blockchain_id.clone());
    if let Some(rarity) = remote_item
        .rarity
        .as_deref()
        .and_then(|r| r.parse::<Rarity>().ok())
    {
        item.rarity = Some(rarity);
    }

    let urn = match catalyst.and_then(CatalystEntity::urn) {
        Some(urn) => urn.to_string(),
        None => remote_item.urn.clone(),
    };

    FullItem {
        item,
        is_published: true,
        is_approved: remote_collection.is_approved,
        in_catalyst,
        total_supply: remote_item.total_supply.parse().unwrap_or(0),
        content_hash: remote_item.content_hash.clone(),
        urn: Some(urn),
    }
}

/// Merge a third party item with the third party subgraph and catalyst.
pub fn consolidate_tp_item(
    item: Item,
    collection: &ThirdPartyCollection,
    fragment: Option<&ThirdPartyItemFragment>,
    catalyst: Option<&CatalystEntity>,
) -> FullItem {
    let urn = item.urn_suffix.as_deref().map(|suffix| {
        build_tp_item_urn(&collection.third_party_id, &collection.urn_suffix, suffix)
    });

    let mut full = FullItem {
        in_catalyst: catalyst.is_some(),
        urn,
        ..FullItem::from_stored(item)
    };

    if let Some(fragment) = fragment {
        full.is_published = true;
        full.is_approved = fragment.is_approved;
        full.item.blockchain_item_id = Some(fragment.blockchain_item_id.clone());
        full.content_hash = fragment.content_hash.clone();
    }
    full
}

/// Remote data fetched for a batch of items.
#[derive(Debug, Default)]
pub struct RemoteItemData<'a> {
    pub items: &'a [ItemFragment],
    pub collections: &'a [CollectionFragment],
    pub tp_items: &'a [ThirdPartyItemFragment],
    pub catalyst: &'a [CatalystEntity],
}

/// Consolidate a batch of items against the collections they belong to.
pub fn consolidate_items(
    items: Vec<Item>,
    collections: &HashMap<DbId, Collection>,
    remote: &RemoteItemData<'_>,
) -> Vec<FullItem> {
    let items_by_key: HashMap<String, &ItemFragment> = remote
        .items
        .iter()
        .map(|r| (item_key(&r.collection_address, &r.blockchain_id), r))
        .collect();
    let collections_by_address: HashMap<String, &CollectionFragment> = remote
        .collections
        .iter()
        .map(|r| (normalize_address(&r.id), r))
        .collect();
    let tp_items_by_urn: HashMap<&str, &ThirdPartyItemFragment> = remote
        .tp_items
        .iter()
        .map(|r| (r.urn.as_str(), r))
        .collect();
    let catalyst_by_urn: HashMap<&str, &CatalystEntity> = remote
        .catalyst
        .iter()
        .filter_map(|e| e.urn().map(|urn| (urn, e)))
        .collect();

    items
        .into_iter()
        .map(|item| {
            let collection = item.collection_id.and_then(|id| collections.get(&id));
            match collection.map(|c| &c.kind) {
                Some(CollectionKind::ThirdParty(tp)) => {
                    let urn = item.urn_suffix.as_deref().map(|suffix| {
                        build_tp_item_urn(&tp.third_party_id, &tp.urn_suffix, suffix)
                    });
                    let fragment = urn.as_deref().and_then(|u| tp_items_by_urn.get(u).copied());
                    let entity = urn.as_deref().and_then(|u| catalyst_by_urn.get(u).copied());
                    consolidate_tp_item(item, tp, fragment, entity)
                }
                Some(CollectionKind::Standard(s)) => {
                    let contract = s.contract_address.as_deref();
                    let remote_item = match (contract, item.blockchain_item_id.as_deref()) {
                        (Some(address), Some(blockchain_id)) => {
                            items_by_key.get(&item_key(address, blockchain_id)).copied()
                        }
                        _ => None,
                    };
                    let remote_collection = contract
                        .and_then(|address| collections_by_address.get(&normalize_address(address)))
                        .copied();
                    let entity = remote_item.and_then(|r| catalyst_by_urn.get(r.urn.as_str()).copied());
                    consolidate_item(item, remote_item, remote_collection, entity)
                }
                None => FullItem::from_stored(item),
            }
        })
        .collect()
}

/// Append items discovered remotely to the ones read from the database,
/// keeping the database shape when both contain the same id.
pub fn merge_discovered(known: Vec<FullItem>, discovered: Vec<FullItem>) -> Vec<FullItem> {
    let mut seen: std::collections::HashSet<DbId> = known.iter().map(|i| i.item.id).collect();
    let mut merged = known;
    for item in discovered {
        if seen.insert(item.item.id) {
            merged.push(item);
        }
    }
    merged
}
