//! Entity metadata and content hashes for items.
//!
//! Stored hashes are compared byte for byte with freshly computed ones to
//! detect drift, so every shape here serializes with a fixed field order
//! (struct declaration order) and the content list is sorted by file path.

use serde::Serialize;

use crate::collection::{Collection, CollectionKind};
use crate::error::CoreError;
use crate::fragments::ContentEntry;
use crate::hashing::{cid_v1_raw, keccak256_hex};
use crate::item::{Item, ItemMetrics, ItemType, Representation};
use crate::urn::{build_tp_item_urn, decentraland_item_urn, Network};

pub const IMAGE_PATH: &str = "image.png";
pub const THUMBNAIL_PATH: &str = "thumbnail.png";

/// Which emote schema the catalyst expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmoteFormat {
    /// `emoteDataV0` alongside the wearable-shaped `data`.
    #[default]
    Legacy,
    /// `emoteDataADR74`.
    Adr74,
}

impl EmoteFormat {
    pub fn from_flag(emotes_v2_enabled: bool) -> Self {
        if emotes_v2_enabled {
            Self::Adr74
        } else {
            Self::Legacy
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct I18n {
    pub code: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WearableData {
    pub replaces: Vec<String>,
    pub hides: Vec<String>,
    pub tags: Vec<String>,
    pub representations: Vec<Representation>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removes_default_hiding: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_vrm_export: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmoteDataAdr74 {
    pub category: String,
    pub representations: Vec<Representation>,
    pub tags: Vec<String>,
    #[serde(rename = "loop")]
    pub loops: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmoteDataV0 {
    #[serde(rename = "loop")]
    pub loops: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardWearableMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub collection_address: String,
    pub rarity: String,
    pub i18n: Vec<I18n>,
    pub data: WearableData,
    pub image: &'static str,
    pub thumbnail: &'static str,
    pub metrics: ItemMetrics,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Adr74EmoteMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub collection_address: String,
    pub rarity: String,
    pub i18n: Vec<I18n>,
    #[serde(rename = "emoteDataADR74")]
    pub emote_data_adr74: EmoteDataAdr74,
    pub image: &'static str,
    pub thumbnail: &'static str,
    pub metrics: ItemMetrics,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyEmoteMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub collection_address: String,
    pub rarity: String,
    pub i18n: Vec<I18n>,
    pub data: WearableData,
    pub emote_data_v0: EmoteDataV0,
    pub image: &'static str,
    pub thumbnail: &'static str,
    pub metrics: ItemMetrics,
}

/// Third party wearables embed their file map; their hash does not cover
/// the files themselves.
#[derive(Debug, Clone, Serialize)]
pub struct ThirdPartyWearableMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub i18n: Vec<I18n>,
    pub data: WearableData,
    pub image: &'static str,
    pub thumbnail: &'static str,
    pub metrics: ItemMetrics,
    pub content: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EntityMetadata {
    Wearable(StandardWearableMetadata),
    Adr74Emote(Adr74EmoteMetadata),
    LegacyEmote(LegacyEmoteMetadata),
    ThirdParty(ThirdPartyWearableMetadata),
}

/// ADR-32 hashing input: the sorted content list next to the metadata.
#[derive(Debug, Serialize)]
struct HashableEntity<'a> {
    content: Vec<ContentEntry>,
    metadata: &'a EntityMetadata,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn i18n(name: &str) -> Vec<I18n> {
    vec![I18n {
        code: "en",
        text: name.to_string(),
    }]
}

fn wearable_data(item: &Item) -> WearableData {
    WearableData {
        replaces: item.data.replaces.clone(),
        hides: item.data.hides.clone(),
        tags: item.data.tags.clone(),
        representations: item.data.representations.clone(),
        category: item.data.category.clone(),
        removes_default_hiding: item.data.removes_default_hiding.clone(),
        block_vrm_export: item.data.block_vrm_export,
    }
}

/// Build the catalyst metadata of an item in the given collection.
///
/// Standard items need a blockchain id and a deployed collection; anything
/// else is a caller bug surfaced as `UnpublishedItemHash`.
pub fn build_entity_metadata(
    item: &Item,
    collection: &Collection,
    network: Network,
    emote_format: EmoteFormat,
) -> Result<EntityMetadata, CoreError> {
    match &collection.kind {
        CollectionKind::ThirdParty(tp) => {
            let suffix = item
                .urn_suffix
                .as_deref()
                .ok_or(CoreError::UnpublishedItemHash { id: item.id })?;
            Ok(EntityMetadata::ThirdParty(ThirdPartyWearableMetadata {
                id: build_tp_item_urn(&tp.third_party_id, &tp.urn_suffix, suffix),
                name: item.name.clone(),
                description: item.description.clone(),
                i18n: i18n(&item.name),
                data: wearable_data(item),
                image: IMAGE_PATH,
                thumbnail: THUMBNAIL_PATH,
                metrics: item.metrics.clone(),
                content: item.contents.clone(),
            }))
        }
        CollectionKind::Standard(standard) => {
            let (Some(contract), Some(token_id)) = (
                standard.contract_address.as_deref(),
                item.blockchain_item_id.as_deref(),
            ) else {
                return Err(CoreError::UnpublishedItemHash { id: item.id });
            };

            let id = decentraland_item_urn(network, contract, token_id);
            let collection_address = contract.to_lowercase();
            let rarity = item.rarity.map(|r| r.as_str().to_string()).unwrap_or_default();

            let metadata = match (item.item_type, emote_format) {
                (ItemType::Wearable, _) => EntityMetadata::Wearable(StandardWearableMetadata {
                    id,
                    name: item.name.clone(),
                    description: item.description.clone(),
                    collection_address,
                    rarity,
                    i18n: i18n(&item.name),
                    data: wearable_data(item),
                    image: IMAGE_PATH,
                    thumbnail: THUMBNAIL_PATH,
                    metrics: item.metrics.clone(),
                }),
                (ItemType::Emote, EmoteFormat::Adr74) => {
                    EntityMetadata::Adr74Emote(Adr74EmoteMetadata {
                        id,
                        name: item.name.clone(),
                        description: item.description.clone(),
                        collection_address,
                        rarity,
                        i18n: i18n(&item.name),
                        emote_data_adr74: EmoteDataAdr74 {
                            category: item.data.category.clone(),
                            representations: item.data.representations.clone(),
                            tags: item.data.tags.clone(),
                            loops: item.data.loops.unwrap_or(false),
                            outcomes: item.data.outcomes.clone(),
                        },
                        image: IMAGE_PATH,
                        thumbnail: THUMBNAIL_PATH,
                        metrics: item.metrics.clone(),
                    })
                }
                (ItemType::Emote, EmoteFormat::Legacy) => {
                    EntityMetadata::LegacyEmote(LegacyEmoteMetadata {
                        id,
                        name: item.name.clone(),
                        description: item.description.clone(),
                        collection_address,
                        rarity,
                        i18n: i18n(&item.name),
                        data: wearable_data(item),
                        emote_data_v0: EmoteDataV0 {
                            loops: item.data.loops.unwrap_or(false),
                        },
                        image: IMAGE_PATH,
                        thumbnail: THUMBNAIL_PATH,
                        metrics: item.metrics.clone(),
                    })
                }
            };
            Ok(metadata)
        }
    }
}

/// Hash of the metadata and contents the catalyst would deploy for the item.
///
/// Third party items hash to a hex Keccak-256 of the compact metadata JSON.
/// Standard items hash to the CIDv1 of the ADR-32 `{content, metadata}`
/// document.
pub fn calculate_item_content_hash(
    item: &Item,
    collection: &Collection,
    network: Network,
    emote_format: EmoteFormat,
) -> Result<String, CoreError> {
    let metadata = build_entity_metadata(item, collection, network, emote_format)?;

    match metadata {
        EntityMetadata::ThirdParty(_) => {
            let bytes = serde_json::to_vec(&metadata)
                .map_err(|e| CoreError::Internal(format!("Failed to serialize metadata: {e}")))?;
            Ok(keccak256_hex(&bytes))
        }
        _ => {
            let entity = HashableEntity {
                content: item
                    .contents
                    .iter()
                    .map(|(file, hash)| ContentEntry {
                        file: file.clone(),
                        hash: hash.clone(),
                    })
                    .collect(),
                metadata: &metadata,
            };
            let bytes = serde_json::to_vec(&entity)
                .map_err(|e| CoreError::Internal(format!("Failed to serialize entity: {e}")))?;
            cid_v1_raw(&bytes)
        }
    }
}
