//! Item domain types and the upsert rules that don't need I/O.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of tags on an item.
pub const MAX_TAGS_LENGTH: usize = 10;

/// Maximum number of outcomes on an emote.
pub const MAX_OUTCOMES_LENGTH: usize = 10;

/// File whose presence in a representation marks a smart wearable.
pub const SMART_WEARABLE_SCRIPT: &str = "game.js";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Wearable,
    Emote,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wearable => "wearable",
            Self::Emote => "emote",
        }
    }
}

impl FromStr for ItemType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wearable" => Ok(Self::Wearable),
            "emote" => Ok(Self::Emote),
            other => Err(CoreError::Validation(format!("Unknown item type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Unique,
    Mythic,
    Exotic,
    Legendary,
    Epic,
    Rare,
    Uncommon,
    Common,
}

impl Rarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Mythic => "mythic",
            Self::Exotic => "exotic",
            Self::Legendary => "legendary",
            Self::Epic => "epic",
            Self::Rare => "rare",
            Self::Uncommon => "uncommon",
            Self::Common => "common",
        }
    }

    /// Maximum number of mintable tokens for the rarity.
    pub fn max_supply(self) -> u64 {
        match self {
            Self::Unique => 1,
            Self::Mythic => 10,
            Self::Exotic => 50,
            Self::Legendary => 100,
            Self::Epic => 1_000,
            Self::Rare => 5_000,
            Self::Uncommon => 10_000,
            Self::Common => 100_000,
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unique" => Ok(Self::Unique),
            "mythic" => Ok(Self::Mythic),
            "exotic" => Ok(Self::Exotic),
            "legendary" => Ok(Self::Legendary),
            "epic" => Ok(Self::Epic),
            "rare" => Ok(Self::Rare),
            "uncommon" => Ok(Self::Uncommon),
            "common" => Ok(Self::Common),
            other => Err(CoreError::Validation(format!("Unknown rarity '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Item data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Representation {
    pub body_shapes: Vec<String>,
    pub main_file: String,
    pub contents: Vec<String>,
    #[serde(default)]
    pub override_hides: Vec<String>,
    #[serde(default)]
    pub override_replaces: Vec<String>,
}

/// Wearable or emote definition stored in the `data` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemData {
    pub category: String,
    #[serde(default)]
    pub representations: Vec<Representation>,
    #[serde(default)]
    pub replaces: Vec<String>,
    #[serde(default)]
    pub hides: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loops: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removes_default_hiding: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_vrm_export: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetrics {
    #[serde(default)]
    pub triangles: u64,
    #[serde(default)]
    pub materials: u64,
    #[serde(default)]
    pub textures: u64,
    #[serde(default)]
    pub meshes: u64,
    #[serde(default)]
    pub bodies: u64,
    #[serde(default)]
    pub entities: u64,
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: DbId,
    pub urn_suffix: Option<String>,
    pub name: String,
    pub description: String,
    pub thumbnail: String,
    pub eth_address: String,
    pub collection_id: Option<DbId>,
    pub blockchain_item_id: Option<String>,
    pub price: Option<String>,
    pub beneficiary: Option<String>,
    pub rarity: Option<Rarity>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub data: ItemData,
    pub metrics: ItemMetrics,
    /// File path to content hash.
    pub contents: BTreeMap<String, String>,
    pub video: Option<String>,
    pub local_content_hash: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Item {
    /// Third party items are the ones addressed by a URN suffix.
    pub fn is_third_party(&self) -> bool {
        self.urn_suffix.is_some()
    }

    pub fn is_smart_wearable(&self) -> bool {
        self.item_type == ItemType::Wearable
            && self.data.representations.iter().any(|r| {
                r.contents
                    .iter()
                    .any(|file| file.ends_with(SMART_WEARABLE_SCRIPT))
            })
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Enforce the tag ceiling without blocking edits to items that were
/// already over it, as long as the edit does not add tags.
pub fn validate_tags(
    id: DbId,
    stored_tags: Option<usize>,
    incoming_tags: usize,
) -> Result<(), CoreError> {
    if incoming_tags <= MAX_TAGS_LENGTH {
        return Ok(());
    }
    match stored_tags {
        Some(stored) if incoming_tags <= stored => Ok(()),
        _ => Err(CoreError::MaximumAmountOfTagsReached {
            id,
            max: MAX_TAGS_LENGTH,
        }),
    }
}

pub fn validate_outcomes(data: &ItemData) -> Result<(), CoreError> {
    let count = data.outcomes.as_ref().map_or(0, Vec::len);
    if count > MAX_OUTCOMES_LENGTH {
        return Err(CoreError::Validation(format!(
            "Emotes can have at most {MAX_OUTCOMES_LENGTH} outcomes (got {count})"
        )));
    }
    Ok(())
}

/// Items never cross between two different collections when either of them
/// is third party. Orphans may join any collection and any item may be
/// detached.
pub fn check_move(
    item_id: DbId,
    from: Option<&Collection>,
    to: Option<&Collection>,
) -> Result<(), CoreError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from.id != to.id && (from.is_third_party() || to.is_third_party()) {
            return Err(CoreError::ItemCantBeMovedFromCollection {
                item_id,
                from: from.id,
                to: to.id,
            });
        }
    }
    Ok(())
}

/// Smart wearable videos stay at the last published value while the
/// collection is published; the change goes through curation instead.
pub fn resolve_video(
    collection_published: bool,
    is_smart_wearable: bool,
    stored: Option<&str>,
    incoming: Option<String>,
) -> Option<String> {
    if collection_published && is_smart_wearable {
        stored.map(str::to_string)
    } else {
        incoming
    }
}
