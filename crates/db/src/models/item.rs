//! Item rows.

use std::collections::BTreeMap;

use builder_core::error::CoreError;
use builder_core::item::{Item, ItemData, ItemMetrics};
use builder_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ItemRow {
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
    pub rarity: Option<String>,
    #[sqlx(rename = "type")]
    pub item_type: String,
    pub data: Json<ItemData>,
    pub metrics: Json<ItemMetrics>,
    pub contents: Json<BTreeMap<String, String>>,
    pub video: Option<String>,
    pub local_content_hash: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ItemRow {
    pub fn into_domain(self) -> Result<Item, CoreError> {
        let rarity = self
            .rarity
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e| CoreError::Inconsistent(format!("Item {}: {e}", self.id)))?;
        let item_type = self
            .item_type
            .parse()
            .map_err(|e| CoreError::Inconsistent(format!("Item {}: {e}", self.id)))?;

        Ok(Item {
            id: self.id,
            urn_suffix: self.urn_suffix,
            name: self.name,
            description: self.description,
            thumbnail: self.thumbnail,
            eth_address: self.eth_address,
            collection_id: self.collection_id,
            blockchain_item_id: self.blockchain_item_id,
            price: self.price,
            beneficiary: self.beneficiary,
            rarity,
            item_type,
            data: self.data.0,
            metrics: self.metrics.0,
            contents: self.contents.0,
            video: self.video,
            local_content_hash: self.local_content_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Convert a batch of rows, failing on the first inconsistent one.
pub fn into_domain_items(rows: Vec<ItemRow>) -> Result<Vec<Item>, CoreError> {
    rows.into_iter().map(ItemRow::into_domain).collect()
}

/// A chain-assigned id to persist on an item, with the hash recomputed for it.
#[derive(Debug, Clone)]
pub struct BlockchainIdUpdate {
    pub item_id: DbId,
    pub blockchain_item_id: String,
    pub local_content_hash: Option<String>,
}
