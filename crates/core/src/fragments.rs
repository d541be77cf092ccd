//! Read-only shapes fetched from the subgraphs and the catalyst.
//!
//! Addresses are kept as returned (the subgraph lower-cases them already);
//! numeric subgraph fields arrive as decimal strings.

use serde::{Deserialize, Serialize};

use crate::types::{normalize_address, Timestamp};

/// A deployed collection contract as indexed by the collections subgraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionFragment {
    /// Contract address.
    pub id: String,
    pub creator: String,
    pub name: String,
    pub urn: String,
    pub is_approved: bool,
    pub minters: Vec<String>,
    pub managers: Vec<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// An item of a deployed collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFragment {
    /// `<collection address>-<blockchain id>`.
    pub id: String,
    pub collection_address: String,
    pub blockchain_id: String,
    pub urn: String,
    pub price: String,
    pub beneficiary: String,
    pub total_supply: String,
    pub content_hash: Option<String>,
    pub rarity: Option<String>,
    pub is_approved: bool,
    pub created_at: String,
    pub updated_at: String,
    pub reviewed_at: Option<String>,
}

/// A registered third party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirdPartyFragment {
    pub id: String,
    pub name: Option<String>,
    pub managers: Vec<String>,
    /// Total slots granted to the third party.
    pub max_items: String,
    pub is_approved: bool,
}

impl ThirdPartyFragment {
    pub fn max_items(&self) -> i64 {
        self.max_items.parse().unwrap_or(0)
    }

    pub fn is_manager(&self, address: &str) -> bool {
        let address = normalize_address(address);
        self.managers.iter().any(|m| normalize_address(m) == address)
    }
}

/// A third party item known to the third party subgraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirdPartyItemFragment {
    pub urn: String,
    /// Ordinal of the item inside its third party.
    pub blockchain_item_id: String,
    pub content_hash: Option<String>,
    pub is_approved: bool,
    pub created_at: String,
    pub updated_at: String,
    pub reviewed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub file: String,
    pub hash: String,
}

/// An active entity served by the catalyst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalystEntity {
    /// Entity content hash.
    pub id: String,
    pub pointers: Vec<String>,
    /// Deployment time in milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub content: Vec<ContentEntry>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl CatalystEntity {
    /// The URN the entity was deployed under.
    pub fn urn(&self) -> Option<&str> {
        self.metadata
            .get("id")
            .and_then(serde_json::Value::as_str)
            .or_else(|| self.pointers.first().map(String::as_str))
    }
}

/// Key used to match an item against its on-chain fragment.
pub fn item_key(collection_address: &str, blockchain_item_id: &str) -> String {
    format!("{}-{blockchain_item_id}", normalize_address(collection_address))
}

/// Convert a subgraph unix-seconds string into a timestamp.
pub fn parse_unix_seconds(value: &str) -> Option<Timestamp> {
    let secs: i64 = value.parse().ok()?;
    chrono::DateTime::from_timestamp(secs, 0)
}
