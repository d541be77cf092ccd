//! Item and collection curation rows.

use std::fmt;

use builder_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Review state of a curation, stored as lower-case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CurationStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for CurationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

/// A row from the `item_curations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ItemCuration {
    pub id: DbId,
    pub item_id: DbId,
    pub status: CurationStatus,
    pub content_hash: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for a new pending item curation.
#[derive(Debug, Clone)]
pub struct CreateItemCuration {
    pub item_id: DbId,
    pub content_hash: Option<String>,
}

/// A row from the `collection_curations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CollectionCuration {
    pub id: DbId,
    pub collection_id: DbId,
    pub status: CurationStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
