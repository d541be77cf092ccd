//! Slot usage cheque rows.

use builder_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `slot_usage_cheques` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SlotUsageChequeRow {
    pub id: DbId,
    pub signature: String,
    pub qty: i64,
    pub salt: String,
    pub collection_id: DbId,
    pub third_party_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateSlotUsageCheque {
    pub signature: String,
    pub qty: i64,
    pub salt: String,
    pub collection_id: DbId,
    pub third_party_id: String,
}
