//! Repository for the `slot_usage_cheques` table.

use builder_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::cheque::{CreateSlotUsageCheque, SlotUsageChequeRow};

const COLUMNS: &str =
    "id, signature, qty, salt, collection_id, third_party_id, created_at, updated_at";

pub struct SlotUsageChequeRepo;

impl SlotUsageChequeRepo {
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateSlotUsageCheque,
    ) -> Result<SlotUsageChequeRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO slot_usage_cheques (signature, qty, salt, collection_id, third_party_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SlotUsageChequeRow>(&query)
            .bind(&input.signature)
            .bind(input.qty)
            .bind(&input.salt)
            .bind(input.collection_id)
            .bind(&input.third_party_id)
            .fetch_one(conn)
            .await
    }

    /// The cheque of the most recent publication of a collection.
    pub async fn find_latest_by_collection(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<Option<SlotUsageChequeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM slot_usage_cheques
             WHERE collection_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, SlotUsageChequeRow>(&query)
            .bind(collection_id)
            .fetch_optional(pool)
            .await
    }
}
