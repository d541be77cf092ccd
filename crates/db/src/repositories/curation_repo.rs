//! Repository for the `item_curations` and `collection_curations` tables.

use builder_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::curation::{
    CollectionCuration, CreateItemCuration, CurationStatus, ItemCuration,
};

const ITEM_COLUMNS: &str = "id, item_id, status, content_hash, created_at, updated_at";

const COLLECTION_COLUMNS: &str = "id, collection_id, status, created_at, updated_at";

/// Provides operations for item curations.
pub struct ItemCurationRepo;

impl ItemCurationRepo {
    /// Insert one pending curation per entry on the given connection.
    pub async fn create_pending(
        conn: &mut PgConnection,
        inputs: &[CreateItemCuration],
    ) -> Result<Vec<ItemCuration>, sqlx::Error> {
        let query = format!(
            "INSERT INTO item_curations (item_id, status, content_hash)
             VALUES ($1, 'pending', $2)
             RETURNING {ITEM_COLUMNS}"
        );
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let row = sqlx::query_as::<_, ItemCuration>(&query)
                .bind(input.item_id)
                .bind(&input.content_hash)
                .fetch_one(&mut *conn)
                .await?;
            created.push(row);
        }
        Ok(created)
    }

    /// Most recent curation of an item.
    pub async fn find_latest_by_item(
        pool: &PgPool,
        item_id: DbId,
    ) -> Result<Option<ItemCuration>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM item_curations
             WHERE item_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ItemCuration>(&query)
            .bind(item_id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent curation of every item in a collection.
    pub async fn find_latest_by_collection(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<Vec<ItemCuration>, sqlx::Error> {
        sqlx::query_as::<_, ItemCuration>(
            "SELECT DISTINCT ON (ic.item_id)
                ic.id, ic.item_id, ic.status, ic.content_hash, ic.created_at, ic.updated_at
             FROM item_curations ic
             JOIN items i ON i.id = ic.item_id
             WHERE i.collection_id = $1
             ORDER BY ic.item_id, ic.created_at DESC",
        )
        .bind(collection_id)
        .fetch_all(pool)
        .await
    }

    /// Whether any item of the collection was ever sent to curation.
    pub async fn exists_for_collection(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM item_curations ic
                JOIN items i ON i.id = ic.item_id
                WHERE i.collection_id = $1
             )",
        )
        .bind(collection_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Slots already spent by a third party: one per curated item.
    pub async fn count_items_by_third_party(
        pool: &PgPool,
        third_party_id: &str,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT ic.item_id) FROM item_curations ic
             JOIN items i ON i.id = ic.item_id
             JOIN collections c ON c.id = i.collection_id
             WHERE c.third_party_id = $1",
        )
        .bind(third_party_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// Sync the hash of a curation with its item and send it back to review.
    pub async fn update_content_hash(
        pool: &PgPool,
        id: DbId,
        content_hash: Option<&str>,
    ) -> Result<Option<ItemCuration>, sqlx::Error> {
        let query = format!(
            "UPDATE item_curations SET content_hash = $2, status = 'pending'
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, ItemCuration>(&query)
            .bind(id)
            .bind(content_hash)
            .fetch_optional(pool)
            .await
    }
}

/// Provides operations for collection curations.
pub struct CollectionCurationRepo;

impl CollectionCurationRepo {
    pub async fn find_latest_by_collection(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<Option<CollectionCuration>, sqlx::Error> {
        let query = format!(
            "SELECT {COLLECTION_COLUMNS} FROM collection_curations
             WHERE collection_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, CollectionCuration>(&query)
            .bind(collection_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn has_pending(pool: &PgPool, collection_id: DbId) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM collection_curations
                WHERE collection_id = $1 AND status = $2
             )",
        )
        .bind(collection_id)
        .bind(CurationStatus::Pending)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Move the latest curation of the collection back to pending, or create
    /// the first one.
    pub async fn upsert_pending(
        conn: &mut PgConnection,
        collection_id: DbId,
    ) -> Result<CollectionCuration, sqlx::Error> {
        let update = format!(
            "UPDATE collection_curations SET status = 'pending'
             WHERE id = (
                SELECT id FROM collection_curations
                WHERE collection_id = $1
                ORDER BY created_at DESC
                LIMIT 1
             )
             RETURNING {COLLECTION_COLUMNS}"
        );
        let existing = sqlx::query_as::<_, CollectionCuration>(&update)
            .bind(collection_id)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(curation) = existing {
            return Ok(curation);
        }

        let insert = format!(
            "INSERT INTO collection_curations (collection_id, status)
             VALUES ($1, 'pending')
             RETURNING {COLLECTION_COLUMNS}"
        );
        sqlx::query_as::<_, CollectionCuration>(&insert)
            .bind(collection_id)
            .fetch_one(&mut *conn)
            .await
    }
}
