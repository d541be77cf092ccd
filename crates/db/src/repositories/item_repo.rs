//! Repository for the `items` table.

use builder_core::item::Item;
use builder_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::item::{BlockchainIdUpdate, ItemRow};

const COLUMNS: &str = "id, urn_suffix, name, description, thumbnail, eth_address, \
    collection_id, blockchain_item_id, price, beneficiary, rarity, type, data, metrics, \
    contents, video, local_content_hash, created_at, updated_at";

/// Same columns qualified with the `i` alias, for joins.
const ITEM_ALIAS_COLUMNS: &str = "i.id, i.urn_suffix, i.name, i.description, i.thumbnail, \
    i.eth_address, i.collection_id, i.blockchain_item_id, i.price, i.beneficiary, i.rarity, \
    i.type, i.data, i.metrics, i.contents, i.video, i.local_content_hash, i.created_at, \
    i.updated_at";

/// Provides CRUD operations for items.
pub struct ItemRepo;

impl ItemRepo {
    /// Insert an item or overwrite every mutable column of an existing one.
    pub async fn upsert(pool: &PgPool, item: &Item) -> Result<ItemRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO items
                (id, urn_suffix, name, description, thumbnail, eth_address, collection_id,
                 blockchain_item_id, price, beneficiary, rarity, type, data, metrics, contents,
                 video, local_content_hash)
             VALUES ($1, $2, $3, $4, $5, LOWER($6), $7, $8, $9, $10, $11, $12, $13, $14, $15,
                     $16, $17)
             ON CONFLICT (id) DO UPDATE SET
                urn_suffix = EXCLUDED.urn_suffix,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                thumbnail = EXCLUDED.thumbnail,
                collection_id = EXCLUDED.collection_id,
                blockchain_item_id = EXCLUDED.blockchain_item_id,
                price = EXCLUDED.price,
                beneficiary = EXCLUDED.beneficiary,
                rarity = EXCLUDED.rarity,
                type = EXCLUDED.type,
                data = EXCLUDED.data,
                metrics = EXCLUDED.metrics,
                contents = EXCLUDED.contents,
                video = EXCLUDED.video,
                local_content_hash = EXCLUDED.local_content_hash
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(item.id)
            .bind(&item.urn_suffix)
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.thumbnail)
            .bind(&item.eth_address)
            .bind(item.collection_id)
            .bind(&item.blockchain_item_id)
            .bind(&item.price)
            .bind(&item.beneficiary)
            .bind(item.rarity.map(|r| r.as_str()))
            .bind(item.item_type.as_str())
            .bind(Json(&item.data))
            .bind(Json(&item.metrics))
            .bind(Json(&item.contents))
            .bind(&item.video)
            .bind(&item.local_content_hash)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ItemRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM items WHERE id = $1");
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<ItemRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM items WHERE id = ANY($1)");
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Items of a collection, oldest first.
    pub async fn list_by_collection(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<Vec<ItemRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM items WHERE collection_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(collection_id)
            .fetch_all(pool)
            .await
    }

    /// Items in any of `collection_ids`, oldest first.
    pub async fn list_by_collections(
        pool: &PgPool,
        collection_ids: &[DbId],
    ) -> Result<Vec<ItemRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM items WHERE collection_id = ANY($1) ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(collection_ids)
            .fetch_all(pool)
            .await
    }

    /// Items created by `eth_address`, orphans included.
    pub async fn list_by_owner(pool: &PgPool, eth_address: &str) -> Result<Vec<ItemRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM items WHERE eth_address = LOWER($1) ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(eth_address)
            .fetch_all(pool)
            .await
    }

    /// Resolve a third party item by the parts of its URN.
    pub async fn find_by_urn(
        pool: &PgPool,
        third_party_id: &str,
        collection_urn_suffix: &str,
        item_urn_suffix: &str,
    ) -> Result<Option<ItemRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_ALIAS_COLUMNS} FROM items i
             JOIN collections c ON c.id = i.collection_id
             WHERE c.third_party_id = $1 AND c.urn_suffix = $2 AND i.urn_suffix = $3"
        );
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(third_party_id)
            .bind(collection_urn_suffix)
            .bind(item_urn_suffix)
            .fetch_optional(pool)
            .await
    }

    /// Whether an item other than `exclude_id` already has this URN.
    pub async fn is_urn_in_use(
        pool: &PgPool,
        third_party_id: &str,
        collection_urn_suffix: &str,
        item_urn_suffix: &str,
        exclude_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM items i
                JOIN collections c ON c.id = i.collection_id
                WHERE c.third_party_id = $1 AND c.urn_suffix = $2
                  AND i.urn_suffix = $3 AND i.id <> $4
             )",
        )
        .bind(third_party_id)
        .bind(collection_urn_suffix)
        .bind(item_urn_suffix)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Number of items of a collection that already have a chain id.
    pub async fn count_published(pool: &PgPool, collection_id: DbId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM items
             WHERE collection_id = $1 AND blockchain_item_id IS NOT NULL",
        )
        .bind(collection_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// Persist chain ids discovered for a collection, all or nothing.
    pub async fn set_blockchain_ids(
        pool: &PgPool,
        updates: &[BlockchainIdUpdate],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for update in updates {
            sqlx::query(
                "UPDATE items SET blockchain_item_id = $2, local_content_hash = $3 WHERE id = $1",
            )
            .bind(update.item_id)
            .bind(&update.blockchain_item_id)
            .bind(&update.local_content_hash)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Permanently delete an item. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
