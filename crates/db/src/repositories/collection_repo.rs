//! Repository for the `collections` table.

use builder_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::collection::{CollectionRow, UpsertCollection};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, eth_address, salt, contract_address, third_party_id, \
    urn_suffix, lock, minters, managers, reviewed_at, created_at, updated_at";

/// Provides CRUD operations for collections.
pub struct CollectionRepo;

impl CollectionRepo {
    /// Insert a collection or replace the mutable columns of an existing one.
    ///
    /// `lock`, `reviewed_at` and `created_at` are never touched by an upsert.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertCollection,
    ) -> Result<CollectionRow, sqlx::Error> {
        let (salt, contract_address, third_party_id, urn_suffix) = input.kind_columns();
        let query = format!(
            "INSERT INTO collections
                (id, name, eth_address, salt, contract_address, third_party_id, urn_suffix,
                 minters, managers)
             VALUES ($1, $2, LOWER($3), $4, $5, $6, $7, $8, $9)
             ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                salt = EXCLUDED.salt,
                contract_address = EXCLUDED.contract_address,
                third_party_id = EXCLUDED.third_party_id,
                urn_suffix = EXCLUDED.urn_suffix,
                minters = EXCLUDED.minters,
                managers = EXCLUDED.managers
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CollectionRow>(&query)
            .bind(input.id)
            .bind(&input.name)
            .bind(&input.eth_address)
            .bind(salt)
            .bind(contract_address)
            .bind(third_party_id)
            .bind(urn_suffix)
            .bind(&input.minters)
            .bind(&input.managers)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CollectionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM collections WHERE id = $1");
        sqlx::query_as::<_, CollectionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<CollectionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM collections WHERE id = ANY($1)");
        sqlx::query_as::<_, CollectionRow>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Collections created by an address, newest first.
    pub async fn list_by_owner(
        pool: &PgPool,
        eth_address: &str,
    ) -> Result<Vec<CollectionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM collections
             WHERE LOWER(eth_address) = LOWER($1)
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, CollectionRow>(&query)
            .bind(eth_address)
            .fetch_all(pool)
            .await
    }

    /// Collections of any of the given third parties, newest first.
    pub async fn list_by_third_parties(
        pool: &PgPool,
        third_party_ids: &[String],
    ) -> Result<Vec<CollectionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM collections
             WHERE third_party_id = ANY($1)
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, CollectionRow>(&query)
            .bind(third_party_ids)
            .fetch_all(pool)
            .await
    }

    /// Whether another standard collection already uses `name`.
    pub async fn is_name_in_use(
        pool: &PgPool,
        name: &str,
        exclude_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM collections
                WHERE name = $1 AND id <> $2 AND third_party_id IS NULL
             )",
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Whether another collection of the third party already uses `urn_suffix`.
    pub async fn is_urn_suffix_in_use(
        pool: &PgPool,
        third_party_id: &str,
        urn_suffix: &str,
        exclude_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM collections
                WHERE third_party_id = $1 AND urn_suffix = $2 AND id <> $3
             )",
        )
        .bind(third_party_id)
        .bind(urn_suffix)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Set the lock timestamp. Returns `None` if no row with `id` exists.
    pub async fn lock(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<CollectionRow>, sqlx::Error> {
        let query = format!("UPDATE collections SET lock = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, CollectionRow>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Delete a collection and, through the foreign keys, its items,
    /// curations and cheques. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
