//! Repository for the `virtual_third_parties` table.

use sqlx::PgPool;

use crate::models::third_party::{CreateVirtualThirdParty, VirtualThirdParty};

const COLUMNS: &str = "id, name, description, managers, created_at, updated_at";

pub struct VirtualThirdPartyRepo;

impl VirtualThirdPartyRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateVirtualThirdParty,
    ) -> Result<VirtualThirdParty, sqlx::Error> {
        let managers: Vec<String> = input.managers.iter().map(|m| m.to_lowercase()).collect();
        let query = format!(
            "INSERT INTO virtual_third_parties (id, name, description, managers)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VirtualThirdParty>(&query)
            .bind(&input.id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&managers)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<VirtualThirdParty>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM virtual_third_parties WHERE id = $1");
        sqlx::query_as::<_, VirtualThirdParty>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Virtual third parties managed by an address.
    pub async fn list_by_manager(
        pool: &PgPool,
        eth_address: &str,
    ) -> Result<Vec<VirtualThirdParty>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM virtual_third_parties
             WHERE LOWER($1) = ANY(managers)
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, VirtualThirdParty>(&query)
            .bind(eth_address)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM virtual_third_parties WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
