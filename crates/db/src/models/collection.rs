//! Collection rows.

use builder_core::collection::{Collection, CollectionKind};
use builder_core::error::CoreError;
use builder_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `collections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CollectionRow {
    pub id: DbId,
    pub name: String,
    pub eth_address: String,
    pub salt: Option<String>,
    pub contract_address: Option<String>,
    pub third_party_id: Option<String>,
    pub urn_suffix: Option<String>,
    pub lock: Option<Timestamp>,
    pub minters: Vec<String>,
    pub managers: Vec<String>,
    pub reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CollectionRow {
    /// Resolve the kind columns into a domain collection.
    pub fn into_domain(self) -> Result<Collection, CoreError> {
        let kind = CollectionKind::resolve(
            self.third_party_id,
            self.urn_suffix,
            self.contract_address,
            self.salt,
        )?;
        Ok(Collection {
            id: self.id,
            name: self.name,
            eth_address: self.eth_address,
            kind,
            lock: self.lock,
            minters: self.minters,
            managers: self.managers,
            reviewed_at: self.reviewed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DTO for inserting or replacing a collection by id.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertCollection {
    pub id: DbId,
    pub name: String,
    pub eth_address: String,
    pub kind: CollectionKind,
    #[serde(default)]
    pub minters: Vec<String>,
    #[serde(default)]
    pub managers: Vec<String>,
}

impl UpsertCollection {
    /// Flatten the kind back into its nullable columns:
    /// `(salt, contract_address, third_party_id, urn_suffix)`.
    pub fn kind_columns(
        &self,
    ) -> (
        Option<&str>,
        Option<&str>,
        Option<&str>,
        Option<&str>,
    ) {
        match &self.kind {
            CollectionKind::Standard(s) => (
                s.salt.as_deref(),
                s.contract_address.as_deref(),
                None,
                None,
            ),
            CollectionKind::ThirdParty(tp) => (
                None,
                None,
                Some(tp.third_party_id.as_str()),
                Some(tp.urn_suffix.as_str()),
            ),
        }
    }
}
