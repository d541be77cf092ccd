//! Locally created third parties.

use builder_core::types::{normalize_address, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `virtual_third_parties` table.
///
/// Stands in for a third party until the registry indexes it, so its
/// managers can already build collections.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VirtualThirdParty {
    pub id: String,
    pub name: String,
    pub description: String,
    pub managers: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl VirtualThirdParty {
    pub fn is_manager(&self, address: &str) -> bool {
        let address = normalize_address(address);
        self.managers.iter().any(|m| normalize_address(m) == address)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVirtualThirdParty {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub managers: Vec<String>,
}
