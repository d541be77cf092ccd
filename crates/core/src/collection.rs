//! Collection domain type, kind discrimination, and lifecycle rules.
//!
//! A collection is either standard (published by deploying a contract) or
//! third party (published through signed slot cheques and curations). The
//! kind is resolved once, when a row is loaded, and never changes.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{same_address, DbId, Timestamp};
use crate::urn::{build_tp_collection_urn, decentraland_collection_urn, Network};

/// How long a lock blocks edits after it was set.
pub const LOCK_DURATION_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardCollection {
    pub contract_address: Option<String>,
    pub salt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartyCollection {
    pub third_party_id: String,
    pub urn_suffix: String,
}

impl ThirdPartyCollection {
    pub fn urn(&self) -> String {
        build_tp_collection_urn(&self.third_party_id, &self.urn_suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionKind {
    Standard(StandardCollection),
    ThirdParty(ThirdPartyCollection),
}

impl CollectionKind {
    /// Decide the kind from the nullable columns of a stored row or request.
    ///
    /// Both third party columns set means third party, neither set means
    /// standard. Anything in between, or a third party collection carrying a
    /// contract address, is rejected.
    pub fn resolve(
        third_party_id: Option<String>,
        urn_suffix: Option<String>,
        contract_address: Option<String>,
        salt: Option<String>,
    ) -> Result<Self, CoreError> {
        match (third_party_id, urn_suffix) {
            (Some(third_party_id), Some(urn_suffix)) => {
                if contract_address.is_some() {
                    return Err(CoreError::Inconsistent(format!(
                        "Third party collection {third_party_id}:{urn_suffix} has a contract address"
                    )));
                }
                Ok(Self::ThirdParty(ThirdPartyCollection {
                    third_party_id,
                    urn_suffix,
                }))
            }
            (None, None) => Ok(Self::Standard(StandardCollection {
                contract_address,
                salt,
            })),
            (tp, suffix) => Err(CoreError::Inconsistent(format!(
                "Collection is partially third party (third_party_id: {tp:?}, urn_suffix: {suffix:?})"
            ))),
        }
    }

    pub fn is_third_party(&self) -> bool {
        matches!(self, Self::ThirdParty(_))
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// A collection as stored, with its kind already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: DbId,
    pub name: String,
    pub eth_address: String,
    pub kind: CollectionKind,
    pub lock: Option<Timestamp>,
    pub minters: Vec<String>,
    pub managers: Vec<String>,
    pub reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Collection {
    pub fn is_third_party(&self) -> bool {
        self.kind.is_third_party()
    }

    pub fn third_party(&self) -> Option<&ThirdPartyCollection> {
        match &self.kind {
            CollectionKind::ThirdParty(tp) => Some(tp),
            CollectionKind::Standard(_) => None,
        }
    }

    pub fn contract_address(&self) -> Option<&str> {
        match &self.kind {
            CollectionKind::Standard(s) => s.contract_address.as_deref(),
            CollectionKind::ThirdParty(_) => None,
        }
    }

    pub fn is_owned_by(&self, address: &str) -> bool {
        same_address(&self.eth_address, address)
    }

    /// The collection URN, when one can be derived locally.
    pub fn urn(&self, network: Network) -> Option<String> {
        match &self.kind {
            CollectionKind::Standard(s) => s
                .contract_address
                .as_deref()
                .map(|address| decentraland_collection_urn(network, address)),
            CollectionKind::ThirdParty(tp) => Some(tp.urn()),
        }
    }

    pub fn is_lock_active(&self, now: Timestamp) -> bool {
        is_lock_active(self.lock, now)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Whether a lock set at `lock` still blocks edits at `now`.
pub fn is_lock_active(lock: Option<Timestamp>, now: Timestamp) -> bool {
    match lock {
        Some(locked_at) => now < locked_at + Duration::hours(LOCK_DURATION_HOURS),
        None => false,
    }
}

/// Conceptual publication state of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionState {
    Draft,
    Locked,
    Published,
}

/// Publication wins over an active lock.
pub fn collection_state(is_published: bool, lock: Option<Timestamp>, now: Timestamp) -> CollectionState {
    if is_published {
        CollectionState::Published
    } else if is_lock_active(lock, now) {
        CollectionState::Locked
    } else {
        CollectionState::Draft
    }
}

/// Reject mutations of a published or locked collection.
pub fn ensure_editable(id: DbId, state: CollectionState) -> Result<(), CoreError> {
    match state {
        CollectionState::Draft => Ok(()),
        CollectionState::Locked => Err(CoreError::Locked {
            entity: "Collection",
            id,
        }),
        CollectionState::Published => Err(CoreError::AlreadyPublished {
            entity: "Collection",
            id,
        }),
    }
}

/// Combine the kind of a stored collection with the one an upsert sends.
///
/// The kind, the third party and an assigned contract (with its salt) are
/// fixed for the life of a collection. A standard upsert that omits the
/// contract keeps the stored one. A third party collection may take a new
/// URN suffix.
pub fn merge_kind(
    id: DbId,
    stored: &CollectionKind,
    incoming: CollectionKind,
) -> Result<CollectionKind, CoreError> {
    match (stored, incoming) {
        (CollectionKind::Standard(stored), CollectionKind::Standard(incoming)) => {
            let Some(contract) = stored.contract_address.as_deref() else {
                return Ok(CollectionKind::Standard(StandardCollection {
                    contract_address: incoming.contract_address,
                    salt: incoming.salt.or_else(|| stored.salt.clone()),
                }));
            };
            let contract_changed = incoming
                .contract_address
                .as_deref()
                .is_some_and(|incoming| !same_address(incoming, contract));
            let salt_changed = match (incoming.salt.as_deref(), stored.salt.as_deref()) {
                (Some(incoming), Some(stored)) => !incoming.eq_ignore_ascii_case(stored),
                (Some(_), None) => true,
                (None, _) => false,
            };
            if contract_changed || salt_changed {
                return Err(CoreError::CollectionContractChange { id });
            }
            Ok(CollectionKind::Standard(stored.clone()))
        }
        (CollectionKind::ThirdParty(stored), CollectionKind::ThirdParty(incoming)) => {
            if stored.third_party_id != incoming.third_party_id {
                return Err(CoreError::CollectionThirdPartyChange {
                    id,
                    from: stored.third_party_id.clone(),
                    to: incoming.third_party_id,
                });
            }
            Ok(CollectionKind::ThirdParty(incoming))
        }
        _ => Err(CoreError::CollectionKindChange { id }),
    }
}
