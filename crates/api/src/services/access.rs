//! Who may read or change a collection.

use std::sync::Arc;

use builder_core::collection::{Collection, CollectionKind};
use builder_core::error::CoreError;
use builder_core::types::same_address;
use builder_db::repositories::VirtualThirdPartyRepo;

use crate::error::AppResult;
use crate::state::AppState;

/// Whether `address` sits on the curation committee.
///
/// Never fails: a subgraph outage falls back to the cached list.
pub async fn is_committee_member(state: &AppState, address: &str) -> bool {
    let subgraph = Arc::clone(&state.subgraph);
    state
        .committee
        .is_member(address, || async move {
            subgraph.committee_members().await.map_err(CoreError::from)
        })
        .await
}

/// Whether `address` manages the third party, as registered in the third
/// party subgraph or, until it is indexed there, as a virtual third party.
pub async fn is_third_party_manager(
    state: &AppState,
    third_party_id: &str,
    address: &str,
) -> AppResult<bool> {
    if let Some(third_party) = state.subgraph.third_party(third_party_id).await? {
        return Ok(third_party.is_manager(address));
    }
    let virtual_third_party = VirtualThirdPartyRepo::find_by_id(&state.pool, third_party_id).await?;
    Ok(virtual_third_party.is_some_and(|tp| tp.is_manager(address)))
}

/// Owner of the row, a manager of a standard collection, or a manager of
/// the third party a third party collection belongs to.
pub async fn is_owned_or_managed(
    state: &AppState,
    collection: &Collection,
    address: &str,
) -> AppResult<bool> {
    if collection.is_owned_by(address) {
        return Ok(true);
    }
    match &collection.kind {
        CollectionKind::Standard(_) => Ok(collection
            .managers
            .iter()
            .any(|manager| same_address(manager, address))),
        CollectionKind::ThirdParty(tp) => {
            is_third_party_manager(state, &tp.third_party_id, address).await
        }
    }
}

/// Fail with `NotOwnerOrManager` unless [`is_owned_or_managed`] holds.
pub async fn ensure_owned_or_managed(
    state: &AppState,
    collection: &Collection,
    address: &str,
) -> AppResult<()> {
    if is_owned_or_managed(state, collection, address).await? {
        return Ok(());
    }
    Err(CoreError::NotOwnerOrManager {
        entity: "Collection",
        id: collection.id.to_string(),
        eth_address: address.to_string(),
    }
    .into())
}

/// Like [`ensure_owned_or_managed`], but committee members may read too.
pub async fn ensure_can_read(
    state: &AppState,
    collection: &Collection,
    address: &str,
) -> AppResult<()> {
    if is_owned_or_managed(state, collection, address).await?
        || is_committee_member(state, address).await
    {
        return Ok(());
    }
    Err(CoreError::NotOwnerOrManager {
        entity: "Collection",
        id: collection.id.to_string(),
        eth_address: address.to_string(),
    }
    .into())
}
