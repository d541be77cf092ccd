//! Atomic persistence of a third party publication.

use builder_core::types::DbId;
use sqlx::PgPool;

use crate::models::cheque::{CreateSlotUsageCheque, SlotUsageChequeRow};
use crate::models::curation::{CollectionCuration, CreateItemCuration, ItemCuration};
use crate::repositories::{CollectionCurationRepo, ItemCurationRepo, SlotUsageChequeRepo};

/// Everything written when a third party collection is sent to curation.
#[derive(Debug, Clone)]
pub struct ThirdPartyPublication {
    pub collection_id: DbId,
    pub cheque: CreateSlotUsageCheque,
    pub items: Vec<CreateItemCuration>,
}

#[derive(Debug, Clone)]
pub struct PublicationRecord {
    pub cheque: SlotUsageChequeRow,
    pub item_curations: Vec<ItemCuration>,
    pub collection_curation: CollectionCuration,
}

pub struct PublicationRepo;

impl PublicationRepo {
    /// Store the cheque, one pending curation per item and the pending
    /// collection curation in a single transaction.
    pub async fn publish_third_party(
        pool: &PgPool,
        input: &ThirdPartyPublication,
    ) -> Result<PublicationRecord, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let cheque = SlotUsageChequeRepo::create(&mut tx, &input.cheque).await?;
        let item_curations = ItemCurationRepo::create_pending(&mut tx, &input.items).await?;
        let collection_curation =
            CollectionCurationRepo::upsert_pending(&mut tx, input.collection_id).await?;

        tx.commit().await?;

        tracing::info!(
            collection_id = %input.collection_id,
            items = item_curations.len(),
            "Third party publication stored",
        );
        Ok(PublicationRecord {
            cheque,
            item_curations,
            collection_curation,
        })
    }
}
