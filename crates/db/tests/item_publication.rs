//! Integration tests for items, curations and third party publications.

use std::collections::BTreeMap;

use builder_core::collection::{CollectionKind, StandardCollection, ThirdPartyCollection};
use builder_core::item::{Item, ItemData, ItemMetrics, ItemType, Rarity};
use builder_db::models::cheque::CreateSlotUsageCheque;
use builder_db::models::collection::UpsertCollection;
use builder_db::models::curation::{CreateItemCuration, CurationStatus};
use builder_db::models::item::BlockchainIdUpdate;
use builder_db::repositories::publication_repo::ThirdPartyPublication;
use builder_db::repositories::{
    CollectionCurationRepo, CollectionRepo, ItemCurationRepo, ItemRepo, PublicationRepo,
    SlotUsageChequeRepo,
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

const TP_ID: &str = "urn:decentraland:amoy:collections-thirdparty:tp";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_collection(pool: &PgPool, kind: CollectionKind) -> Uuid {
    let input = UpsertCollection {
        id: Uuid::new_v4(),
        name: format!("Collection {}", Uuid::new_v4()),
        eth_address: "0xowner".into(),
        kind,
        minters: vec![],
        managers: vec![],
    };
    CollectionRepo::upsert(pool, &input).await.unwrap().id
}

async fn create_tp_collection(pool: &PgPool, suffix: &str) -> Uuid {
    create_collection(
        pool,
        CollectionKind::ThirdParty(ThirdPartyCollection {
            third_party_id: TP_ID.into(),
            urn_suffix: suffix.into(),
        }),
    )
    .await
}

fn new_item(collection_id: Option<Uuid>, urn_suffix: Option<&str>) -> Item {
    Item {
        id: Uuid::new_v4(),
        urn_suffix: urn_suffix.map(str::to_string),
        name: "Hat".into(),
        description: String::new(),
        thumbnail: "thumbnail.png".into(),
        eth_address: "0xOwner".into(),
        collection_id,
        blockchain_item_id: None,
        price: None,
        beneficiary: None,
        rarity: Some(Rarity::Rare),
        item_type: ItemType::Wearable,
        data: ItemData {
            category: "hat".into(),
            representations: vec![],
            replaces: vec![],
            hides: vec![],
            tags: vec!["summer".into()],
            loops: None,
            removes_default_hiding: None,
            block_vrm_export: None,
            required_permissions: None,
            outcomes: None,
        },
        metrics: ItemMetrics::default(),
        contents: BTreeMap::from([("thumbnail.png".to_string(), "bafkreithumb".to_string())]),
        video: None,
        local_content_hash: Some("0xhash".into()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn publication(collection_id: Uuid, items: &[Uuid]) -> ThirdPartyPublication {
    ThirdPartyPublication {
        collection_id,
        cheque: CreateSlotUsageCheque {
            signature: "0xsig".into(),
            qty: items.len() as i64,
            salt: "0xsalt".into(),
            collection_id,
            third_party_id: TP_ID.into(),
        },
        items: items
            .iter()
            .map(|&item_id| CreateItemCuration {
                item_id,
                content_hash: Some("0xhash".into()),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_item_round_trip(pool: PgPool) {
    let collection_id = create_collection(
        &pool,
        CollectionKind::Standard(StandardCollection {
            contract_address: None,
            salt: None,
        }),
    )
    .await;
    let item = new_item(Some(collection_id), None);
    let row = ItemRepo::upsert(&pool, &item).await.unwrap();
    let stored = row.into_domain().unwrap();

    assert_eq!(stored.eth_address, "0xowner");
    assert_eq!(stored.rarity, Some(Rarity::Rare));
    assert_eq!(stored.data, item.data);
    assert_eq!(stored.contents, item.contents);

    let listed = ItemRepo::list_by_collection(&pool, collection_id).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_find_by_urn(pool: PgPool) {
    let collection_id = create_tp_collection(&pool, "summer").await;
    let item = new_item(Some(collection_id), Some("hat"));
    ItemRepo::upsert(&pool, &item).await.unwrap();

    let found = ItemRepo::find_by_urn(&pool, TP_ID, "summer", "hat").await.unwrap();
    assert_eq!(found.map(|r| r.id), Some(item.id));
    assert!(ItemRepo::is_urn_in_use(&pool, TP_ID, "summer", "hat", Uuid::new_v4())
        .await
        .unwrap());
    assert!(!ItemRepo::is_urn_in_use(&pool, TP_ID, "summer", "hat", item.id)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_blockchain_id_backfill(pool: PgPool) {
    let collection_id = create_collection(
        &pool,
        CollectionKind::Standard(StandardCollection {
            contract_address: Some("0xabc".into()),
            salt: None,
        }),
    )
    .await;
    let item = new_item(Some(collection_id), None);
    ItemRepo::upsert(&pool, &item).await.unwrap();
    assert_eq!(ItemRepo::count_published(&pool, collection_id).await.unwrap(), 0);

    ItemRepo::set_blockchain_ids(
        &pool,
        &[BlockchainIdUpdate {
            item_id: item.id,
            blockchain_item_id: "0".into(),
            local_content_hash: Some("bafkreinew".into()),
        }],
    )
    .await
    .unwrap();

    assert_eq!(ItemRepo::count_published(&pool, collection_id).await.unwrap(), 1);
    let matched = ItemRepo::find_by_id(&pool, item.id).await.unwrap().unwrap();
    assert_eq!(matched.blockchain_item_id.as_deref(), Some("0"));
    assert_eq!(matched.local_content_hash.as_deref(), Some("bafkreinew"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_items_created_together_list_in_id_order(pool: PgPool) {
    let collection_id = create_tp_collection(&pool, "summer").await;
    for suffix in ["a", "b", "c", "d"] {
        ItemRepo::upsert(&pool, &new_item(Some(collection_id), Some(suffix)))
            .await
            .unwrap();
    }
    sqlx::query("UPDATE items SET created_at = $1 WHERE collection_id = $2")
        .bind(Utc::now())
        .bind(collection_id)
        .execute(&pool)
        .await
        .unwrap();

    let listed: Vec<Uuid> = ItemRepo::list_by_collection(&pool, collection_id)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.id)
        .collect();
    let mut sorted = listed.clone();
    sorted.sort();
    assert_eq!(listed.len(), 4);
    assert_eq!(listed, sorted);

    let by_owner: Vec<Uuid> = ItemRepo::list_by_owner(&pool, "0xowner")
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.id)
        .collect();
    assert_eq!(by_owner, sorted);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_by_owner_and_collections(pool: PgPool) {
    let collection_id = create_tp_collection(&pool, "listed").await;
    let attached = new_item(Some(collection_id), Some("hat"));
    let orphan = new_item(None, None);
    ItemRepo::upsert(&pool, &attached).await.unwrap();
    ItemRepo::upsert(&pool, &orphan).await.unwrap();

    let owned = ItemRepo::list_by_owner(&pool, &attached.eth_address.to_uppercase())
        .await
        .unwrap();
    assert_eq!(owned.len(), 2);

    let in_collections = ItemRepo::list_by_collections(&pool, &[collection_id])
        .await
        .unwrap();
    assert_eq!(in_collections.len(), 1);
    assert_eq!(in_collections[0].id, attached.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deleting_collection_cascades_to_items(pool: PgPool) {
    let collection_id = create_tp_collection(&pool, "gone").await;
    let item = new_item(Some(collection_id), Some("hat"));
    ItemRepo::upsert(&pool, &item).await.unwrap();

    CollectionRepo::delete(&pool, collection_id).await.unwrap();
    assert!(ItemRepo::find_by_id(&pool, item.id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Publication
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_publish_third_party_writes_everything(pool: PgPool) {
    let collection_id = create_tp_collection(&pool, "summer").await;
    let a = new_item(Some(collection_id), Some("a"));
    let b = new_item(Some(collection_id), Some("b"));
    ItemRepo::upsert(&pool, &a).await.unwrap();
    ItemRepo::upsert(&pool, &b).await.unwrap();

    let record = PublicationRepo::publish_third_party(&pool, &publication(collection_id, &[a.id, b.id]))
        .await
        .unwrap();
    assert_eq!(record.item_curations.len(), 2);
    assert_eq!(record.collection_curation.status, CurationStatus::Pending);
    assert_eq!(record.cheque.qty, 2);

    assert!(CollectionCurationRepo::has_pending(&pool, collection_id).await.unwrap());
    assert_eq!(
        ItemCurationRepo::count_items_by_third_party(&pool, TP_ID).await.unwrap(),
        2
    );
    let latest = SlotUsageChequeRepo::find_latest_by_collection(&pool, collection_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, record.cheque.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_publish_third_party_rolls_back_on_failure(pool: PgPool) {
    let collection_id = create_tp_collection(&pool, "summer").await;
    let a = new_item(Some(collection_id), Some("a"));
    ItemRepo::upsert(&pool, &a).await.unwrap();

    // The second curation points at an item that does not exist.
    let result =
        PublicationRepo::publish_third_party(&pool, &publication(collection_id, &[a.id, Uuid::new_v4()]))
            .await;
    assert!(result.is_err());

    assert!(SlotUsageChequeRepo::find_latest_by_collection(&pool, collection_id)
        .await
        .unwrap()
        .is_none());
    assert!(!ItemCurationRepo::exists_for_collection(&pool, collection_id).await.unwrap());
    assert!(CollectionCurationRepo::find_latest_by_collection(&pool, collection_id)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_content_hash_sync_resets_status(pool: PgPool) {
    let collection_id = create_tp_collection(&pool, "summer").await;
    let a = new_item(Some(collection_id), Some("a"));
    ItemRepo::upsert(&pool, &a).await.unwrap();
    PublicationRepo::publish_third_party(&pool, &publication(collection_id, &[a.id]))
        .await
        .unwrap();

    let curation = ItemCurationRepo::find_latest_by_item(&pool, a.id).await.unwrap().unwrap();
    sqlx::query("UPDATE item_curations SET status = 'approved' WHERE id = $1")
        .bind(curation.id)
        .execute(&pool)
        .await
        .unwrap();

    let updated = ItemCurationRepo::update_content_hash(&pool, curation.id, Some("0xnew"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, CurationStatus::Pending);
    assert_eq!(updated.content_hash.as_deref(), Some("0xnew"));

    let latest = ItemCurationRepo::find_latest_by_collection(&pool, collection_id)
        .await
        .unwrap();
    assert_eq!(latest.len(), 1);
}
