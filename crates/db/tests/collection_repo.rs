//! Integration tests for the collections repository.

use assert_matches::assert_matches;
use builder_core::collection::{CollectionKind, StandardCollection, ThirdPartyCollection};
use builder_db::models::collection::UpsertCollection;
use builder_db::repositories::CollectionRepo;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

const TP_ID: &str = "urn:decentraland:amoy:collections-thirdparty:tp";

fn standard(name: &str) -> UpsertCollection {
    UpsertCollection {
        id: Uuid::new_v4(),
        name: name.to_string(),
        eth_address: "0xOwner".to_string(),
        kind: CollectionKind::Standard(StandardCollection {
            contract_address: None,
            salt: Some("0x01".into()),
        }),
        minters: vec![],
        managers: vec![],
    }
}

fn third_party(name: &str, suffix: &str) -> UpsertCollection {
    UpsertCollection {
        kind: CollectionKind::ThirdParty(ThirdPartyCollection {
            third_party_id: TP_ID.to_string(),
            urn_suffix: suffix.to_string(),
        }),
        ..standard(name)
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_upsert_inserts_then_updates(pool: PgPool) {
    let mut input = standard("Summer");
    let created = CollectionRepo::upsert(&pool, &input).await.unwrap();
    assert_eq!(created.eth_address, "0xowner");
    assert!(created.lock.is_none());

    input.name = "Winter".into();
    let updated = CollectionRepo::upsert(&pool, &input).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, "Winter");
    assert_eq!(updated.created_at, created.created_at);

    let domain = updated.into_domain().unwrap();
    assert_matches!(domain.kind, CollectionKind::Standard(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_third_party_round_trip(pool: PgPool) {
    let input = third_party("TP", "summer");
    CollectionRepo::upsert(&pool, &input).await.unwrap();

    let row = CollectionRepo::find_by_id(&pool, input.id).await.unwrap().unwrap();
    let collection = row.into_domain().unwrap();
    assert_eq!(
        collection.third_party().map(|tp| tp.urn()),
        Some(format!("{TP_ID}:summer"))
    );
    assert!(
        CollectionRepo::is_urn_suffix_in_use(&pool, TP_ID, "summer", Uuid::new_v4())
            .await
            .unwrap()
    );
    assert!(
        !CollectionRepo::is_urn_suffix_in_use(&pool, TP_ID, "summer", input.id)
            .await
            .unwrap()
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_urn_suffix_unique_per_third_party(pool: PgPool) {
    CollectionRepo::upsert(&pool, &third_party("A", "dup")).await.unwrap();
    let err = CollectionRepo::upsert(&pool, &third_party("B", "dup"))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        sqlx::Error::Database(ref db) if db.constraint() == Some("uq_collections_third_party_urn_suffix")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_half_third_party_row_is_rejected(pool: PgPool) {
    let err = sqlx::query(
        "INSERT INTO collections (id, name, eth_address, third_party_id) VALUES ($1, 'x', '0x1', 'tp')",
    )
    .bind(Uuid::new_v4())
    .execute(&pool)
    .await
    .unwrap_err();
    assert_matches!(
        err,
        sqlx::Error::Database(ref db) if db.constraint() == Some("ck_collections_kind")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_standard_names_are_unique(pool: PgPool) {
    let first = standard("Shared");
    CollectionRepo::upsert(&pool, &first).await.unwrap();

    assert!(CollectionRepo::is_name_in_use(&pool, "Shared", Uuid::new_v4()).await.unwrap());
    assert!(!CollectionRepo::is_name_in_use(&pool, "Shared", first.id).await.unwrap());
    // Third party collections do not take part.
    CollectionRepo::upsert(&pool, &third_party("Shared", "s")).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_lock_and_list_by_owner(pool: PgPool) {
    let input = standard("Locked");
    CollectionRepo::upsert(&pool, &input).await.unwrap();

    let now = Utc::now();
    let locked = CollectionRepo::lock(&pool, input.id, now).await.unwrap().unwrap();
    assert!(locked.lock.is_some());
    assert!(CollectionRepo::lock(&pool, Uuid::new_v4(), now).await.unwrap().is_none());

    let owned = CollectionRepo::list_by_owner(&pool, "0XOWNER").await.unwrap();
    assert_eq!(owned.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete(pool: PgPool) {
    let input = standard("Gone");
    CollectionRepo::upsert(&pool, &input).await.unwrap();
    assert!(CollectionRepo::delete(&pool, input.id).await.unwrap());
    assert!(!CollectionRepo::delete(&pool, input.id).await.unwrap());
    assert!(CollectionRepo::find_by_id(&pool, input.id).await.unwrap().is_none());
}
