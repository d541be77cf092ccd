//! HTTP-level integration tests for the `/items` endpoints and the item
//! listings hanging off collections and addresses.

mod common;

use axum::http::{Method, StatusCode};
use builder_core::types::DbId;
use builder_core::urn::build_tp_item_urn;
use common::{
    address_of, body_json, build_test_app, delete, get, item_body, manager_key, post_json,
    put_json, seed_standard_collection, seed_tp_collection, send, sign_cheque, tags, CONTRACT,
    OWNER, SALT, STRANGER, TP_ID,
};
use serde_json::{json, Value};
use sqlx::PgPool;

fn tp_item_body(collection_id: DbId, collection_suffix: &str, item_suffix: &str) -> Value {
    let mut body = item_body(Some(collection_id));
    body["urn"] = json!(build_tp_item_urn(TP_ID, collection_suffix, item_suffix));
    body
}

// ---------------------------------------------------------------------------
// Test: an item without collection belongs to its creator
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_orphan_item(pool: PgPool) {
    let test = build_test_app(pool);
    let id = DbId::new_v4();

    let response = put_json(test.app(), &format!("/api/v1/items/{id}"), OWNER, item_body(None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], id.to_string());
    assert_eq!(json["data"]["eth_address"], OWNER);
    assert!(json["data"]["collection_id"].is_null());
    assert_eq!(json["data"]["is_published"], false);
    assert!(json["data"]["urn"].is_null());
}

// ---------------------------------------------------------------------------
// Test: contents must be uploaded before they are referenced
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_contents_are_rejected(pool: PgPool) {
    let test = build_test_app(pool);
    let mut body = item_body(None);
    body["contents"]["hat.glb"] = json!("bafkreinotuploaded");

    let response = put_json(
        test.app(),
        &format!("/api/v1/items/{}", DbId::new_v4()),
        OWNER,
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("bafkreinotuploaded"));
}

// ---------------------------------------------------------------------------
// Test: items stored with too many tags keep them but can't grow
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tag_limit_is_grandfathered(pool: PgPool) {
    let test = build_test_app(pool.clone());
    let id = DbId::new_v4();
    let uri = format!("/api/v1/items/{id}");

    let mut body = item_body(None);
    body["data"]["tags"] = tags(11);
    let response = put_json(test.app(), &uri, OWNER, body.clone()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    put_json(test.app(), &uri, OWNER, item_body(None)).await;
    sqlx::query("UPDATE items SET data = jsonb_set(data, '{tags}', $1::jsonb) WHERE id = $2")
        .bind(tags(11).to_string())
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let response = put_json(test.app(), &uri, OWNER, body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);

    body["data"]["tags"] = tags(12);
    let response = put_json(test.app(), &uri, OWNER, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: only the creator edits an orphan item
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stranger_cannot_edit_orphan(pool: PgPool) {
    let test = build_test_app(pool);
    let uri = format!("/api/v1/items/{}", DbId::new_v4());
    put_json(test.app(), &uri, OWNER, item_body(None)).await;

    let response = put_json(test.app(), &uri, STRANGER, item_body(None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get(test.app(), &uri, STRANGER).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Test: items can't be added to a locked collection
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_locked_collection_rejects_new_items(pool: PgPool) {
    let collection_id = seed_standard_collection(&pool, "Locked", None).await;
    let test = build_test_app(pool);
    send(
        test.app(),
        Method::POST,
        &format!("/api/v1/collections/{collection_id}/lock"),
        Some(OWNER),
        None,
    )
    .await;

    let response = put_json(
        test.app(),
        &format!("/api/v1/items/{}", DbId::new_v4()),
        OWNER,
        item_body(Some(collection_id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::LOCKED);
}

// ---------------------------------------------------------------------------
// Test: published standard items keep their rarity and collection
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_published_standard_item_is_frozen(pool: PgPool) {
    let collection_id = seed_standard_collection(&pool, "Deployed", Some(CONTRACT)).await;
    let test = build_test_app(pool);
    let uri = format!("/api/v1/items/{}", DbId::new_v4());
    let response = put_json(test.app(), &uri, OWNER, item_body(Some(collection_id))).await;
    assert_eq!(response.status(), StatusCode::OK);

    test.subgraph.deploy_collection(CONTRACT, OWNER, 1);

    let mut body = item_body(Some(collection_id));
    body["rarity"] = json!("epic");
    let response = put_json(test.app(), &uri, OWNER, body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = put_json(test.app(), &uri, OWNER, item_body(None)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let mut body = item_body(Some(collection_id));
    body["name"] = json!("Renamed hat");
    let response = put_json(test.app(), &uri, OWNER, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "Renamed hat");
}

// ---------------------------------------------------------------------------
// Test: third party items stay in their collection
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_third_party_item_cannot_move(pool: PgPool) {
    let summer = seed_tp_collection(&pool, OWNER, "summer").await;
    let winter = seed_tp_collection(&pool, OWNER, "winter").await;
    let test = build_test_app(pool);
    let uri = format!("/api/v1/items/{}", DbId::new_v4());

    let response = put_json(test.app(), &uri, OWNER, tp_item_body(summer, "summer", "hat")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"]["urn"],
        build_tp_item_urn(TP_ID, "summer", "hat")
    );

    let mut body = item_body(Some(winter));
    body["urn"] = Value::Null;
    let response = put_json(test.app(), &uri, OWNER, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(get(test.app(), &uri, OWNER).await).await;
    assert_eq!(json["data"]["collection_id"], summer.to_string());
}

// ---------------------------------------------------------------------------
// Test: a third party URN is used at most once
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_third_party_urn_conflicts(pool: PgPool) {
    let summer = seed_tp_collection(&pool, OWNER, "summer").await;
    let test = build_test_app(pool);

    let response = put_json(
        test.app(),
        &format!("/api/v1/items/{}", DbId::new_v4()),
        OWNER,
        tp_item_body(summer, "summer", "hat"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = put_json(
        test.app(),
        &format!("/api/v1/items/{}", DbId::new_v4()),
        OWNER,
        tp_item_body(summer, "summer", "hat"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Already deployed to the catalyst by another tool.
    test.catalyst.deploy(&build_tp_item_urn(TP_ID, "summer", "cap"));
    let response = put_json(
        test.app(),
        &format!("/api/v1/items/{}", DbId::new_v4()),
        OWNER,
        tp_item_body(summer, "summer", "cap"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Test: third party items can be addressed by URN
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_upsert_by_urn(pool: PgPool) {
    let summer = seed_tp_collection(&pool, OWNER, "summer").await;
    let test = build_test_app(pool);
    let id = DbId::new_v4();
    let urn = build_tp_item_urn(TP_ID, "summer", "hat");
    put_json(
        test.app(),
        &format!("/api/v1/items/{id}"),
        OWNER,
        tp_item_body(summer, "summer", "hat"),
    )
    .await;

    let mut body = tp_item_body(summer, "summer", "hat");
    body["name"] = json!("Summer cap");
    let response = put_json(test.app(), &format!("/api/v1/items/{urn}"), OWNER, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], id.to_string());
    assert_eq!(json["data"]["name"], "Summer cap");

    let unknown = build_tp_item_urn(TP_ID, "summer", "boots");
    let response = put_json(
        test.app(),
        &format!("/api/v1/items/{unknown}"),
        OWNER,
        tp_item_body(summer, "summer", "boots"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: the URN suffix is frozen once the item was sent to curation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_curated_item_keeps_urn_suffix(pool: PgPool) {
    let key = manager_key();
    let manager = address_of(&key);
    let summer = seed_tp_collection(&pool, &manager, "summer").await;
    let test = build_test_app(pool);
    test.subgraph.add_third_party(TP_ID, &[&manager], 10);

    let id = DbId::new_v4();
    let uri = format!("/api/v1/items/{id}");
    put_json(test.app(), &uri, &manager, tp_item_body(summer, "summer", "hat")).await;

    let response = post_json(
        test.app(),
        &format!("/api/v1/collections/{summer}/publish"),
        &manager,
        json!({ "items": [id], "cheque": sign_cheque(&key, TP_ID, 1, SALT) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = put_json(test.app(), &uri, &manager, tp_item_body(summer, "summer", "cap")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let mut body = tp_item_body(summer, "summer", "hat");
    body["description"] = json!("Now with a brim");
    let response = put_json(test.app(), &uri, &manager, body).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: collection items are listed oldest first
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_collection_items(pool: PgPool) {
    let collection_id = seed_standard_collection(&pool, "Listed", None).await;
    let test = build_test_app(pool);
    let first = DbId::new_v4();
    let second = DbId::new_v4();
    for id in [first, second] {
        put_json(
            test.app(),
            &format!("/api/v1/items/{id}"),
            OWNER,
            item_body(Some(collection_id)),
        )
        .await;
    }

    let uri = format!("/api/v1/collections/{collection_id}/items");
    let response = get(test.app(), &uri, OWNER).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let items = json["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], first.to_string());
    assert_eq!(items[1]["id"], second.to_string());

    let response = get(test.app(), &uri, STRANGER).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Test: delete removes an unpublished item
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_item(pool: PgPool) {
    let test = build_test_app(pool);
    let uri = format!("/api/v1/items/{}", DbId::new_v4());
    put_json(test.app(), &uri, OWNER, item_body(None)).await;

    let response = delete(test.app(), &uri, STRANGER).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = delete(test.app(), &uri, OWNER).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(test.app(), &uri, OWNER).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: items of a published standard collection can't be deleted
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_published_item_fails(pool: PgPool) {
    let collection_id = seed_standard_collection(&pool, "Deployed", Some(CONTRACT)).await;
    let test = build_test_app(pool);
    let uri = format!("/api/v1/items/{}", DbId::new_v4());
    put_json(test.app(), &uri, OWNER, item_body(Some(collection_id))).await;
    test.subgraph.deploy_collection(CONTRACT, OWNER, 1);

    let response = delete(test.app(), &uri, OWNER).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Test: an address lists its own items once, even inside its collections
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_items_by_address(pool: PgPool) {
    let collection_id = seed_standard_collection(&pool, "Mine", None).await;
    let test = build_test_app(pool);
    put_json(
        test.app(),
        &format!("/api/v1/items/{}", DbId::new_v4()),
        OWNER,
        item_body(None),
    )
    .await;
    put_json(
        test.app(),
        &format!("/api/v1/items/{}", DbId::new_v4()),
        OWNER,
        item_body(Some(collection_id)),
    )
    .await;

    let uri = format!("/api/v1/addresses/{OWNER}/items");
    let response = get(test.app(), &uri, OWNER).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let response = get(test.app(), &uri, STRANGER).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
