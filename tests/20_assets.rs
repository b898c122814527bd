mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{Form, TestApp};
use estate_api::database::Store;
use estate_api::testing::StoreOp;

#[tokio::test]
async fn owner_edits_and_strangers_are_turned_away() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;
    let bob = app.register("bob").await?;

    let id = app.create_asset(&alice, 100_000, "2BR").await?;
    let path = format!("/assets/{}", id);

    let res = app.get(&path, None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["owner"], "alice");
    assert_eq!(res.data()["price"], 100_000);

    let res = app.json(Method::PUT, &path, Some(&bob), json!({ "price": 1 })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.delete(&path, Some(&bob)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.json(Method::PUT, &path, None, json!({ "price": 1 })).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let expired = app.expired_cookie_for("alice");
    let res = app.json(Method::PUT, &path, Some(&expired), json!({ "price": 1 })).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.store.get_asset(id).await?.price, 100_000);

    let res = app.json(Method::PUT, &path, Some(&alice), json!({ "price": 95_000 })).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["price"], 95_000);
    assert_eq!(res.data()["detail"], "2BR");
    Ok(())
}

#[tokio::test]
async fn admins_do_not_bypass_ownership() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;
    app.store.seed_user("root", estate_api::database::models::Role::Admin).await;
    let id = app.create_asset(&alice, 1, "lot").await?;

    let res = app.delete(&format!("/assets/{}", id), Some(&app.cookie_for("root"))).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn bad_contact_and_failed_image_do_not_fail_creation() -> Result<()> {
    let app = TestApp::with_failing_puts(|reference| reference.ends_with("_first.png"));
    let alice = app.register("alice").await?;

    let data = json!({
        "asset": { "price": 250_000, "detail": "3BR with garden" },
        "asset_contacts": [
            { "contact_name": "Agent Smith", "contact_detail": "555-0199" },
            { "contact_name": "", "contact_detail": 42 }
        ]
    });
    let form = Form::new()
        .text("data", data.to_string())
        .file("images", "first.png", b"first")
        .file("images", "second.png", b"second");

    let res = app.multipart(Method::POST, "/assets", Some(&alice), form).await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.data()["contacts"]["stored"], 1);
    assert_eq!(res.data()["contacts"]["failed"], 1);
    assert_eq!(res.data()["images"]["stored"], 1);
    assert_eq!(res.data()["images"]["failed"], 1);

    let id = res.data()["asset"]["id"].as_i64().expect("id");
    let contacts = app.get(&format!("/assets/{}/contacts", id), None).await?;
    assert_eq!(contacts.data().as_array().map(Vec::len), Some(1));
    assert_eq!(contacts.data()[0]["contact_name"], "Agent Smith");

    let images = app.get(&format!("/assets/{}/images", id), None).await?;
    assert_eq!(images.data().as_array().map(Vec::len), Some(1));
    let reference = images.data()[0]["image_url"].as_str().expect("url").to_string();
    assert!(reference.starts_with("uploads/"));
    assert!(reference.ends_with("_second.png"));
    assert!(app.blob_exists(&reference));
    assert_eq!(app.blob_names().len(), 1);
    Ok(())
}

#[tokio::test]
async fn negative_price_creates_nothing() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;

    let data = json!({
        "asset": { "price": -1, "detail": "cursed" },
        "asset_contacts": [{ "contact_name": "A", "contact_detail": "1" }]
    });
    let form = Form::new()
        .text("data", data.to_string())
        .file("images", "a.png", b"a");

    let res = app.multipart(Method::POST, "/assets", Some(&alice), form).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["field_errors"].get("price").is_some());

    assert_eq!(app.store.asset_total().await, 0);
    assert_eq!(app.store.contact_total().await, 0);
    assert_eq!(app.store.image_total().await, 0);
    assert!(app.blob_names().is_empty());
    Ok(())
}

#[tokio::test]
async fn create_requires_data_part_and_session() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;

    let form = Form::new().file("images", "a.png", b"a");
    let res = app.multipart(Method::POST, "/assets", Some(&alice), form).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let form = Form::new().text("data", json!({ "asset": { "price": 1, "detail": "x" } }).to_string());
    let res = app.multipart(Method::POST, "/assets", None, form).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.asset_total().await, 0);
    Ok(())
}

#[tokio::test]
async fn asset_insert_failure_is_a_server_error() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;
    app.store.fail(StoreOp::InsertAsset).await;

    let form = Form::new()
        .text("data", json!({ "asset": { "price": 1, "detail": "x" } }).to_string())
        .file("images", "a.png", b"a");
    let res = app.multipart(Method::POST, "/assets", Some(&alice), form).await?;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.blob_names().is_empty());
    Ok(())
}

#[tokio::test]
async fn update_is_revalidated_after_merge() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;
    let id = app.create_asset(&alice, 10, "loft").await?;
    let path = format!("/assets/{}", id);

    let res = app.json(Method::PUT, &path, Some(&alice), json!({ "detail": "   " })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let res = app.json(Method::PUT, &path, Some(&alice), json!({ "price": -10 })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let stored = app.store.get_asset(id).await?;
    assert_eq!((stored.price, stored.detail.as_str()), (10, "loft"));
    Ok(())
}

#[tokio::test]
async fn ownership_gate_reports_missing_and_malformed_ids() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;

    let res = app.json(Method::PUT, "/assets/4242", Some(&alice), json!({})).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = app.delete("/assets/abc", Some(&alice)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn delete_removes_rows_and_blobs() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;

    let data = json!({
        "asset": { "price": 5, "detail": "barn" },
        "asset_contacts": [{ "contact_name": "A", "contact_detail": "1" }]
    });
    let form = Form::new()
        .text("data", data.to_string())
        .file("images", "a.png", b"a")
        .file("images", "b.png", b"b");
    let res = app.multipart(Method::POST, "/assets", Some(&alice), form).await?;
    let id = res.data()["asset"]["id"].as_i64().expect("id");
    assert_eq!(app.blob_names().len(), 2);

    let res = app.delete(&format!("/assets/{}", id), Some(&alice)).await?;
    assert_eq!(res.status, StatusCode::OK);

    assert_eq!(app.get(&format!("/assets/{}", id), None).await?.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.contact_total().await, 0);
    assert_eq!(app.store.image_total().await, 0);
    assert!(app.blob_names().is_empty());
    Ok(())
}

#[tokio::test]
async fn listings_paginate_newest_first() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;
    let bob = app.register("bob").await?;

    let first = app.create_asset(&alice, 1, "first").await?;
    app.create_asset(&bob, 2, "second").await?;
    let third = app.create_asset(&alice, 3, "third").await?;

    let res = app.get("/assets?page=0", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["page"], 1);
    assert_eq!(res.data()["limit"], 10);
    assert_eq!(res.data()["total"], 3);
    assert_eq!(res.data()["assets"][0]["id"], third);

    let res = app.get("/assets?page=2", None).await?;
    assert_eq!(res.data()["assets"].as_array().map(Vec::len), Some(0));

    let res = app.get("/users/alice/assets", None).await?;
    assert_eq!(res.data()["total"], 2);
    assert_eq!(res.data()["assets"][1]["id"], first);

    let res = app.get("/me/assets", Some(&bob)).await?;
    assert_eq!(res.data()["total"], 1);
    assert_eq!(res.data()["assets"][0]["owner"], "bob");

    let res = app.get("/users/%20/assets", None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn contacts_are_scoped_to_their_asset() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;
    let house = app.create_asset(&alice, 1, "house").await?;
    let flat = app.create_asset(&alice, 2, "flat").await?;

    let res = app
        .json(
            Method::POST,
            &format!("/assets/{}/contacts", house),
            Some(&alice),
            json!({ "contact_name": "Agent", "contact_detail": "555-0100" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    let contact_id = res.data()["id"].as_i64().expect("id");

    let res = app
        .json(
            Method::POST,
            &format!("/assets/{}/contacts", house),
            Some(&alice),
            json!({ "contact_name": "", "contact_detail": "x" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Right owner, wrong parent asset
    let res = app
        .json(
            Method::PUT,
            &format!("/assets/{}/contacts/{}", flat, contact_id),
            Some(&alice),
            json!({ "contact_detail": "moved" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .json(
            Method::PUT,
            &format!("/assets/{}/contacts/{}", house, contact_id),
            Some(&alice),
            json!({ "contact_detail": "555-0111" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["contact_name"], "Agent");
    assert_eq!(res.data()["contact_detail"], "555-0111");

    let res = app
        .delete(&format!("/assets/{}/contacts/{}", house, contact_id), Some(&alice))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(app.store.contact_count(house).await, 0);
    Ok(())
}

#[tokio::test]
async fn strict_contact_insert_surfaces_store_faults() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;
    let id = app.create_asset(&alice, 1, "house").await?;
    app.store.fail(StoreOp::InsertContact).await;

    let res = app
        .json(
            Method::POST,
            &format!("/assets/{}/contacts", id),
            Some(&alice),
            json!({ "contact_name": "Agent", "contact_detail": "555-0100" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn over_long_contact_name_is_a_validation_error() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;
    let id = app.create_asset(&alice, 1, "house").await?;

    let res = app
        .json(
            Method::POST,
            &format!("/assets/{}/contacts", id),
            Some(&alice),
            json!({ "contact_name": "n".repeat(300), "contact_detail": "555-0100" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["field_errors"].get("contact_name").is_some());
    assert_eq!(app.store.contact_count(id).await, 0);
    Ok(())
}
