//! Tests for `src/inquiry/sqlite.rs` and `src/db.rs` against a real file.

use inquirydesk::catalog::{ProductCatalog, SqliteCatalog};
use inquirydesk::db;
use inquirydesk::inquiry::sqlite::SqliteInquiryStore;
use inquirydesk::inquiry::store::InquiryStore;
use inquirydesk::inquiry::{InquiryDraft, InquiryStatus, Sender};

fn draft() -> InquiryDraft {
    InquiryDraft {
        name: "Ada Buyer".to_owned(),
        email: "a@x.com".to_owned(),
        product_id: "p1".to_owned(),
        quantity: 5,
        message: "interested".to_owned(),
    }
}

#[tokio::test]
async fn data_survives_reopen() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("nested").join("desk.db");

    let id = {
        let pool = db::open(&path).await.expect("db should open");
        let store = SqliteInquiryStore::new(pool.clone());
        let inquiry = store.create(draft()).await.expect("create");
        store
            .append_message(&inquiry.id, "quote attached", Sender::Admin)
            .await
            .expect("append");
        store.shutdown().await;
        pool.close().await;
        inquiry.id
    };

    let pool = db::open(&path).await.expect("db should reopen");
    let store = SqliteInquiryStore::new(pool);
    let inquiry = store
        .get(&id)
        .await
        .expect("get")
        .expect("inquiry should persist");
    assert_eq!(inquiry.status, InquiryStatus::Processing);
    assert_eq!(inquiry.messages.len(), 2);
    assert_eq!(inquiry.messages[1].content, "quote attached");
    assert_eq!(inquiry.messages[1].sender, Sender::Admin);
}

#[tokio::test]
async fn timestamps_round_trip_exactly() {
    let pool = db::open_in_memory().await.expect("db");
    let store = SqliteInquiryStore::new(pool);
    let created = store.create(draft()).await.expect("create");
    let loaded = store
        .get(&created.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(loaded.created_at, created.created_at);
    assert_eq!(loaded.messages[0].created_at, created.messages[0].created_at);
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let pool = db::open_in_memory().await.expect("db");
    db::migrate(&pool).await.expect("second migrate should succeed");
}

#[tokio::test]
async fn schema_rejects_bad_rows() {
    let pool = db::open_in_memory().await.expect("db");
    let bad_status = sqlx::query(
        "INSERT INTO inquiries (id, name, email, product_id, quantity, status, created_at, updated_at) \
         VALUES ('x', 'n', 'a@x.com', 'p1', 1, 'archived', '2026-01-01T00:00:00.000000Z', '2026-01-01T00:00:00.000000Z')",
    )
    .execute(&pool)
    .await;
    assert!(bad_status.is_err());

    let orphan = sqlx::query(
        "INSERT INTO messages (id, inquiry_id, content, sender, created_at) \
         VALUES ('m', 'missing', 'hi', 'admin', '2026-01-01T00:00:00.000000Z')",
    )
    .execute(&pool)
    .await;
    assert!(orphan.is_err(), "foreign keys should be enforced");
}

#[tokio::test]
async fn catalog_upsert_and_count() {
    let pool = db::open_in_memory().await.expect("db");
    let catalog = SqliteCatalog::new(pool);
    assert_eq!(catalog.count().await.expect("count"), 0);

    catalog.upsert("p1", "Steel bolts").await.expect("insert");
    catalog.upsert("p1", "Steel bolts M8").await.expect("rename");
    catalog.upsert("p2", "Copper wire").await.expect("insert");

    assert_eq!(catalog.count().await.expect("count"), 2);
    let product = catalog.get("p1").await.expect("get").expect("exists");
    assert_eq!(product.name, "Steel bolts M8");
    assert!(catalog.get("p3").await.expect("get").is_none());
    assert!(catalog.exists("p2").await.expect("exists"));
}

#[tokio::test]
async fn catalog_rejects_blank_fields() {
    let pool = db::open_in_memory().await.expect("db");
    let catalog = SqliteCatalog::new(pool);
    assert!(catalog.upsert(" ", "name").await.is_err());
    assert!(catalog.upsert("p1", "").await.is_err());
}
