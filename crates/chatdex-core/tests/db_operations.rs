//! Integration tests for database operations.

use chatdex_core::Database;
use chatdex_core::models::{Conversation, Message, MessageRole};
use chatdex_core::query::SearchRequest;
use chrono::NaiveDate;

fn temp_db() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chatdex-test.db");
    (dir, path)
}

fn conv(id: &str, title: &str, created_at: Option<f64>, updated_at: Option<f64>) -> Conversation {
    Conversation {
        id: id.to_string(),
        title: title.to_string(),
        created_at,
        updated_at,
    }
}

fn msg(id: &str, conv_id: &str, role: MessageRole, created_at: Option<f64>, text: &str) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: conv_id.to_string(),
        role,
        created_at,
        text: text.to_string(),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
}

// ============================================================================
// Conversation upsert
// ============================================================================

#[tokio::test]
async fn ingest_conversation_creates_rows() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");

    let c = conv("c1", "First", Some(900.0), Some(1000.0));
    let messages = vec![
        msg("m1", "c1", MessageRole::Assistant, Some(900.0), "hello there"),
        msg("m2", "c1", MessageRole::User, Some(1000.0), "hi back"),
    ];
    db.ingest_conversation(&c, &messages).await.expect("ingest");

    let fetched = db
        .get_conversation("c1")
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(fetched.title, "First");
    assert_eq!(fetched.created_at, Some(900.0));
    assert_eq!(fetched.updated_at, Some(1000.0));

    let stored = db.get_messages("c1").await.expect("get messages");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].id, "m1");
    assert_eq!(stored[1].id, "m2");
}

#[tokio::test]
async fn conversation_created_at_coalesces_to_first_known() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");

    let v1 = conv("c1", "Original", Some(900.0), Some(1000.0));
    db.ingest_conversation(&v1, &[]).await.expect("ingest v1");

    // A later run recomputes a different creation time; it must not win.
    let v2 = conv("c1", "Renamed", Some(1500.0), Some(2000.0));
    db.ingest_conversation(&v2, &[]).await.expect("ingest v2");

    let fetched = db
        .get_conversation("c1")
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(fetched.created_at, Some(900.0));
    assert_eq!(fetched.title, "Renamed");
    assert_eq!(fetched.updated_at, Some(2000.0));
}

#[tokio::test]
async fn conversation_created_at_fills_in_when_previously_missing() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");

    db.ingest_conversation(&conv("c1", "Empty", None, None), &[])
        .await
        .expect("ingest v1");

    db.ingest_conversation(&conv("c1", "Empty", Some(500.0), Some(600.0)), &[])
        .await
        .expect("ingest v2");

    let fetched = db
        .get_conversation("c1")
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(fetched.created_at, Some(500.0));
}

// ============================================================================
// Message upsert
// ============================================================================

#[tokio::test]
async fn message_overwrite_replaces_all_fields() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");

    let c = conv("c1", "Conv", Some(1.0), Some(1.0));
    db.ingest_conversation(
        &c,
        &[msg("m1", "c1", MessageRole::User, Some(1.0), "original text")],
    )
    .await
    .expect("ingest v1");

    db.ingest_conversation(
        &c,
        &[msg("m1", "c1", MessageRole::Assistant, Some(2.0), "replaced text")],
    )
    .await
    .expect("ingest v2");

    let stored = db.get_messages("c1").await.expect("get");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, MessageRole::Assistant);
    assert_eq!(stored[0].created_at, Some(2.0));
    assert_eq!(stored[0].text, "replaced text");
}

#[tokio::test]
async fn count_rows_accurate() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");

    assert_eq!(db.count_conversations().await.expect("count"), 0);
    assert_eq!(db.count_messages().await.expect("count"), 0);

    for i in 0..3 {
        let id = format!("c{i}");
        let c = conv(&id, "Conv", Some(f64::from(i)), None);
        let m = msg(&format!("m{i}"), &id, MessageRole::User, Some(1.0), "body");
        db.ingest_conversation(&c, std::slice::from_ref(&m))
            .await
            .expect("ingest");
    }

    assert_eq!(db.count_conversations().await.expect("count"), 3);
    assert_eq!(db.count_messages().await.expect("count"), 3);
}

// ============================================================================
// Search
// ============================================================================

async fn seed_search_fixture(db: &Database) {
    let c = conv("c1", "Billing", Some(86_410.0), Some(259_210.0));
    let messages = vec![
        msg(
            "m1",
            "c1",
            MessageRole::User,
            Some(86_410.0), // Jan 2
            "please refund my verizon bill",
        ),
        msg(
            "m2",
            "c1",
            MessageRole::Assistant,
            Some(172_810.0), // Jan 3
            "I can help with the refund",
        ),
        msg(
            "m3",
            "c1",
            MessageRole::User,
            Some(259_210.0), // Jan 4
            "thanks for the help",
        ),
    ];
    db.ingest_conversation(&c, &messages).await.expect("seed");
}

#[tokio::test]
async fn search_finds_matching_token() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");
    seed_search_fixture(&db).await;

    let req = SearchRequest {
        query: "verizon".to_string(),
        ..Default::default()
    };
    let hits = db.search(&req).await.expect("search");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message_id, "m1");
    assert_eq!(hits[0].title, "Billing");
}

#[tokio::test]
async fn search_no_matches_is_empty_not_error() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");
    seed_search_fixture(&db).await;

    let req = SearchRequest {
        query: "nonexistent".to_string(),
        ..Default::default()
    };
    let hits = db.search(&req).await.expect("search");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn search_role_shorthand_filters() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");
    seed_search_fixture(&db).await;

    let req = SearchRequest {
        query: "refund role:user".to_string(),
        ..Default::default()
    };
    let hits = db.search(&req).await.expect("search");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message_id, "m1");
    assert_eq!(hits[0].role, MessageRole::User);
}

#[tokio::test]
async fn search_date_bounds_are_day_inclusive() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");
    seed_search_fixture(&db).await;

    // since only: Jan 3 onward
    let req = SearchRequest {
        since: Some(date(1970, 1, 3)),
        ..Default::default()
    };
    let hits = db.search(&req).await.expect("search");
    assert_eq!(
        hits.iter().map(|h| h.message_id.as_str()).collect::<Vec<_>>(),
        ["m2", "m3"]
    );

    // until only: through the whole of Jan 3
    let req = SearchRequest {
        until: Some(date(1970, 1, 3)),
        ..Default::default()
    };
    let hits = db.search(&req).await.expect("search");
    assert_eq!(
        hits.iter().map(|h| h.message_id.as_str()).collect::<Vec<_>>(),
        ["m1", "m2"]
    );

    // both bounds pinned to one day
    let req = SearchRequest {
        since: Some(date(1970, 1, 3)),
        until: Some(date(1970, 1, 3)),
        ..Default::default()
    };
    let hits = db.search(&req).await.expect("search");
    assert_eq!(
        hits.iter().map(|h| h.message_id.as_str()).collect::<Vec<_>>(),
        ["m2"]
    );
}

#[tokio::test]
async fn search_orders_by_creation_time_missing_first() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");

    let c = conv("c1", "Conv", None, None);
    let messages = vec![
        msg("late", "c1", MessageRole::User, Some(5000.0), "common token"),
        msg("undated", "c1", MessageRole::User, None, "common token"),
        msg("early", "c1", MessageRole::User, Some(100.0), "common token"),
    ];
    db.ingest_conversation(&c, &messages).await.expect("ingest");

    let req = SearchRequest {
        query: "common".to_string(),
        ..Default::default()
    };
    let hits = db.search(&req).await.expect("search");
    assert_eq!(
        hits.iter().map(|h| h.message_id.as_str()).collect::<Vec<_>>(),
        ["undated", "early", "late"]
    );
}

#[tokio::test]
async fn search_limit_caps_results() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");
    seed_search_fixture(&db).await;

    let req = SearchRequest {
        limit: 2,
        ..Default::default()
    };
    let hits = db.search(&req).await.expect("search");
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn empty_query_lists_everything_in_time_order() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");
    seed_search_fixture(&db).await;

    let hits = db.search(&SearchRequest::default()).await.expect("search");
    assert_eq!(
        hits.iter().map(|h| h.message_id.as_str()).collect::<Vec<_>>(),
        ["m1", "m2", "m3"]
    );
}

// ============================================================================
// Full-text index maintenance
// ============================================================================

#[tokio::test]
async fn index_entry_replaced_when_message_overwritten() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");

    let c = conv("c1", "Conv", Some(1.0), Some(1.0));
    db.ingest_conversation(
        &c,
        &[msg("m1", "c1", MessageRole::User, Some(1.0), "alpha bravo")],
    )
    .await
    .expect("ingest v1");

    db.ingest_conversation(
        &c,
        &[msg("m1", "c1", MessageRole::User, Some(1.0), "charlie delta")],
    )
    .await
    .expect("ingest v2");

    let old = db
        .search(&SearchRequest {
            query: "alpha".to_string(),
            ..Default::default()
        })
        .await
        .expect("search");
    assert!(old.is_empty());

    let new = db
        .search(&SearchRequest {
            query: "charlie".to_string(),
            ..Default::default()
        })
        .await
        .expect("search");
    assert_eq!(new.len(), 1);
    assert_eq!(new[0].message_id, "m1");
}

#[tokio::test]
async fn rebuild_index_preserves_search_results() {
    let (_dir, path) = temp_db();
    let db = Database::open(&path).await.expect("open db");
    seed_search_fixture(&db).await;

    db.rebuild_index().await.expect("rebuild");

    let req = SearchRequest {
        query: "refund".to_string(),
        ..Default::default()
    };
    let hits = db.search(&req).await.expect("search");
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn reopen_backfills_empty_index() {
    let (_dir, path) = temp_db();

    {
        let db = Database::open(&path).await.expect("open db");
        seed_search_fixture(&db).await;
        db.close().await;
    }

    let db = Database::open(&path).await.expect("reopen db");
    let req = SearchRequest {
        query: "verizon".to_string(),
        ..Default::default()
    };
    let hits = db.search(&req).await.expect("search");
    assert_eq!(hits.len(), 1);
}

// ============================================================================
// Database lifecycle
// ============================================================================

#[tokio::test]
async fn database_creates_parent_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested/deeper/test.db");

    let db = Database::open(&path).await.expect("open");
    assert!(path.exists());
    db.close().await;
}
