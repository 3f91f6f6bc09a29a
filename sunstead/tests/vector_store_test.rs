mod common;

use pretty_assertions::assert_eq;

use sunstead::db::DatabaseBackend;
use sunstead::models::{DocumentFilter, NewChunk, NewDocument, SourceMime};

fn axis_embedding(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; common::TEST_DIMS];
    v[axis] = 1.0;
    v
}

fn chunk(index: i64, content: &str, embedding: Vec<f32>) -> NewChunk {
    NewChunk {
        chunk_index: index,
        content: content.to_string(),
        token_count: sunstead::tokens::estimate_tokens(content),
        embedding,
    }
}

#[tokio::test]
async fn search_on_empty_index_returns_empty_list() {
    let (db, _guard) = common::test_backend().await;
    let hits = db.search_chunks(&axis_embedding(0), 5, None).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn search_ranks_by_cosine_similarity() {
    let (db, _guard) = common::test_backend().await;

    let doc_a = common::seed_document(&db, "a", "Battery Policy", "context/system", "placeholder", Some("system")).await;
    let doc_b = common::seed_document(&db, "b", "Miner Guide", "manuals", "placeholder", None).await;

    db.replace_chunks(doc_a, &[chunk(0, "battery thresholds", axis_embedding(0))])
        .await
        .unwrap();
    db.replace_chunks(doc_b, &[chunk(0, "miner operation", axis_embedding(1))])
        .await
        .unwrap();

    let hits = db.search_chunks(&axis_embedding(0), 5, None).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].title, "Battery Policy");
    assert!(hits[0].similarity > hits[1].similarity);
    assert!((hits[0].similarity - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn search_respects_k_and_folder_filter() {
    let (db, _guard) = common::test_backend().await;

    for i in 0..4 {
        let id = common::seed_document(
            &db,
            &format!("doc-{i}"),
            &format!("Doc {i}"),
            if i % 2 == 0 { "context/system" } else { "manuals" },
            "placeholder",
            None,
        )
        .await;
        db.replace_chunks(id, &[chunk(0, &format!("content {i}"), axis_embedding(0))])
            .await
            .unwrap();
    }

    let hits = db.search_chunks(&axis_embedding(0), 2, None).await.unwrap();
    assert_eq!(hits.len(), 2, "k limits results");

    let hits = db
        .search_chunks(&axis_embedding(0), 10, Some("manuals"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.folder_path == "manuals"));
}

#[tokio::test]
async fn upsert_by_external_id_updates_in_place() {
    let (db, _guard) = common::test_backend().await;

    let first = common::seed_document(&db, "ext-1", "Old Title", "docs", "old content", None).await;
    let second = db
        .upsert_document(&NewDocument {
            external_id: "ext-1".to_string(),
            title: "New Title".to_string(),
            folder_path: "docs".to_string(),
            mime: SourceMime::Markdown,
            content: "new content".to_string(),
            token_count: 3,
            is_context_file: false,
            context_category: None,
        })
        .await
        .unwrap();

    assert_eq!(first, second, "same external id keeps the internal id");

    let stored = db
        .get_document_by_external_id("ext-1")
        .await
        .unwrap()
        .expect("document should exist");
    assert_eq!(stored.title, "New Title");
    assert_eq!(stored.mime, SourceMime::Markdown);

    let all = db.list_documents(&DocumentFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1, "upsert must not duplicate");
}

#[tokio::test]
async fn replace_chunks_is_a_full_swap() {
    let (db, _guard) = common::test_backend().await;
    let id = common::seed_document(&db, "swap", "Doc", "docs", "content", None).await;

    db.replace_chunks(
        id,
        &[
            chunk(0, "first", axis_embedding(0)),
            chunk(1, "second", axis_embedding(1)),
        ],
    )
    .await
    .unwrap();

    db.replace_chunks(id, &[chunk(0, "only", axis_embedding(2))])
        .await
        .unwrap();

    let chunks = db.get_chunks(id).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "only");
    assert_eq!(chunks[0].chunk_index, 0);
}

#[tokio::test]
async fn delete_document_cascades_chunks() {
    let (db, _guard) = common::test_backend().await;
    let id = common::seed_document(&db, "gone", "Doc", "docs", "content", None).await;

    assert!(db.delete_document("gone").await.unwrap());
    assert!(!db.delete_document("gone").await.unwrap(), "second delete is a no-op");

    assert!(db.get_document_by_external_id("gone").await.unwrap().is_none());
    assert!(db.get_chunks(id).await.unwrap().is_empty());

    let hits = db.search_chunks(&common::fake_embedding("content"), 5, None).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn context_files_filter_by_category_in_stable_order() {
    let (db, _guard) = common::test_backend().await;

    common::seed_document(&db, "c1", "Battery Policy", "context/system", "soc floor 40", Some("system")).await;
    common::seed_document(&db, "c2", "Inverter Manual", "context/hardware", "specs", Some("hardware")).await;
    common::seed_document(&db, "c3", "Owner Prefs", "context/preferences", "quiet hours", Some("preferences")).await;
    common::seed_document(&db, "c4", "Random Doc", "manuals", "not tier-1", None).await;

    let all_tier1 = db.get_context_files(None).await.unwrap();
    assert_eq!(all_tier1.len(), 3);

    let categories = vec!["system".to_string(), "hardware".to_string()];
    let filtered = db.get_context_files(Some(&categories)).await.unwrap();
    assert_eq!(filtered.len(), 2);
    // Ordered by folder then title.
    assert_eq!(filtered[0].title, "Inverter Manual");
    assert_eq!(filtered[1].title, "Battery Policy");
}
