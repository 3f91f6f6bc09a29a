mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use sunstead::db::DatabaseBackend;
use sunstead::models::{SyncKind, SyncStatus};

#[tokio::test]
async fn kb_search_endpoint_returns_ranked_hits() {
    let (db, _guard) = common::test_backend().await;
    common::seed_document(
        &db,
        "policy",
        "Battery Policy",
        "context/system",
        "Minimum battery SOC is 40%.",
        Some("system"),
    )
    .await;
    common::seed_document(
        &db,
        "gen",
        "Generator Manual",
        "manuals",
        "Change generator oil every 100 hours.",
        None,
    )
    .await;

    let (state, _embed, _llm) = common::test_state(db, None).await;
    let addr = common::start_app(state).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("http://{addr}/kb/search"))
        .json(&json!({"query": "minimum battery SOC", "limit": 5}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0]["similarity"].as_f64().unwrap() >= results[1]["similarity"].as_f64().unwrap());
    assert!(body["timing_ms"].as_u64().is_some());

    // Empty query is the input-validation 4xx.
    let response = client
        .post(format!("http://{addr}/kb/search"))
        .json(&json!({"query": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn kb_documents_endpoint_filters_by_folder_and_tier() {
    let (db, _guard) = common::test_backend().await;
    common::seed_document(&db, "a", "Policy", "context/system", "text", Some("system")).await;
    common::seed_document(&db, "b", "Manual", "manuals", "text", None).await;

    let (state, _embed, _llm) = common::test_state(db, None).await;
    let addr = common::start_app(state).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .get(format!("http://{addr}/kb/documents"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 2);

    let body: serde_json::Value = client
        .get(format!("http://{addr}/kb/documents?context_only=true"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["documents"][0]["title"], "Policy");
    assert_eq!(body["documents"][0]["chunk_count"], 1);

    let body: serde_json::Value = client
        .get(format!("http://{addr}/kb/documents?folder=manuals"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["documents"][0]["title"], "Manual");
}

#[tokio::test]
async fn sync_status_endpoint_reports_the_latest_run() {
    let (db, _guard) = common::test_backend().await;

    let run_id = db.begin_sync_run(SyncKind::Full, "test").await.unwrap();
    db.finish_sync_run(run_id, SyncStatus::Partial, 10, 7, 3, None)
        .await
        .unwrap();

    let (state, _embed, _llm) = common::test_state(db, None).await;
    let addr = common::start_app(state).await;

    let body: serde_json::Value = reqwest::Client::new()
        .get(format!("http://{addr}/kb/sync/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["latest"]["kind"], "full");
    assert_eq!(body["latest"]["status"], "partial");
    assert_eq!(body["latest"]["processed"], 10);
    assert_eq!(body["latest"]["failed"], 3);
}

#[tokio::test]
async fn conversations_endpoints_list_and_expand_sessions() {
    let (db, _guard) = common::test_backend().await;
    let (state, _embed, _llm) = common::test_state(db, Some("All good.")).await;
    let addr = common::start_app(state).await;
    let client = reqwest::Client::new();

    // Create a turn through the query endpoint itself.
    let ask: serde_json::Value = client
        .post(format!("http://{addr}/ask"))
        .json(&json!({"message": "what's my battery level?"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let session_id = ask["session_id"].as_str().unwrap().to_string();

    let listing: serde_json::Value = client
        .get(format!("http://{addr}/conversations?limit=10"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sessions = listing["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], session_id.as_str());
    assert_eq!(sessions[0]["message_count"], 2);

    let detail: serde_json::Value = client
        .get(format!("http://{addr}/conversations/{session_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = detail["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["agent_role"], "Solar Controller");

    // Read API contract: invalid id is 400, unknown id is 404.
    let response = client
        .get(format!("http://{addr}/conversations/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .get(format!(
            "http://{addr}/conversations/00000000-0000-0000-0000-000000000000"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
