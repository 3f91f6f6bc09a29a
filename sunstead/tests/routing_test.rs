mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use sunstead::db::DatabaseBackend;
use uuid::Uuid;

async fn post_ask(addr: std::net::SocketAddr, body: serde_json::Value) -> (u16, serde_json::Value) {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/ask"))
        .json(&body)
        .send()
        .await
        .expect("request failed");
    let status = response.status().as_u16();
    let body = response.json().await.expect("invalid JSON response");
    (status, body)
}

#[tokio::test]
async fn invalid_session_id_degrades_to_a_fresh_session() {
    let (db, _guard) = common::test_backend().await;
    let (state, _embed, _llm) = common::test_state(db, None).await;
    let addr = common::start_app(state).await;

    let (status, body) = post_ask(
        addr,
        json!({"message": "hello", "session_id": "invalid-id-123"}),
    )
    .await;

    assert_eq!(status, 200, "unknown session must not 4xx or 5xx");
    let session_id = body["session_id"].as_str().unwrap();
    Uuid::parse_str(session_id).expect("fresh session id must be a UUID");
    assert_ne!(session_id, "invalid-id-123");
    assert!(!body["response"].as_str().unwrap().is_empty());
    assert_eq!(body["query_type"], "general");
}

#[tokio::test]
async fn fastpath_answers_from_documentation_with_citation() {
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

    let (state, _embed, _llm) = common::test_state(db, None).await;
    let addr = common::start_app(state).await;

    let (status, body) = post_ask(
        addr,
        json!({"message": "What is the minimum battery SOC threshold?"}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["agent_role"], "Documentation Search");
    assert_eq!(body["cache_hit"], false);

    let response = body["response"].as_str().unwrap();
    assert!(response.contains("Minimum battery SOC is 40%."), "verbatim quote");
    assert!(
        response.contains("(Battery Policy, context/system)"),
        "citation tuple of (title, folder)"
    );
}

#[tokio::test]
async fn system_queries_route_to_the_solar_controller() {
    let (db, _guard) = common::test_backend().await;
    common::seed_inverter_record(&db, 1, 27.0, -200.0, 1400.0, 800.0).await;

    let (state, _embed, _llm) = common::test_state(
        db,
        Some("Battery is at 27% with 1400 W of solar production."),
    )
    .await;
    let addr = common::start_app(state).await;

    let (status, body) = post_ask(addr, json!({"message": "What's my battery level?"})).await;

    assert_eq!(status, 200);
    assert_eq!(body["agent_role"], "Solar Controller");
    assert_eq!(body["query_type"], "system");
    assert!(body["response"].as_str().unwrap().contains("27%"));
    assert!(body["context_tokens"].as_i64().unwrap() <= 2000);
}

#[tokio::test]
async fn planning_queries_route_to_the_energy_orchestrator() {
    let (db, _guard) = common::test_backend().await;
    common::seed_inverter_record(&db, 1, 27.0, -200.0, 1400.0, 800.0).await;

    let (state, _embed, _llm) = common::test_state(
        db,
        Some("No. SOC is 27%, below the 40% minimum; keep the miners off."),
    )
    .await;
    let addr = common::start_app(state).await;

    let (status, body) = post_ask(addr, json!({"message": "Should we run the miners right now?"})).await;

    assert_eq!(status, 200);
    assert_eq!(body["agent_role"], "Energy Orchestrator");
    assert_eq!(body["query_type"], "planning");
    assert!(body["context_tokens"].as_i64().unwrap() <= 3500);
}

#[tokio::test]
async fn llm_outage_still_returns_a_populated_response() {
    let (db, _guard) = common::test_backend().await;
    common::seed_inverter_record(&db, 1, 27.0, -200.0, 1400.0, 800.0).await;

    // No LLM configured at all.
    let (state, _embed, _llm) = common::test_state(db, None).await;
    let addr = common::start_app(state).await;

    let (status, body) = post_ask(addr, json!({"message": "What's my battery level?"})).await;

    assert_eq!(status, 200, "reasoner failure never surfaces as 5xx");
    assert!(!body["response"].as_str().unwrap().is_empty());
    assert_eq!(body["agent_role"], "Manager", "failed delegation falls back to the manager");
    assert_eq!(body["query_type"], "system");
}

#[tokio::test]
async fn both_turn_messages_are_persisted_with_agent_metadata() {
    let (db, _guard) = common::test_backend().await;
    let (state, _embed, _llm) = common::test_state(db.clone(), Some("All quiet.")).await;
    let addr = common::start_app(state).await;

    let (_, body) = post_ask(addr, json!({"message": "what's my battery level?"})).await;
    let session_id = Uuid::parse_str(body["session_id"].as_str().unwrap()).unwrap();

    let messages = db.session_messages(session_id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "what's my battery level?");
    assert_eq!(messages[1].agent_role.as_deref(), Some("Solar Controller"));
    assert!(messages[1].duration_ms.is_some());
}

#[tokio::test]
async fn identical_queries_share_context_size_without_a_cache() {
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

    let (state, _embed, _llm) = common::test_state(db, Some("ok")).await;
    let addr = common::start_app(state).await;

    let q = json!({"message": "what's my battery level?", "user_id": "ranch"});
    let (_, first) = post_ask(addr, q.clone()).await;
    let (_, second) = post_ask(addr, q).await;

    assert_eq!(first["cache_hit"], false);
    assert_eq!(second["cache_hit"], false, "passthrough cache never hits");
    assert_eq!(first["context_tokens"], second["context_tokens"]);
}

#[tokio::test]
async fn empty_message_is_the_only_4xx() {
    let (db, _guard) = common::test_backend().await;
    let (state, _embed, _llm) = common::test_state(db, None).await;
    let addr = common::start_app(state).await;

    let (status, body) = post_ask(addr, json!({"message": ""})).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn read_apis_serve_collaborators() {
    let (db, _guard) = common::test_backend().await;
    let (state, _embed, _llm) = common::test_state(db.clone(), None).await;
    let addr = common::start_app(state).await;
    let client = reqwest::Client::new();

    // Empty store: latest is 404, stats are zeroed 200.
    let response = client
        .get(format!("http://{addr}/energy/latest"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let stats: serde_json::Value = client
        .get(format!("http://{addr}/energy/stats?hours=24"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["count"], 0);
    assert_eq!(stats["low_confidence"], true);

    common::seed_inverter_record(&db, 1, 64.0, 400.0, 2000.0, 600.0).await;

    let latest: serde_json::Value = client
        .get(format!("http://{addr}/energy/latest"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(latest["soc_percent"], 64.0);
    assert_eq!(latest["flags"]["charging"], true);

    let health: serde_json::Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["db_ok"], true);
    assert_eq!(health["cache_enabled"], false);
}
