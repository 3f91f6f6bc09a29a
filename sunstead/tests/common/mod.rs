use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use wiremock::matchers::{method, path};

use sunstead::api::{create_router, AppState};
use sunstead::cache::BundleCache;
use sunstead::config::{CacheConfig, Config, DatabaseConfig, DriveConfig, EmbeddingsConfig, LlmConfig};
use sunstead::db::{Database, DatabaseBackend, LibSqlBackend};
use sunstead::embeddings::EmbeddingProvider;
use sunstead::llm::LlmProvider;
use sunstead::models::{EnergyRecord, NewChunk, NewDocument, SourceMime, TelemetrySource};
use sunstead::sync::DriveClient;

pub const TEST_DIMS: usize = 8;

/// File-backed test database in a scratch dir; the TempDir guard keeps it
/// alive for the test's duration.
pub async fn test_backend() -> (Arc<dyn DatabaseBackend>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("sunstead.db");
    let config = DatabaseConfig {
        url: format!("file:{}", db_path.to_str().unwrap()),
        auth_token: None,
        local_path: None,
    };

    let db = Database::new(&config, TEST_DIMS)
        .await
        .expect("Failed to open test database");
    (Arc::new(LibSqlBackend::new(db)), temp_dir)
}

/// Deterministic unit-length embedding derived from the input text, so
/// identical queries and passages land near each other.
pub fn fake_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; TEST_DIMS];
    for (i, b) in text.bytes().enumerate() {
        v[i % TEST_DIMS] += f32::from(b) / 255.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
    v.iter().map(|x| x / norm).collect()
}

struct EmbeddingResponder;

impl Respond for EmbeddingResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let inputs = body["input"].as_array().cloned().unwrap_or_default();

        let data: Vec<serde_json::Value> = inputs
            .iter()
            .map(|input| {
                let text = input.as_str().unwrap_or_default();
                serde_json::json!({ "embedding": fake_embedding(text) })
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": data }))
    }
}

/// Mock embedding endpoint plus a provider pointed at it.
pub async fn mock_embeddings() -> (MockServer, EmbeddingProvider) {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(EmbeddingResponder)
        .mount(&server)
        .await;

    let config = EmbeddingsConfig {
        model: "openai/test-embed".to_string(),
        dimensions: TEST_DIMS,
        batch_size: 16,
        api_key: Some("test-key".to_string()),
        base_url: Some(server.uri()),
        timeout_secs: 5,
        max_retries: 0,
        hourly_quota: 10_000,
    };

    let provider = EmbeddingProvider::new(&config).expect("Failed to build embedding provider");
    (server, provider)
}

/// Mock chat-completion endpoint that always answers with a fixed final
/// action, plus a provider pointed at it.
pub async fn mock_llm(final_answer: &str) -> (MockServer, LlmProvider) {
    let server = MockServer::start().await;

    let content = serde_json::json!({ "action": "final", "answer": final_answer }).to_string();
    let body = serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-test",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let config = LlmConfig {
        model: "openai/gpt-test".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(server.uri()),
        timeout_secs: 5,
        max_retries: 0,
    };

    (server, LlmProvider::new(Some(&config)))
}

/// Seed one inverter record `minutes_ago` with the given readings.
pub async fn seed_inverter_record(
    db: &Arc<dyn DatabaseBackend>,
    minutes_ago: i64,
    soc: f64,
    battery_w: f64,
    pv_w: f64,
    load_w: f64,
) -> EnergyRecord {
    let record = EnergyRecord::new(
        TelemetrySource::Inverter,
        Utc::now() - Duration::minutes(minutes_ago),
        soc,
        battery_w,
        pv_w,
        load_w,
        0.0,
        Some(52.1),
    );
    db.append_record(&record).await.expect("append failed");
    record
}

/// Seed a document with one chunk embedded via `fake_embedding` of its
/// content (matching what the mock embedding server would produce for a
/// passage search).
pub async fn seed_document(
    db: &Arc<dyn DatabaseBackend>,
    external_id: &str,
    title: &str,
    folder_path: &str,
    content: &str,
    context_category: Option<&str>,
) -> i64 {
    let doc = NewDocument {
        external_id: external_id.to_string(),
        title: title.to_string(),
        folder_path: folder_path.to_string(),
        mime: SourceMime::GoogleDoc,
        content: content.to_string(),
        token_count: sunstead::tokens::estimate_tokens(content),
        is_context_file: context_category.is_some(),
        context_category: context_category.map(str::to_string),
    };

    let id = db.upsert_document(&doc).await.expect("upsert failed");
    db.replace_chunks(
        id,
        &[NewChunk {
            chunk_index: 0,
            content: content.to_string(),
            token_count: sunstead::tokens::estimate_tokens(content),
            embedding: fake_embedding(content),
        }],
    )
    .await
    .expect("chunk replace failed");

    id
}

/// Config wired for tests: dead drive endpoint, passthrough cache, tiny
/// timeouts.
pub fn test_config() -> Config {
    let mut config = Config::from_env();
    config.cache = CacheConfig {
        url: None,
        bundle_ttl_secs: 300,
        probe_interval_secs: 30,
    };
    config.drive = DriveConfig {
        base_url: "http://127.0.0.1:1/drive/v3".to_string(),
        api_token: None,
        root_folder_id: "root".to_string(),
        ignore_patterns: vec!["~$".to_string()],
        context_folder: "context".to_string(),
        chunk_tokens: 64,
        max_document_tokens: 5_000,
        timeout_secs: 2,
    };
    config.agents.reasoner_timeout_secs = 10;
    config.research = None;
    config.llm = None;
    config
}

/// Boot the full router on an ephemeral port.
pub async fn start_app(state: AppState) -> SocketAddr {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    addr
}

/// Convenience: AppState over the given backend with mock embeddings and
/// an optional mock LLM. Returns the servers so they stay alive.
pub async fn test_state(
    db: Arc<dyn DatabaseBackend>,
    llm_answer: Option<&str>,
) -> (AppState, MockServer, Option<MockServer>) {
    let (embed_server, embeddings) = mock_embeddings().await;

    let (llm_server, llm) = match llm_answer {
        Some(answer) => {
            let (server, provider) = mock_llm(answer).await;
            (Some(server), provider)
        }
        None => (None, LlmProvider::new(None)),
    };

    let config = test_config();
    let cache = BundleCache::new(&config.cache);
    let drive = DriveClient::new(config.drive.clone()).expect("drive client");

    let state = AppState::new(config, db, embeddings, llm, cache, drive, None);
    (state, embed_server, llm_server)
}
