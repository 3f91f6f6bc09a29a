use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;

use super::registry::{Tool, ToolOutcome};

/// `kb_search(query, k?)`: ranked chunks with citation tuples.
pub struct KbSearchTool {
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
}

impl KbSearchTool {
    pub fn new(db: Arc<dyn DatabaseBackend>, embeddings: EmbeddingProvider) -> Self {
        Self { db, embeddings }
    }
}

#[async_trait]
impl Tool for KbSearchTool {
    fn name(&self) -> &'static str {
        "kb_search"
    }

    fn description(&self) -> &'static str {
        "Search the ranch knowledge base (args: {\"query\": text, \"k\": result count, default 5})"
    }

    async fn call(&self, args: &Value) -> ToolOutcome {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            return ToolOutcome::failed("kb_search requires a 'query' argument");
        };
        if query.trim().is_empty() {
            return ToolOutcome::failed("kb_search query cannot be empty");
        }

        let k = args
            .get("k")
            .and_then(Value::as_u64)
            .unwrap_or(5)
            .clamp(1, 20) as u32;

        let embedding = match self.embeddings.embed_query(query).await {
            Ok(embedding) => embedding,
            Err(e) => return ToolOutcome::failed(format!("Query embedding failed: {e}")),
        };

        match self.db.search_chunks(&embedding, k, None).await {
            Ok(hits) => {
                let results: Vec<Value> = hits
                    .iter()
                    .map(|hit| {
                        json!({
                            "title": hit.title,
                            "folder": hit.folder_path,
                            "citation": hit.citation(),
                            "content": hit.content,
                            "similarity": hit.similarity,
                        })
                    })
                    .collect();
                ToolOutcome::ok(json!({ "query": query, "results": results }))
            }
            Err(e) => ToolOutcome::failed(format!("KB search failed: {e}")),
        }
    }
}
