use std::sync::Arc;

use uuid::Uuid;

use crate::cache::{cache_key, BundleCache};
use crate::config::ContextConfig;
use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::models::{ContextBundle, Document, QueryType};
use crate::routing::{classify, Classification};

use super::budget::assemble_within_budget;

/// Assembles budgeted context bundles per query category, consulting the
/// vector store, conversation store, and bundle cache. Owns all bundle
/// construction and cache writes.
pub struct ContextManager {
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
    cache: BundleCache,
    config: ContextConfig,
}

impl ContextManager {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        embeddings: EmbeddingProvider,
        cache: BundleCache,
        config: ContextConfig,
    ) -> Self {
        Self {
            db,
            embeddings,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &BundleCache {
        &self.cache
    }

    /// Classify the query and assemble (or fetch) its bundle.
    pub async fn assemble(
        &self,
        user_id: &str,
        session_id: Option<Uuid>,
        text: &str,
    ) -> Result<(ContextBundle, Classification)> {
        let classification = classify(text);
        let query_type = classification.query_type;

        let key = cache_key(user_id, text, query_type);
        if let Some(mut bundle) = self.cache.get(&key).await {
            bundle.from_cache = true;
            tracing::debug!(key = %key, query_type = query_type.as_str(), "Bundle cache hit");
            return Ok((bundle, classification));
        }

        let mut degraded = Vec::new();

        let system_blocks = self.system_blocks(query_type).await?;
        let kb_blocks = self.kb_blocks(query_type, text, &mut degraded).await;
        let conversation_blocks = self
            .conversation_blocks(session_id, &mut degraded)
            .await;
        let user_blocks = self.user_blocks(query_type, &mut degraded).await;

        let mut bundle = assemble_within_budget(
            query_type,
            system_blocks,
            kb_blocks,
            conversation_blocks,
            user_blocks,
        );
        bundle.degraded_sources = degraded;

        self.cache.put(&key, &bundle).await;

        tracing::info!(
            query_type = query_type.as_str(),
            total_tokens = bundle.total_tokens,
            degraded = ?bundle.degraded_sources,
            "Assembled context bundle"
        );

        Ok((bundle, classification))
    }

    /// Tier-1 context files for the system section, per category table.
    async fn system_blocks(&self, query_type: QueryType) -> Result<Vec<String>> {
        let categories: Option<Vec<String>> = match query_type {
            QueryType::System => Some(vec!["system".into(), "hardware".into()]),
            QueryType::Research => Some(vec!["system".into(), "docs".into()]),
            // All tier-1 files except preferences, which land in the user
            // section to avoid double inclusion.
            QueryType::Planning => {
                Some(vec!["system".into(), "hardware".into(), "docs".into()])
            }
            QueryType::General => Some(vec!["system".into()]),
        };

        let files = self.db.get_context_files(categories.as_deref()).await?;
        Ok(files.iter().map(render_context_file).collect())
    }

    async fn kb_blocks(
        &self,
        query_type: QueryType,
        text: &str,
        degraded: &mut Vec<String>,
    ) -> Vec<String> {
        let top_k = match query_type {
            QueryType::Research => self.config.kb_top_k_research,
            QueryType::Planning => self.config.kb_top_k_planning,
            QueryType::System | QueryType::General => return Vec::new(),
        };

        let hits = async {
            let embedding = self.embeddings.embed_query(text).await?;
            self.db.search_chunks(&embedding, top_k, None).await
        }
        .await;

        match hits {
            Ok(hits) => hits
                .iter()
                .map(|hit| format!("[{}] {}", hit.citation(), hit.content))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "KB retrieval failed; assembling without it");
                degraded.push("kb".to_string());
                Vec::new()
            }
        }
    }

    async fn conversation_blocks(
        &self,
        session_id: Option<Uuid>,
        degraded: &mut Vec<String>,
    ) -> Vec<String> {
        let Some(session_id) = session_id else {
            return Vec::new();
        };

        match self
            .db
            .recent_messages(session_id, self.config.conversation_window)
            .await
        {
            Ok(messages) => messages
                .iter()
                .map(|m| format!("{}: {}", m.role.as_str(), m.content))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Conversation read failed; assembling without it");
                degraded.push("conversation".to_string());
                Vec::new()
            }
        }
    }

    async fn user_blocks(&self, query_type: QueryType, degraded: &mut Vec<String>) -> Vec<String> {
        if !matches!(query_type, QueryType::System | QueryType::Planning) {
            return Vec::new();
        }

        let categories = vec!["preferences".to_string()];
        match self.db.get_context_files(Some(&categories)).await {
            Ok(files) => files.iter().map(render_context_file).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Preference read failed; assembling without it");
                degraded.push("user".to_string());
                Vec::new()
            }
        }
    }
}

fn render_context_file(doc: &Document) -> String {
    format!("# {}\n{}", doc.title, doc.content)
}
