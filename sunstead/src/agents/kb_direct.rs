use std::sync::Arc;

use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;

/// The fast-path short-circuit: a straight KB retrieval formatted with
/// citations. No reasoner, no LLM, no iteration cap.
pub struct KbDirect {
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
    top_k: u32,
}

impl KbDirect {
    pub fn new(db: Arc<dyn DatabaseBackend>, embeddings: EmbeddingProvider) -> Self {
        Self {
            db,
            embeddings,
            top_k: 3,
        }
    }

    /// Search and format. The top hit is quoted verbatim with its citation
    /// tuple; runners-up are listed underneath.
    pub async fn answer(&self, query: &str) -> Result<String> {
        let embedding = self.embeddings.embed_query(query).await?;
        let hits = self.db.search_chunks(&embedding, self.top_k, None).await?;

        let Some(top) = hits.first() else {
            return Ok(
                "I couldn't find anything in the documentation matching that. Try rephrasing, \
                 or run a KB sync if documents were recently added."
                    .to_string(),
            );
        };

        let mut out = format!("\u{201c}{}\u{201d}\n— {}", top.content.trim(), top.citation());

        if hits.len() > 1 {
            out.push_str("\n\nAlso relevant:");
            for hit in &hits[1..] {
                out.push_str(&format!("\n- {}", hit.citation()));
            }
        }

        Ok(out)
    }
}
