use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::{Result, SunsteadError};
use crate::models::{NewChunk, NewDocument, SyncKind, SyncStatus};
use crate::processing::{convert_to_text, TextChunker};
use crate::tokens::estimate_tokens;

use super::drive::{DriveClient, DriveFile, SyncPreview};
use super::events::SyncEvent;

/// The document sync pipeline: enumerate, fetch, convert, chunk, embed,
/// upsert, reconcile deletions. Owns all Document/Chunk mutation.
pub struct SyncPipeline {
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
    drive: DriveClient,
    chunker: TextChunker,
    max_document_tokens: i64,
    // Single-flight guard; a second run is rejected while one holds this.
    running: Mutex<()>,
}

impl SyncPipeline {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        embeddings: EmbeddingProvider,
        drive: DriveClient,
        chunk_tokens: i64,
        max_document_tokens: i64,
    ) -> Self {
        Self {
            db,
            embeddings,
            drive,
            chunker: TextChunker::new(chunk_tokens),
            max_document_tokens,
            running: Mutex::new(()),
        }
    }

    pub async fn preview(&self) -> Result<SyncPreview> {
        self.drive.preview().await
    }

    /// Run one sync, streaming progress events into `tx` in strict order.
    ///
    /// A dropped receiver means the client went away: the run aborts at the
    /// next file boundary and the SyncRun records `partial`. A terminal
    /// event is always sent on a live channel.
    pub async fn run(
        &self,
        kind: SyncKind,
        triggered_by: &str,
        tx: mpsc::Sender<SyncEvent>,
    ) -> Result<()> {
        let Ok(_guard) = self.running.try_lock() else {
            let error = "A sync run is already in progress".to_string();
            let _ = tx.send(SyncEvent::Failed { error: error.clone() }).await;
            return Err(SunsteadError::Sync(error));
        };

        let run_id = match self.db.begin_sync_run(kind, triggered_by).await {
            Ok(id) => id,
            Err(e) => {
                let _ = tx
                    .send(SyncEvent::Failed {
                        error: e.to_string(),
                    })
                    .await;
                return Err(e);
            }
        };

        let _ = tx.send(SyncEvent::Starting { kind }).await;
        let _ = tx.send(SyncEvent::Scanning).await;

        let files = match self.drive.enumerate().await {
            Ok(files) => files,
            Err(e) => {
                let error = e.to_string();
                self.db
                    .finish_sync_run(run_id, SyncStatus::Failed, 0, 0, 0, Some(&error))
                    .await
                    .ok();
                let _ = tx.send(SyncEvent::Failed { error }).await;
                return Err(e);
            }
        };

        // Deletion reconciliation only after a successful end-to-end
        // enumeration; a flaky listing must never mass-delete the KB.
        if let Err(e) = self.reconcile_deletions(&files).await {
            tracing::warn!(error = %e, "Deletion reconciliation failed; continuing sync");
        }

        let total = files.len() as u64;
        let mut processed: u64 = 0;
        let mut updated: u64 = 0;
        let mut failed: u64 = 0;
        let mut aborted = false;

        for file in &files {
            processed += 1;

            let display_path = if file.folder_path.is_empty() {
                file.name.clone()
            } else {
                format!("{}/{}", file.folder_path, file.name)
            };

            // A dropped receiver is the cancellation signal; abort between
            // files so partial state stays consistent.
            if tx
                .send(SyncEvent::Processing {
                    current: processed,
                    total,
                    current_file: display_path.clone(),
                })
                .await
                .is_err()
            {
                tracing::info!(
                    current = processed,
                    total,
                    "Sync stream consumer disconnected; aborting run"
                );
                processed -= 1;
                aborted = true;
                break;
            }

            match self.sync_file(file, kind).await {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(e) => {
                    failed += 1;
                    tracing::warn!(file = %display_path, error = %e, "Document sync failed");
                }
            }
        }

        let status = if aborted {
            SyncStatus::Partial
        } else if failed > 0 {
            SyncStatus::Partial
        } else {
            SyncStatus::Completed
        };

        self.db
            .finish_sync_run(
                run_id,
                status,
                processed as i64,
                updated as i64,
                failed as i64,
                None,
            )
            .await?;

        if !aborted {
            let _ = tx
                .send(SyncEvent::Completed {
                    processed,
                    updated,
                    failed,
                })
                .await;
        }

        Ok(())
    }

    /// Sync one file. Returns true when the document was written, false
    /// when it was skipped as unchanged.
    async fn sync_file(&self, file: &DriveFile, kind: SyncKind) -> Result<bool> {
        if kind == SyncKind::Incremental {
            if let Some(stored) = self.db.get_document_by_external_id(&file.id).await? {
                if stored.last_synced >= file.modified_time {
                    return Ok(false);
                }
            }
        }

        let raw = self.drive.fetch(file).await?;
        let content = convert_to_text(file.mime, &raw)?;

        let token_count = estimate_tokens(&content);
        if token_count > self.max_document_tokens {
            return Err(SunsteadError::Sync(format!(
                "Document '{}' exceeds the token limit ({token_count} > {})",
                file.name, self.max_document_tokens
            )));
        }

        let text_chunks = self.chunker.chunk(&content);
        if text_chunks.is_empty() {
            return Err(SunsteadError::Sync(format!(
                "Document '{}' produced no chunks",
                file.name
            )));
        }

        let passages: Vec<String> = text_chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embeddings.embed_passages(passages).await?;

        if embeddings.len() != text_chunks.len() {
            return Err(SunsteadError::Embedding(format!(
                "Embedding count mismatch for '{}': {} chunks, {} vectors",
                file.name,
                text_chunks.len(),
                embeddings.len()
            )));
        }
        let expected_dims = self.embeddings.dimensions();
        if embeddings.iter().any(|e| e.len() != expected_dims) {
            return Err(SunsteadError::Embedding(format!(
                "Embedding dimension mismatch for '{}' (expected {expected_dims})",
                file.name
            )));
        }

        let context_category = self.drive.context_category(&file.folder_path);
        let document = NewDocument {
            external_id: file.id.clone(),
            title: file.name.clone(),
            folder_path: file.folder_path.clone(),
            mime: file.mime,
            content,
            token_count,
            is_context_file: context_category.is_some(),
            context_category,
        };

        let document_id = self.db.upsert_document(&document).await?;

        let chunks: Vec<NewChunk> = text_chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (chunk, embedding))| NewChunk {
                chunk_index: index as i64,
                content: chunk.content,
                token_count: chunk.token_count,
                embedding,
            })
            .collect();

        self.db.replace_chunks(document_id, &chunks).await?;

        Ok(true)
    }

    /// Delete stored documents whose external id no longer appears in the
    /// enumeration. Chunks cascade with their documents.
    async fn reconcile_deletions(&self, files: &[DriveFile]) -> Result<()> {
        let upstream: HashSet<&str> = files.iter().map(|f| f.id.as_str()).collect();

        for external_id in self.db.list_external_ids().await? {
            if !upstream.contains(external_id.as_str()) {
                if self.db.delete_document(&external_id).await? {
                    tracing::info!(external_id = %external_id, "Removed document deleted upstream");
                }
            }
        }

        Ok(())
    }
}
