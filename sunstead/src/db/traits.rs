use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Chunk, Document, DocumentFilter, DocumentSummary, EnergyRecord, EnergyStats, KbSearchHit,
    Message, NewChunk, NewDocument, NewMessage, Session, SessionSummary, SyncKind, SyncRun,
    SyncStatus, TelemetrySource,
};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Per-source health detail persisted with each snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHealth {
    pub source: TelemetrySource,
    pub record_count: u64,
    /// Seconds since the newest record, `None` when the source is empty.
    pub last_record_age_secs: Option<i64>,
}

/// One aggregated health observation from the monitor loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub ts: DateTime<Utc>,
    pub db_ok: bool,
    pub cache_ok: bool,
    pub sources: Vec<SourceHealth>,
}

// ---------------------------------------------------------------------------
// Individual store traits
// ---------------------------------------------------------------------------

/// Document persistence. Mutation belongs to the sync pipeline alone.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or update by external id, returning the internal id.
    async fn upsert_document(&self, doc: &NewDocument) -> Result<i64>;
    async fn get_document_by_external_id(&self, external_id: &str) -> Result<Option<Document>>;
    /// Returns true when a document was actually removed. Chunks cascade.
    async fn delete_document(&self, external_id: &str) -> Result<bool>;
    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<DocumentSummary>>;
    /// All stored external ids, for deletion reconciliation.
    async fn list_external_ids(&self) -> Result<Vec<String>>;
    /// Tier-1 context files, optionally restricted to category tags, ordered
    /// by folder then title for deterministic bundle assembly.
    async fn get_context_files(&self, categories: Option<&[String]>) -> Result<Vec<Document>>;
}

/// Chunk persistence and vector search.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Atomically replace all chunks of a document (delete-then-insert in
    /// one transaction).
    async fn replace_chunks(&self, document_id: i64, chunks: &[NewChunk]) -> Result<()>;
    async fn get_chunks(&self, document_id: i64) -> Result<Vec<Chunk>>;
    /// Cosine top-k over all chunks. An empty index yields an empty list.
    async fn search_chunks(
        &self,
        embedding: &[f32],
        limit: u32,
        folder_prefix: Option<&str>,
    ) -> Result<Vec<KbSearchHit>>;
}

/// Sync run bookkeeping.
#[async_trait]
pub trait SyncLogStore: Send + Sync {
    /// Open a new run. Fails when a non-terminal run already exists.
    async fn begin_sync_run(&self, kind: SyncKind, triggered_by: &str) -> Result<i64>;
    async fn finish_sync_run(
        &self,
        id: i64,
        status: SyncStatus,
        processed: i64,
        updated: i64,
        failed: i64,
        error: Option<&str>,
    ) -> Result<()>;
    async fn latest_sync_run(&self) -> Result<Option<SyncRun>>;
}

/// Append-only telemetry with retention.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Idempotent on (source, ts); returns false when the record already
    /// existed.
    async fn append_record(&self, record: &EnergyRecord) -> Result<bool>;
    async fn latest_record(&self, source: TelemetrySource) -> Result<Option<EnergyRecord>>;
    /// Aggregates over `[now − hours, now)`.
    async fn stats(
        &self,
        source: TelemetrySource,
        hours: i64,
        min_points: u64,
    ) -> Result<EnergyStats>;
    /// Records in `[now − hours, now)`, ascending by timestamp.
    async fn series(
        &self,
        source: TelemetrySource,
        hours: i64,
        limit: u32,
    ) -> Result<Vec<EnergyRecord>>;
    async fn record_count(&self, source: TelemetrySource) -> Result<u64>;
    async fn prune_records_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Sessions and ordered messages. The query path is the sole writer.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_session(&self) -> Result<Session>;
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;
    async fn append_message(&self, message: &NewMessage) -> Result<i64>;
    /// Last `limit` messages of a session in chronological order.
    async fn recent_messages(&self, session_id: Uuid, limit: u32) -> Result<Vec<Message>>;
    async fn session_messages(&self, session_id: Uuid) -> Result<Vec<Message>>;
    async fn list_sessions(&self, limit: u32) -> Result<Vec<SessionSummary>>;
}

/// Health snapshot persistence (14-day retention handled by the retention
/// loop).
#[async_trait]
pub trait HealthStore: Send + Sync {
    async fn record_snapshot(&self, snapshot: &HealthSnapshot) -> Result<()>;
    async fn latest_snapshot(&self) -> Result<Option<HealthSnapshot>>;
    async fn prune_snapshots_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// Unified backend supertrait
// ---------------------------------------------------------------------------

/// A complete database backend combining all store traits plus lifecycle
/// operations.
#[async_trait]
pub trait DatabaseBackend:
    DocumentStore + ChunkStore + SyncLogStore + TelemetryStore + ConversationStore + HealthStore
{
    /// Cheap connectivity check used by the health monitor.
    async fn ping(&self) -> Result<()>;

    /// Sync with remote (e.g. Turso replication). No-op for local backends.
    async fn sync(&self) -> Result<()>;
}
