use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::repository::{
    ChunkRepository, ConversationRepository, DocumentRepository, HealthRepository,
    SyncLogRepository, TelemetryRepository,
};
use crate::db::traits::{
    ChunkStore, ConversationStore, DatabaseBackend, DocumentStore, HealthSnapshot, HealthStore,
    SyncLogStore, TelemetryStore,
};
use crate::db::Database;
use crate::error::Result;
use crate::models::{
    Chunk, Document, DocumentFilter, DocumentSummary, EnergyRecord, EnergyStats, KbSearchHit,
    Message, NewChunk, NewDocument, NewMessage, Session, SessionSummary, SyncKind, SyncRun,
    SyncStatus, TelemetrySource,
};

/// libsql-backed implementation of every store trait. Each call opens a
/// connection from the shared database handle and delegates to the
/// repository layer.
pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentStore for LibSqlBackend {
    async fn upsert_document(&self, doc: &NewDocument) -> Result<i64> {
        let conn = self.db.connect()?;
        DocumentRepository::upsert(&conn, doc).await
    }

    async fn get_document_by_external_id(&self, external_id: &str) -> Result<Option<Document>> {
        let conn = self.db.connect()?;
        DocumentRepository::get_by_external_id(&conn, external_id).await
    }

    async fn delete_document(&self, external_id: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        DocumentRepository::delete_by_external_id(&conn, external_id).await
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<DocumentSummary>> {
        let conn = self.db.connect()?;
        DocumentRepository::list(&conn, filter).await
    }

    async fn list_external_ids(&self) -> Result<Vec<String>> {
        let conn = self.db.connect()?;
        DocumentRepository::list_external_ids(&conn).await
    }

    async fn get_context_files(&self, categories: Option<&[String]>) -> Result<Vec<Document>> {
        let conn = self.db.connect()?;
        DocumentRepository::context_files(&conn, categories).await
    }
}

#[async_trait]
impl ChunkStore for LibSqlBackend {
    async fn replace_chunks(&self, document_id: i64, chunks: &[NewChunk]) -> Result<()> {
        let conn = self.db.connect()?;
        ChunkRepository::replace(&conn, document_id, chunks).await
    }

    async fn get_chunks(&self, document_id: i64) -> Result<Vec<Chunk>> {
        let conn = self.db.connect()?;
        ChunkRepository::get_by_document(&conn, document_id).await
    }

    async fn search_chunks(
        &self,
        embedding: &[f32],
        limit: u32,
        folder_prefix: Option<&str>,
    ) -> Result<Vec<KbSearchHit>> {
        let conn = self.db.connect()?;
        ChunkRepository::search_similar(&conn, embedding, limit, folder_prefix).await
    }
}

#[async_trait]
impl SyncLogStore for LibSqlBackend {
    async fn begin_sync_run(&self, kind: SyncKind, triggered_by: &str) -> Result<i64> {
        let conn = self.db.connect()?;
        SyncLogRepository::begin(&conn, kind, triggered_by).await
    }

    async fn finish_sync_run(
        &self,
        id: i64,
        status: SyncStatus,
        processed: i64,
        updated: i64,
        failed: i64,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.db.connect()?;
        SyncLogRepository::finish(&conn, id, status, processed, updated, failed, error).await
    }

    async fn latest_sync_run(&self) -> Result<Option<SyncRun>> {
        let conn = self.db.connect()?;
        SyncLogRepository::latest(&conn).await
    }
}

#[async_trait]
impl TelemetryStore for LibSqlBackend {
    async fn append_record(&self, record: &EnergyRecord) -> Result<bool> {
        let conn = self.db.connect()?;
        TelemetryRepository::append(&conn, record).await
    }

    async fn latest_record(&self, source: TelemetrySource) -> Result<Option<EnergyRecord>> {
        let conn = self.db.connect()?;
        TelemetryRepository::latest(&conn, source).await
    }

    async fn stats(
        &self,
        source: TelemetrySource,
        hours: i64,
        min_points: u64,
    ) -> Result<EnergyStats> {
        let conn = self.db.connect()?;
        TelemetryRepository::stats(&conn, source, hours, min_points).await
    }

    async fn series(
        &self,
        source: TelemetrySource,
        hours: i64,
        limit: u32,
    ) -> Result<Vec<EnergyRecord>> {
        let conn = self.db.connect()?;
        TelemetryRepository::series(&conn, source, hours, limit).await
    }

    async fn record_count(&self, source: TelemetrySource) -> Result<u64> {
        let conn = self.db.connect()?;
        TelemetryRepository::count(&conn, source).await
    }

    async fn prune_records_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let conn = self.db.connect()?;
        TelemetryRepository::prune_before(&conn, cutoff).await
    }
}

#[async_trait]
impl ConversationStore for LibSqlBackend {
    async fn create_session(&self) -> Result<Session> {
        let conn = self.db.connect()?;
        ConversationRepository::create_session(&conn).await
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        let conn = self.db.connect()?;
        ConversationRepository::get_session(&conn, id).await
    }

    async fn append_message(&self, message: &NewMessage) -> Result<i64> {
        let conn = self.db.connect()?;
        ConversationRepository::append_message(&conn, message).await
    }

    async fn recent_messages(&self, session_id: Uuid, limit: u32) -> Result<Vec<Message>> {
        let conn = self.db.connect()?;
        ConversationRepository::recent_messages(&conn, session_id, limit).await
    }

    async fn session_messages(&self, session_id: Uuid) -> Result<Vec<Message>> {
        let conn = self.db.connect()?;
        ConversationRepository::session_messages(&conn, session_id).await
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<SessionSummary>> {
        let conn = self.db.connect()?;
        ConversationRepository::list_sessions(&conn, limit).await
    }
}

#[async_trait]
impl HealthStore for LibSqlBackend {
    async fn record_snapshot(&self, snapshot: &HealthSnapshot) -> Result<()> {
        let conn = self.db.connect()?;
        HealthRepository::record(&conn, snapshot).await
    }

    async fn latest_snapshot(&self) -> Result<Option<HealthSnapshot>> {
        let conn = self.db.connect()?;
        HealthRepository::latest(&conn).await
    }

    async fn prune_snapshots_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let conn = self.db.connect()?;
        HealthRepository::prune_before(&conn, cutoff).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn ping(&self) -> Result<()> {
        let conn = self.db.connect()?;
        let mut rows = conn.query("SELECT 1", ()).await?;
        rows.next().await?;
        Ok(())
    }

    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}
