use libsql::Connection;

use crate::error::Result;

/// Initialize all tables. Prefixes partition the store by concern:
/// `kb_*` for the knowledge base, `agent_*` for conversations, `energy_*`
/// for telemetry, `monitoring_*` for health snapshots.
pub async fn init_schema(conn: &Connection, embedding_dims: usize) -> Result<()> {
    let ddl = format!(
        r#"
        -- Knowledge base documents
        CREATE TABLE IF NOT EXISTS kb_documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            folder_path TEXT NOT NULL,
            mime TEXT NOT NULL,
            content TEXT NOT NULL,
            token_count INTEGER NOT NULL,
            is_context_file INTEGER NOT NULL DEFAULT 0,
            context_category TEXT,
            last_synced TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_kb_documents_folder ON kb_documents(folder_path);
        CREATE INDEX IF NOT EXISTS idx_kb_documents_context
            ON kb_documents(is_context_file, context_category);

        -- Chunks with vector embedding
        CREATE TABLE IF NOT EXISTS kb_chunks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL,
            chunk_index INTEGER NOT NULL,
            content TEXT NOT NULL,
            token_count INTEGER NOT NULL,
            embedding F32_BLOB({embedding_dims}) NOT NULL,
            FOREIGN KEY (document_id) REFERENCES kb_documents(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_kb_chunks_document_id ON kb_chunks(document_id);
        CREATE INDEX IF NOT EXISTS idx_kb_chunks_embedding
            ON kb_chunks(libsql_vector_idx(embedding));

        -- Sync run log
        CREATE TABLE IF NOT EXISTS kb_sync_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'running',
            started_at TEXT NOT NULL,
            completed_at TEXT,
            processed INTEGER NOT NULL DEFAULT 0,
            updated INTEGER NOT NULL DEFAULT 0,
            failed INTEGER NOT NULL DEFAULT 0,
            triggered_by TEXT NOT NULL,
            error TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_kb_sync_log_status ON kb_sync_log(status);

        -- Conversations
        CREATE TABLE IF NOT EXISTS agent_sessions (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_agent_sessions_updated ON agent_sessions(updated_at);

        CREATE TABLE IF NOT EXISTS agent_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            agent_used TEXT,
            agent_role TEXT,
            duration_ms INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY (session_id) REFERENCES agent_sessions(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_agent_messages_session
            ON agent_messages(session_id, created_at);

        -- Append-only energy telemetry; (source, ts) dedupes poller retries
        CREATE TABLE IF NOT EXISTS energy_telemetry (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            ts TEXT NOT NULL,
            soc_percent REAL NOT NULL,
            battery_power_w REAL NOT NULL,
            pv_power_w REAL NOT NULL,
            load_power_w REAL NOT NULL,
            grid_power_w REAL NOT NULL,
            battery_voltage REAL,
            charging INTEGER NOT NULL DEFAULT 0,
            discharging INTEGER NOT NULL DEFAULT 0,
            exporting INTEGER NOT NULL DEFAULT 0,
            importing INTEGER NOT NULL DEFAULT 0,
            UNIQUE (source, ts)
        );

        CREATE INDEX IF NOT EXISTS idx_energy_telemetry_source_ts
            ON energy_telemetry(source, ts);

        -- Health snapshots, 14-day retention
        CREATE TABLE IF NOT EXISTS monitoring_health (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ts TEXT NOT NULL,
            db_ok INTEGER NOT NULL,
            cache_ok INTEGER NOT NULL,
            snapshot TEXT NOT NULL DEFAULT '{{}}'
        );

        CREATE INDEX IF NOT EXISTS idx_monitoring_health_ts ON monitoring_health(ts);
        "#
    );

    conn.execute_batch(&ddl).await?;

    Ok(())
}
