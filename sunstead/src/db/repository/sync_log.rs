use chrono::Utc;
use libsql::{params, Connection};

use crate::error::{Result, SunsteadError};
use crate::models::{SyncKind, SyncRun, SyncStatus};

use super::parse_ts;

pub struct SyncLogRepository;

impl SyncLogRepository {
    /// Open a new run. At most one non-terminal run may exist at a time.
    pub async fn begin(conn: &Connection, kind: SyncKind, triggered_by: &str) -> Result<i64> {
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM kb_sync_log WHERE status = 'running'",
                (),
            )
            .await?;
        let running = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        if running > 0 {
            return Err(SunsteadError::Sync("A sync run is already in progress".into()));
        }

        conn.execute(
            r#"
            INSERT INTO kb_sync_log (kind, status, started_at, triggered_by)
            VALUES (?1, 'running', ?2, ?3)
            "#,
            params![kind.as_str(), Utc::now().to_rfc3339(), triggered_by],
        )
        .await?;

        let mut rows = conn.query("SELECT last_insert_rowid()", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Err(SunsteadError::Internal("Failed to read sync run id".into())),
        }
    }

    pub async fn finish(
        conn: &Connection,
        id: i64,
        status: SyncStatus,
        processed: i64,
        updated: i64,
        failed: i64,
        error: Option<&str>,
    ) -> Result<()> {
        conn.execute(
            r#"
            UPDATE kb_sync_log
            SET status = ?2, completed_at = ?3, processed = ?4, updated = ?5,
                failed = ?6, error = ?7
            WHERE id = ?1
            "#,
            params![
                id,
                status.as_str(),
                Utc::now().to_rfc3339(),
                processed,
                updated,
                failed,
                error,
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn latest(conn: &Connection) -> Result<Option<SyncRun>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, kind, status, started_at, completed_at,
                       processed, updated, failed, triggered_by, error
                FROM kb_sync_log
                ORDER BY id DESC
                LIMIT 1
                "#,
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let kind_raw = row.get::<String>(1)?;
                let status_raw = row.get::<String>(2)?;
                let completed_at = row
                    .get::<Option<String>>(4)?
                    .map(|s| parse_ts(&s))
                    .transpose()?;

                Ok(Some(SyncRun {
                    id: row.get::<i64>(0)?,
                    kind: SyncKind::parse(&kind_raw).ok_or_else(|| {
                        SunsteadError::Internal(format!("Unknown sync kind '{kind_raw}'"))
                    })?,
                    status: SyncStatus::parse(&status_raw).ok_or_else(|| {
                        SunsteadError::Internal(format!("Unknown sync status '{status_raw}'"))
                    })?,
                    started_at: parse_ts(&row.get::<String>(3)?)?,
                    completed_at,
                    processed: row.get::<i64>(5)?,
                    updated: row.get::<i64>(6)?,
                    failed: row.get::<i64>(7)?,
                    triggered_by: row.get::<String>(8)?,
                    error: row.get::<Option<String>>(9)?,
                }))
            }
            None => Ok(None),
        }
    }
}
