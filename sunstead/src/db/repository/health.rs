use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::db::traits::{HealthSnapshot, SourceHealth};
use crate::error::Result;

use super::parse_ts;

pub struct HealthRepository;

impl HealthRepository {
    pub async fn record(conn: &Connection, snapshot: &HealthSnapshot) -> Result<()> {
        let sources_json = serde_json::to_string(&snapshot.sources)?;

        conn.execute(
            r#"
            INSERT INTO monitoring_health (ts, db_ok, cache_ok, snapshot)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                snapshot.ts.to_rfc3339(),
                snapshot.db_ok as i64,
                snapshot.cache_ok as i64,
                sources_json,
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn latest(conn: &Connection) -> Result<Option<HealthSnapshot>> {
        let mut rows = conn
            .query(
                r#"
                SELECT ts, db_ok, cache_ok, snapshot
                FROM monitoring_health
                ORDER BY id DESC
                LIMIT 1
                "#,
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let sources: Vec<SourceHealth> =
                    serde_json::from_str(&row.get::<String>(3)?).unwrap_or_default();
                Ok(Some(HealthSnapshot {
                    ts: parse_ts(&row.get::<String>(0)?)?,
                    db_ok: row.get::<i64>(1)? != 0,
                    cache_ok: row.get::<i64>(2)? != 0,
                    sources,
                }))
            }
            None => Ok(None),
        }
    }

    pub async fn prune_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM monitoring_health WHERE ts < ?1",
                params![cutoff.to_rfc3339()],
            )
            .await?;
        Ok(affected)
    }
}
