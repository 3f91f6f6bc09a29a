use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::db::DatabaseBackend;
use crate::error::Result;

/// Health snapshots are kept for 14 days.
const HEALTH_RETENTION_DAYS: i64 = 14;

/// Prunes raw telemetry past its retention window and aged health
/// snapshots. Telemetry is append-only everywhere else; this loop is the
/// only deleter.
pub struct RetentionManager {
    db: Arc<dyn DatabaseBackend>,
    telemetry_retention_hours: i64,
    interval_secs: u64,
}

impl RetentionManager {
    pub fn new(db: Arc<dyn DatabaseBackend>, telemetry_retention_hours: i64) -> Self {
        Self {
            db,
            // The raw window never shrinks below 72h.
            telemetry_retention_hours: telemetry_retention_hours.max(72),
            interval_secs: 3600,
        }
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub async fn run_once(&self) -> Result<()> {
        let telemetry_cutoff = Utc::now() - Duration::hours(self.telemetry_retention_hours);
        let pruned = self.db.prune_records_before(telemetry_cutoff).await?;
        if pruned > 0 {
            tracing::info!(pruned, cutoff = %telemetry_cutoff, "Pruned raw telemetry");
        }

        let health_cutoff = Utc::now() - Duration::days(HEALTH_RETENTION_DAYS);
        let pruned = self.db.prune_snapshots_before(health_cutoff).await?;
        if pruned > 0 {
            tracing::info!(pruned, cutoff = %health_cutoff, "Pruned health snapshots");
        }

        Ok(())
    }
}
