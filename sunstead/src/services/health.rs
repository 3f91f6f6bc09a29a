use std::sync::Arc;

use chrono::Utc;

use crate::cache::BundleCache;
use crate::db::traits::{HealthSnapshot, SourceHealth};
use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::models::TelemetrySource;
use crate::quota::QuotaUsage;

/// Periodic health aggregation: DB connectivity, cache state, per-source
/// record counts and staleness. Snapshots are persisted for the monitoring
/// endpoint and pruned on a 14-day horizon by the retention loop.
pub struct HealthMonitor {
    db: Arc<dyn DatabaseBackend>,
    cache: BundleCache,
    interval_secs: u64,
    quotas: Vec<(&'static str, Box<dyn Fn() -> QuotaUsage + Send + Sync>)>,
}

impl HealthMonitor {
    pub fn new(db: Arc<dyn DatabaseBackend>, cache: BundleCache, interval_secs: u64) -> Self {
        Self {
            db,
            cache,
            interval_secs,
            quotas: Vec::new(),
        }
    }

    /// Register a quota readout to watch; usage is logged when a quota
    /// approaches its hourly limit.
    pub fn watch_quota(
        mut self,
        name: &'static str,
        usage: impl Fn() -> QuotaUsage + Send + Sync + 'static,
    ) -> Self {
        self.quotas.push((name, Box::new(usage)));
        self
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub async fn run_once(&self) -> Result<HealthSnapshot> {
        let db_ok = match self.db.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Database health check failed");
                false
            }
        };

        let cache_ok = self.cache.is_enabled();

        let mut sources = Vec::new();
        for source in [TelemetrySource::Inverter, TelemetrySource::BatteryMonitor] {
            let record_count = self.db.record_count(source).await.unwrap_or(0);
            let last_record_age_secs = match self.db.latest_record(source).await {
                Ok(Some(record)) => Some((Utc::now() - record.ts).num_seconds()),
                _ => None,
            };
            sources.push(SourceHealth {
                source,
                record_count,
                last_record_age_secs,
            });
        }

        for (name, usage) in &self.quotas {
            let usage = usage();
            if usage.approaching_limit {
                tracing::warn!(
                    quota = name,
                    used = usage.used,
                    limit = usage.limit,
                    "Quota approaching hourly limit"
                );
            }
        }

        let snapshot = HealthSnapshot {
            ts: Utc::now(),
            db_ok,
            cache_ok,
            sources,
        };

        if db_ok {
            if let Err(e) = self.db.record_snapshot(&snapshot).await {
                tracing::warn!(error = %e, "Failed to persist health snapshot");
            }
        }

        Ok(snapshot)
    }
}
