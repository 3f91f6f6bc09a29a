use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::models::{EnergyRecord, TelemetrySource};

/// An upstream telemetry provider the poller can fetch one reading from.
#[async_trait]
pub trait TelemetryFetcher: Send + Sync {
    fn source(&self) -> TelemetrySource;
    async fn fetch(&self) -> Result<EnergyRecord>;
}

/// One background poll loop: fetch a reading, append it idempotently, and
/// back off exponentially on consecutive failures.
pub struct Poller {
    fetcher: Arc<dyn TelemetryFetcher>,
    db: Arc<dyn DatabaseBackend>,
    interval_secs: u64,
    max_consecutive_failures: u32,
    consecutive_failures: AtomicU32,
}

impl Poller {
    pub fn new(
        fetcher: Arc<dyn TelemetryFetcher>,
        db: Arc<dyn DatabaseBackend>,
        interval_secs: u64,
        max_consecutive_failures: u32,
    ) -> Self {
        Self {
            fetcher,
            db,
            interval_secs,
            max_consecutive_failures,
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn source(&self) -> TelemetrySource {
        self.fetcher.source()
    }

    /// Delay until the next poll. Failures double the base interval up to a
    /// cap so a dead upstream is retried lazily rather than hammered.
    pub fn next_delay_secs(&self) -> u64 {
        let failures = self
            .consecutive_failures
            .load(Ordering::Relaxed)
            .min(self.max_consecutive_failures)
            .min(5);
        (self.interval_secs * 2_u64.pow(failures)).min(3600)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// One poll cycle. Returns true when a new record was appended (a
    /// duplicate timestamp counts as success and just doesn't append).
    pub async fn run_once(&self) -> Result<bool> {
        match self.fetcher.fetch().await {
            Ok(record) => {
                let appended = self.db.append_record(&record).await?;
                self.consecutive_failures.store(0, Ordering::Relaxed);
                if !appended {
                    tracing::debug!(
                        source = self.source().as_str(),
                        ts = %record.ts,
                        "Telemetry record already present; skipped"
                    );
                }
                Ok(appended)
            }
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.max_consecutive_failures {
                    tracing::error!(
                        source = self.source().as_str(),
                        consecutive_failures = failures,
                        error = %e,
                        "Poller failing persistently"
                    );
                } else {
                    tracing::warn!(
                        source = self.source().as_str(),
                        consecutive_failures = failures,
                        error = %e,
                        "Poll failed"
                    );
                }
                Err(e)
            }
        }
    }
}
