//! Hourly call accounting for rate-limited upstreams.
//!
//! The embedding provider and the battery-monitor API both impose hourly
//! quotas. Callers check `try_acquire` before an outbound call; health
//! reporting reads `usage` to surface approaching-limit telemetry.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

#[derive(Debug)]
struct QuotaWindow {
    window_start: DateTime<Utc>,
    count: u32,
}

#[derive(Debug)]
pub struct HourlyQuota {
    name: &'static str,
    limit: u32,
    state: Mutex<QuotaWindow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QuotaUsage {
    pub used: u32,
    pub limit: u32,
    pub approaching_limit: bool,
}

impl HourlyQuota {
    pub fn new(name: &'static str, limit: u32) -> Self {
        Self {
            name,
            limit,
            state: Mutex::new(QuotaWindow {
                window_start: Utc::now(),
                count: 0,
            }),
        }
    }

    /// Record one call if the current hour still has room. Returns false
    /// when the quota is exhausted; the caller backs off until the window
    /// rolls over.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let now = Utc::now();
        if now - state.window_start >= Duration::hours(1) {
            state.window_start = now;
            state.count = 0;
        }

        if state.count >= self.limit {
            return false;
        }

        state.count += 1;
        let usage = Self::usage_from(state.count, self.limit);
        if usage.approaching_limit {
            tracing::warn!(
                quota = self.name,
                used = usage.used,
                limit = usage.limit,
                "Hourly quota approaching limit"
            );
        }
        true
    }

    pub fn usage(&self) -> QuotaUsage {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let now = Utc::now();
        if now - state.window_start >= Duration::hours(1) {
            state.window_start = now;
            state.count = 0;
        }

        Self::usage_from(state.count, self.limit)
    }

    fn usage_from(used: u32, limit: u32) -> QuotaUsage {
        QuotaUsage {
            used,
            limit,
            approaching_limit: limit > 0 && used * 5 >= limit * 4,
        }
    }
}
