use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::db::DatabaseBackend;
use crate::models::TelemetrySource;

use super::registry::{Tool, ToolOutcome};

/// Clamp requested hours to the supported window (1 hour to 7 days).
fn clamp_hours(args: &Value) -> i64 {
    args.get("hours").and_then(Value::as_i64).unwrap_or(24).clamp(1, 168)
}

/// `historical_stats(hours)`: aggregate statistics over a recent window.
pub struct HistoricalStatsTool {
    db: Arc<dyn DatabaseBackend>,
    min_points: u64,
}

impl HistoricalStatsTool {
    pub fn new(db: Arc<dyn DatabaseBackend>, min_points: u64) -> Self {
        Self { db, min_points }
    }
}

#[async_trait]
impl Tool for HistoricalStatsTool {
    fn name(&self) -> &'static str {
        "historical_stats"
    }

    fn description(&self) -> &'static str {
        "Aggregate stats over the last N hours (args: {\"hours\": 1..168}); \
         low_confidence flags thin data"
    }

    async fn call(&self, args: &Value) -> ToolOutcome {
        let hours = clamp_hours(args);

        match self
            .db
            .stats(TelemetrySource::Inverter, hours, self.min_points)
            .await
        {
            Ok(stats) => match serde_json::to_value(&stats) {
                Ok(value) => ToolOutcome::ok(value),
                Err(e) => ToolOutcome::failed(format!("Stats serialization failed: {e}")),
            },
            Err(e) => ToolOutcome::failed(format!("Stats query failed: {e}")),
        }
    }
}

/// `time_series(hours, limit)`: ordered raw records.
pub struct TimeSeriesTool {
    db: Arc<dyn DatabaseBackend>,
}

impl TimeSeriesTool {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for TimeSeriesTool {
    fn name(&self) -> &'static str {
        "time_series"
    }

    fn description(&self) -> &'static str {
        "Raw readings over the last N hours, ascending by timestamp \
         (args: {\"hours\": 1..168, \"limit\": up to 500})"
    }

    async fn call(&self, args: &Value) -> ToolOutcome {
        let hours = clamp_hours(args);
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(60)
            .clamp(1, 500) as u32;

        match self
            .db
            .series(TelemetrySource::Inverter, hours, limit)
            .await
        {
            Ok(records) => {
                let points: Vec<Value> = records
                    .iter()
                    .map(|r| {
                        json!({
                            "ts": r.ts.to_rfc3339(),
                            "soc_percent": r.soc_percent,
                            "pv_power_w": r.pv_power_w,
                            "load_power_w": r.load_power_w,
                            "battery_power_w": r.battery_power_w,
                        })
                    })
                    .collect();
                ToolOutcome::ok(json!({ "hours": hours, "points": points }))
            }
            Err(e) => ToolOutcome::failed(format!("Series query failed: {e}")),
        }
    }
}
