use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::db::DatabaseBackend;
use crate::models::TelemetrySource;

use super::registry::{Tool, ToolOutcome};

/// `current_status()`: the latest inverter reading.
pub struct CurrentStatusTool {
    db: Arc<dyn DatabaseBackend>,
}

impl CurrentStatusTool {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for CurrentStatusTool {
    fn name(&self) -> &'static str {
        "current_status"
    }

    fn description(&self) -> &'static str {
        "Latest system reading: battery SOC %, PV watts, load watts, battery watts, grid watts"
    }

    async fn call(&self, _args: &Value) -> ToolOutcome {
        match self.db.latest_record(TelemetrySource::Inverter).await {
            Ok(Some(record)) => ToolOutcome::ok(json!({
                "soc_percent": record.soc_percent,
                "pv_power_w": record.pv_power_w,
                "load_power_w": record.load_power_w,
                "battery_power_w": record.battery_power_w,
                "grid_power_w": record.grid_power_w,
                "ts": record.ts.to_rfc3339(),
            })),
            Ok(None) => ToolOutcome::failed("No telemetry recorded yet"),
            Err(e) => ToolOutcome::failed(format!("Telemetry read failed: {e}")),
        }
    }
}

/// `detailed_status()`: current reading plus derived flow flags and raw
/// voltages where present, from both sources.
pub struct DetailedStatusTool {
    db: Arc<dyn DatabaseBackend>,
}

impl DetailedStatusTool {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for DetailedStatusTool {
    fn name(&self) -> &'static str {
        "detailed_status"
    }

    fn description(&self) -> &'static str {
        "Current reading plus power-flow flags and raw voltages from inverter and battery monitor"
    }

    async fn call(&self, _args: &Value) -> ToolOutcome {
        let inverter = match self.db.latest_record(TelemetrySource::Inverter).await {
            Ok(record) => record,
            Err(e) => return ToolOutcome::failed(format!("Telemetry read failed: {e}")),
        };

        let Some(inverter) = inverter else {
            return ToolOutcome::failed("No telemetry recorded yet");
        };

        // The shunt is optional detail; its absence never fails the call.
        let shunt = self
            .db
            .latest_record(TelemetrySource::BatteryMonitor)
            .await
            .unwrap_or_default();

        let mut value = json!({
            "soc_percent": inverter.soc_percent,
            "pv_power_w": inverter.pv_power_w,
            "load_power_w": inverter.load_power_w,
            "battery_power_w": inverter.battery_power_w,
            "grid_power_w": inverter.grid_power_w,
            "battery_voltage": inverter.battery_voltage,
            "flags": {
                "charging": inverter.flags.charging,
                "discharging": inverter.flags.discharging,
                "exporting": inverter.flags.exporting,
                "importing": inverter.flags.importing,
            },
            "ts": inverter.ts.to_rfc3339(),
        });

        if let Some(shunt) = shunt {
            value["battery_monitor"] = json!({
                "soc_percent": shunt.soc_percent,
                "battery_power_w": shunt.battery_power_w,
                "battery_voltage": shunt.battery_voltage,
                "ts": shunt.ts.to_rfc3339(),
            });
        }

        ToolOutcome::ok(value)
    }
}
