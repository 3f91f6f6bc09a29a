use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telemetry origin. Each source has its own poller and its own monotonic
/// timestamp sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TelemetrySource {
    Inverter,
    BatteryMonitor,
}

impl TelemetrySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inverter => "inverter",
            Self::BatteryMonitor => "battery_monitor",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "inverter" => Some(Self::Inverter),
            "battery_monitor" => Some(Self::BatteryMonitor),
            _ => None,
        }
    }
}

/// Power-flow direction flags derived from the signed power readings at
/// append time, so every consumer sees the same interpretation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FlowFlags {
    pub charging: bool,
    pub discharging: bool,
    pub exporting: bool,
    pub importing: bool,
}

impl FlowFlags {
    /// Battery power is signed + charging, − discharging; grid power is
    /// signed + export, − import.
    pub fn derive(battery_power_w: f64, grid_power_w: f64) -> Self {
        Self {
            charging: battery_power_w > 0.0,
            discharging: battery_power_w < 0.0,
            exporting: grid_power_w > 0.0,
            importing: grid_power_w < 0.0,
        }
    }
}

/// One appended telemetry record. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EnergyRecord {
    pub source: TelemetrySource,
    pub ts: DateTime<Utc>,
    /// State of charge, 0..=100.
    pub soc_percent: f64,
    pub battery_power_w: f64,
    pub pv_power_w: f64,
    pub load_power_w: f64,
    pub grid_power_w: f64,
    pub battery_voltage: Option<f64>,
    pub flags: FlowFlags,
}

impl EnergyRecord {
    pub fn new(
        source: TelemetrySource,
        ts: DateTime<Utc>,
        soc_percent: f64,
        battery_power_w: f64,
        pv_power_w: f64,
        load_power_w: f64,
        grid_power_w: f64,
        battery_voltage: Option<f64>,
    ) -> Self {
        Self {
            source,
            ts,
            soc_percent: soc_percent.clamp(0.0, 100.0),
            battery_power_w,
            pv_power_w,
            load_power_w,
            grid_power_w,
            battery_voltage,
            flags: FlowFlags::derive(battery_power_w, grid_power_w),
        }
    }
}

/// Statistical aggregates over a half-open window `[now − hours, now)`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EnergyStats {
    pub source: TelemetrySource,
    pub window_hours: i64,
    pub count: u64,
    pub soc_avg: f64,
    pub soc_min: f64,
    pub soc_max: f64,
    pub pv_avg_w: f64,
    pub pv_max_w: f64,
    pub load_avg_w: f64,
    pub load_max_w: f64,
    pub battery_avg_w: f64,
    /// Set when the window holds fewer points than the configured analytic
    /// minimum; consumers should present these numbers cautiously.
    pub low_confidence: bool,
}

impl EnergyStats {
    /// A well-formed all-zero stats block for an empty window.
    pub fn zeroed(source: TelemetrySource, window_hours: i64) -> Self {
        Self {
            source,
            window_hours,
            count: 0,
            soc_avg: 0.0,
            soc_min: 0.0,
            soc_max: 0.0,
            pv_avg_w: 0.0,
            pv_max_w: 0.0,
            load_avg_w: 0.0,
            load_max_w: 0.0,
            battery_avg_w: 0.0,
            low_confidence: true,
        }
    }
}
