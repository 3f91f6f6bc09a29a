//! Planning tools: battery optimization, miner coordination, and the
//! hour-bucketed energy plan.
//!
//! All three read policy thresholds out of the tier-1 `system` context files
//! so operators tune policy by editing documents, not by redeploying. The
//! recommendations are deterministic given telemetry and thresholds.

use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Timelike;
use regex::Regex;
use serde_json::{json, Value};

use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::models::{Document, EnergyRecord, TelemetrySource};

use super::registry::{Tool, ToolOutcome};

/// Operating thresholds parsed from policy documents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyThresholds {
    /// SOC floor; below this the battery is protected.
    pub min_soc: f64,
    /// SOC at which miners may start.
    pub miner_start_soc: f64,
    /// SOC at which running miners stop.
    pub miner_stop_soc: f64,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            min_soc: 40.0,
            miner_start_soc: 60.0,
            miner_stop_soc: 50.0,
        }
    }
}

static MIN_SOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)minimum\s+(?:battery\s+)?soc[^0-9]{0,20}(\d{1,3})").unwrap()
});
static MINER_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)miners?\s+(?:may\s+)?start[^0-9]{0,30}(\d{1,3})").unwrap()
});
static MINER_STOP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)miners?\s+(?:must\s+)?stop[^0-9]{0,30}(\d{1,3})").unwrap()
});

impl PolicyThresholds {
    /// Scan tier-1 policy text for threshold statements; anything not found
    /// keeps its default.
    pub fn from_documents(docs: &[Document]) -> Self {
        let mut thresholds = Self::default();

        for doc in docs {
            if let Some(v) = capture_percent(&MIN_SOC_RE, &doc.content) {
                thresholds.min_soc = v;
            }
            if let Some(v) = capture_percent(&MINER_START_RE, &doc.content) {
                thresholds.miner_start_soc = v;
            }
            if let Some(v) = capture_percent(&MINER_STOP_RE, &doc.content) {
                thresholds.miner_stop_soc = v;
            }
        }

        thresholds
    }
}

fn capture_percent(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)?
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|v| (0.0..=100.0).contains(v))
}

async fn load_thresholds(db: &Arc<dyn DatabaseBackend>) -> Result<PolicyThresholds> {
    let categories = vec!["system".to_string()];
    let docs = db.get_context_files(Some(&categories)).await?;
    Ok(PolicyThresholds::from_documents(&docs))
}

async fn load_current(db: &Arc<dyn DatabaseBackend>) -> std::result::Result<EnergyRecord, String> {
    match db.latest_record(TelemetrySource::Inverter).await {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err("No telemetry recorded yet".to_string()),
        Err(e) => Err(format!("Telemetry read failed: {e}")),
    }
}

fn pv_surplus_w(record: &EnergyRecord) -> f64 {
    record.pv_power_w - record.load_power_w
}

/// `optimize_battery()`: charge/discharge recommendation from current state
/// and policy thresholds.
pub struct OptimizeBatteryTool {
    db: Arc<dyn DatabaseBackend>,
}

impl OptimizeBatteryTool {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for OptimizeBatteryTool {
    fn name(&self) -> &'static str {
        "optimize_battery"
    }

    fn description(&self) -> &'static str {
        "Battery charge/discharge recommendation from current state and policy thresholds"
    }

    async fn call(&self, _args: &Value) -> ToolOutcome {
        let current = match load_current(&self.db).await {
            Ok(record) => record,
            Err(reason) => return ToolOutcome::failed(reason),
        };
        let thresholds = match load_thresholds(&self.db).await {
            Ok(t) => t,
            Err(e) => return ToolOutcome::failed(format!("Policy read failed: {e}")),
        };

        let soc = current.soc_percent;
        let surplus = pv_surplus_w(&current);

        let recommendation = if soc < thresholds.min_soc {
            format!(
                "Battery at {soc:.0}% is below the {:.0}% minimum. Shed discretionary loads \
                 and prioritize charging; avoid any discharge beyond essentials.",
                thresholds.min_soc
            )
        } else if surplus > 0.0 {
            format!(
                "Battery at {soc:.0}% with {surplus:.0} W of PV surplus. Let the surplus \
                 charge the bank; discretionary loads can run without drawing the battery down."
            )
        } else {
            format!(
                "Battery at {soc:.0}% and loads exceed PV by {:.0} W. Hold discretionary \
                 loads until production recovers to protect the {:.0}% floor.",
                -surplus, thresholds.min_soc
            )
        };

        ToolOutcome::ok(json!({
            "recommendation": recommendation,
            "soc_percent": soc,
            "pv_surplus_w": surplus,
            "min_soc": thresholds.min_soc,
        }))
    }
}

/// `coordinate_miners()`: on/off recommendation with justification.
pub struct CoordinateMinersTool {
    db: Arc<dyn DatabaseBackend>,
}

impl CoordinateMinersTool {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for CoordinateMinersTool {
    fn name(&self) -> &'static str {
        "coordinate_miners"
    }

    fn description(&self) -> &'static str {
        "Miner on/off recommendation from SOC, PV surplus, and policy thresholds"
    }

    async fn call(&self, _args: &Value) -> ToolOutcome {
        let current = match load_current(&self.db).await {
            Ok(record) => record,
            Err(reason) => return ToolOutcome::failed(reason),
        };
        let thresholds = match load_thresholds(&self.db).await {
            Ok(t) => t,
            Err(e) => return ToolOutcome::failed(format!("Policy read failed: {e}")),
        };

        let soc = current.soc_percent;
        let surplus = pv_surplus_w(&current);

        let (action, justification) = if soc < thresholds.min_soc {
            (
                "off",
                format!(
                    "SOC {soc:.0}% is below the minimum threshold of {:.0}%; miners must stay off \
                     until the battery recovers.",
                    thresholds.min_soc
                ),
            )
        } else if soc >= thresholds.miner_start_soc && surplus > 0.0 {
            (
                "on",
                format!(
                    "SOC {soc:.0}% is at or above the {:.0}% start threshold with {surplus:.0} W \
                     of PV surplus to absorb.",
                    thresholds.miner_start_soc
                ),
            )
        } else if soc < thresholds.miner_stop_soc {
            (
                "off",
                format!(
                    "SOC {soc:.0}% is below the {:.0}% stop threshold.",
                    thresholds.miner_stop_soc
                ),
            )
        } else {
            (
                "hold",
                format!(
                    "SOC {soc:.0}% sits between stop ({:.0}%) and start ({:.0}%) thresholds; \
                     keep miners in their current state.",
                    thresholds.miner_stop_soc, thresholds.miner_start_soc
                ),
            )
        };

        ToolOutcome::ok(json!({
            "action": action,
            "justification": justification,
            "soc_percent": soc,
            "pv_surplus_w": surplus,
            "thresholds": {
                "min_soc": thresholds.min_soc,
                "miner_start_soc": thresholds.miner_start_soc,
                "miner_stop_soc": thresholds.miner_stop_soc,
            },
        }))
    }
}

/// `create_energy_plan()`: hour-bucketed plan for the rest of the day.
pub struct CreateEnergyPlanTool {
    db: Arc<dyn DatabaseBackend>,
    min_points: u64,
}

impl CreateEnergyPlanTool {
    pub fn new(db: Arc<dyn DatabaseBackend>, min_points: u64) -> Self {
        Self { db, min_points }
    }
}

#[async_trait]
impl Tool for CreateEnergyPlanTool {
    fn name(&self) -> &'static str {
        "create_energy_plan"
    }

    fn description(&self) -> &'static str {
        "Hour-bucketed plan for the coming day from 24h stats, current state, and thresholds"
    }

    async fn call(&self, _args: &Value) -> ToolOutcome {
        let current = match load_current(&self.db).await {
            Ok(record) => record,
            Err(reason) => return ToolOutcome::failed(reason),
        };
        let thresholds = match load_thresholds(&self.db).await {
            Ok(t) => t,
            Err(e) => return ToolOutcome::failed(format!("Policy read failed: {e}")),
        };
        let stats = match self
            .db
            .stats(TelemetrySource::Inverter, 24, self.min_points)
            .await
        {
            Ok(stats) => stats,
            Err(e) => return ToolOutcome::failed(format!("Stats query failed: {e}")),
        };

        let soc = current.soc_percent;
        let hour = current.ts.hour();

        let mut lines = vec![format!(
            "Energy plan from {:02}:00 (SOC {soc:.0}%, 24h avg load {:.0} W, 24h peak PV {:.0} W):",
            hour, stats.load_avg_w, stats.pv_max_w
        )];

        let buckets: [(u32, u32, &str); 4] = [
            (6, 10, "Morning ramp"),
            (10, 16, "Solar window"),
            (16, 21, "Evening draw-down"),
            (21, 6, "Overnight"),
        ];

        for (start, end, label) in buckets {
            let action = match label {
                "Morning ramp" => {
                    if soc < thresholds.min_soc {
                        "hold all discretionary loads; battery below minimum".to_string()
                    } else {
                        "run essentials only until production exceeds load".to_string()
                    }
                }
                "Solar window" => {
                    if soc >= thresholds.miner_start_soc {
                        format!(
                            "absorb surplus with miners once SOC holds above {:.0}%",
                            thresholds.miner_start_soc
                        )
                    } else {
                        format!(
                            "charge toward {:.0}% before enabling miners",
                            thresholds.miner_start_soc
                        )
                    }
                }
                "Evening draw-down" => format!(
                    "stop miners by {:.0}% SOC; defer heavy loads to tomorrow's window",
                    thresholds.miner_stop_soc
                ),
                _ => format!(
                    "essentials only; alarm if SOC approaches {:.0}%",
                    thresholds.min_soc
                ),
            };
            lines.push(format!("{start:02}:00-{end:02}:00 {label}: {action}"));
        }

        if stats.low_confidence {
            lines.push(
                "Note: under 24h of dense telemetry; plan is based on thin data.".to_string(),
            );
        }

        ToolOutcome::ok(json!({
            "plan": lines.join("\n"),
            "soc_percent": soc,
            "low_confidence": stats.low_confidence,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::SourceMime;

    fn policy_doc(content: &str) -> Document {
        Document {
            id: 1,
            external_id: "pol".into(),
            title: "Battery Policy".into(),
            folder_path: "context/system".into(),
            mime: SourceMime::GoogleDoc,
            content: content.into(),
            token_count: 10,
            is_context_file: true,
            context_category: Some("system".into()),
            last_synced: Utc::now(),
        }
    }

    #[test]
    fn thresholds_parse_from_policy_text() {
        let docs = vec![policy_doc(
            "Minimum battery SOC is 40%. Miners may start at 60% and miners must stop at 50%.",
        )];
        let t = PolicyThresholds::from_documents(&docs);
        assert_eq!(t.min_soc, 40.0);
        assert_eq!(t.miner_start_soc, 60.0);
        assert_eq!(t.miner_stop_soc, 50.0);
    }

    #[test]
    fn missing_statements_keep_defaults() {
        let docs = vec![policy_doc("Nothing about thresholds here.")];
        let t = PolicyThresholds::from_documents(&docs);
        assert_eq!(t, PolicyThresholds::default());
    }

    #[test]
    fn out_of_range_values_are_ignored() {
        let docs = vec![policy_doc("Minimum SOC is 400%")];
        let t = PolicyThresholds::from_documents(&docs);
        assert_eq!(t.min_soc, PolicyThresholds::default().min_soc);
    }
}
