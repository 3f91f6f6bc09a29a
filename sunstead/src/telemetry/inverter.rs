use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Result, SunsteadError};
use crate::models::{EnergyRecord, TelemetrySource};

use super::poller::TelemetryFetcher;

/// JSON shape reported by the inverter's local HTTP endpoint.
#[derive(Debug, Deserialize)]
struct InverterReading {
    soc: f64,
    batt_power: f64,
    pv_power: f64,
    load_power: f64,
    #[serde(default)]
    grid_power: f64,
    batt_voltage: Option<f64>,
    /// Device-reported sample time; absent on older firmware.
    timestamp: Option<String>,
}

#[derive(Clone)]
pub struct InverterClient {
    client: Client,
    url: String,
}

impl InverterClient {
    pub fn new(url: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SunsteadError::Internal(format!("Failed to create inverter client: {e}")))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl TelemetryFetcher for InverterClient {
    fn source(&self) -> TelemetrySource {
        TelemetrySource::Inverter
    }

    async fn fetch(&self) -> Result<EnergyRecord> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SunsteadError::Upstream {
                service: "inverter".to_string(),
                message: format!("Status {status}: {body}"),
            });
        }

        let reading: InverterReading = response.json().await.map_err(|e| {
            SunsteadError::Upstream {
                service: "inverter".to_string(),
                message: format!("Invalid reading payload: {e}"),
            }
        })?;

        let ts = reading
            .timestamp
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(EnergyRecord::new(
            TelemetrySource::Inverter,
            ts,
            reading.soc,
            reading.batt_power,
            reading.pv_power,
            reading.load_power,
            reading.grid_power,
            reading.batt_voltage,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_deserializes_without_optional_fields() {
        let raw = r#"{"soc": 27.0, "batt_power": -250.0, "pv_power": 1400.0, "load_power": 900.0}"#;
        let reading: InverterReading = serde_json::from_str(raw).unwrap();
        assert_eq!(reading.soc, 27.0);
        assert_eq!(reading.grid_power, 0.0);
        assert!(reading.batt_voltage.is_none());
        assert!(reading.timestamp.is_none());
    }
}
