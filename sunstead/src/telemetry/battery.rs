use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Result, SunsteadError};
use crate::models::{EnergyRecord, TelemetrySource};
use crate::quota::{HourlyQuota, QuotaUsage};

use super::poller::TelemetryFetcher;

/// JSON shape of the cloud battery-monitor API.
#[derive(Debug, Deserialize)]
struct ShuntReading {
    soc: f64,
    /// Signed watts at the shunt: + charging, − discharging.
    power: f64,
    voltage: Option<f64>,
    timestamp: Option<String>,
}

/// Client for the hosted battery monitor. The API carries an hourly quota;
/// the poller skips cycles once the quota is spent rather than burning the
/// remaining budget on retries.
#[derive(Clone)]
pub struct BatteryMonitorClient {
    client: Client,
    url: String,
    api_key: Option<String>,
    quota: Arc<HourlyQuota>,
}

impl BatteryMonitorClient {
    pub fn new(
        url: String,
        api_key: Option<String>,
        hourly_quota: u32,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                SunsteadError::Internal(format!("Failed to create battery monitor client: {e}"))
            })?;

        Ok(Self {
            client,
            url,
            api_key,
            quota: Arc::new(HourlyQuota::new("battery_monitor", hourly_quota)),
        })
    }

    pub fn quota_usage(&self) -> QuotaUsage {
        self.quota.usage()
    }
}

#[async_trait]
impl TelemetryFetcher for BatteryMonitorClient {
    fn source(&self) -> TelemetrySource {
        TelemetrySource::BatteryMonitor
    }

    async fn fetch(&self) -> Result<EnergyRecord> {
        if !self.quota.try_acquire() {
            return Err(SunsteadError::ApiRateLimit { retry_after: None });
        }

        let mut request = self.client.get(&self.url);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(SunsteadError::ApiRateLimit { retry_after });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(SunsteadError::ApiAuth(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SunsteadError::Upstream {
                service: "battery_monitor".to_string(),
                message: format!("Status {status}: {body}"),
            });
        }

        let reading: ShuntReading = response.json().await.map_err(|e| {
            SunsteadError::Upstream {
                service: "battery_monitor".to_string(),
                message: format!("Invalid reading payload: {e}"),
            }
        })?;

        let ts = reading
            .timestamp
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        // The shunt only sees the battery side; PV, load, and grid are the
        // inverter poller's concern.
        Ok(EnergyRecord::new(
            TelemetrySource::BatteryMonitor,
            ts,
            reading.soc,
            reading.power,
            0.0,
            0.0,
            0.0,
            reading.voltage,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exhausted_quota_short_circuits_without_io() {
        // Quota of zero: the fetch must fail before touching the (dead) URL.
        let client = BatteryMonitorClient::new(
            "http://127.0.0.1:1/metrics".to_string(),
            Some("key".to_string()),
            0,
            1,
        )
        .unwrap();

        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, SunsteadError::ApiRateLimit { .. }));
    }

    #[test]
    fn shunt_reading_deserializes() {
        let raw = r#"{"soc": 63.5, "power": -180.0, "voltage": 51.9}"#;
        let reading: ShuntReading = serde_json::from_str(raw).unwrap();
        assert_eq!(reading.soc, 63.5);
        assert_eq!(reading.power, -180.0);
    }
}
