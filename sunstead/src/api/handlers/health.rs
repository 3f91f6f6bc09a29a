use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::api::dto::{HealthResponse, MonitoringStatusResponse, NamedQuota};
use crate::api::AppState;
use crate::error::Result;

/// `GET /health`
///
/// Live liveness: database reachability and cache state, checked now.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Aggregated liveness", body = HealthResponse),
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_ok = state.db.ping().await.is_ok();
    let cache_enabled = state.cache.is_enabled();

    let status = if db_ok { "ok" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        db_ok,
        cache_enabled,
        ts: Utc::now(),
    })
}

/// `GET /health/monitoring/status`
///
/// The monitor loop's last persisted snapshot plus live quota readouts and
/// the latest sync run.
#[utoipa::path(
    get,
    path = "/health/monitoring/status",
    tag = "health",
    responses(
        (status = 200, description = "Monitoring detail", body = MonitoringStatusResponse),
    )
)]
pub async fn monitoring_status(
    State(state): State<AppState>,
) -> Result<Json<MonitoringStatusResponse>> {
    let snapshot = state.db.latest_snapshot().await?;
    let latest_sync = state.db.latest_sync_run().await?;

    let mut quotas = vec![NamedQuota {
        name: "embeddings".to_string(),
        usage: state.embeddings.quota_usage(),
    }];
    if let Some(battery) = &state.battery_monitor {
        quotas.push(NamedQuota {
            name: "battery_monitor".to_string(),
            usage: battery.quota_usage(),
        });
    }

    Ok(Json(MonitoringStatusResponse {
        snapshot,
        quotas,
        latest_sync,
    }))
}
