use axum::extract::{Query, State};
use axum::Json;

use crate::api::dto::StatsQuery;
use crate::api::AppState;
use crate::error::{Result, SunsteadError};
use crate::models::{EnergyRecord, EnergyStats, TelemetrySource};

/// `GET /energy/latest`
#[utoipa::path(
    get,
    path = "/energy/latest",
    tag = "energy",
    responses(
        (status = 200, description = "Most recent telemetry record", body = EnergyRecord),
        (status = 404, description = "No telemetry recorded yet"),
    )
)]
pub async fn latest(State(state): State<AppState>) -> Result<Json<EnergyRecord>> {
    match state.db.latest_record(TelemetrySource::Inverter).await? {
        Some(record) => Ok(Json(record)),
        None => Err(SunsteadError::NotFound(
            "No telemetry recorded yet".to_string(),
        )),
    }
}

/// `GET /energy/stats?hours=H`
#[utoipa::path(
    get,
    path = "/energy/stats",
    tag = "energy",
    params(StatsQuery),
    responses(
        (status = 200, description = "Aggregates over the window", body = EnergyStats),
    )
)]
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<EnergyStats>> {
    let hours = query.hours.unwrap_or(24).clamp(1, 168);

    let stats = state
        .db
        .stats(
            TelemetrySource::Inverter,
            hours,
            state.config.telemetry.min_points_for_analytics,
        )
        .await?;

    Ok(Json(stats))
}
