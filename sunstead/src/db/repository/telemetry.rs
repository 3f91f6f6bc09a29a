use chrono::{DateTime, Duration, Utc};
use libsql::{params, Connection, Row};

use crate::error::{Result, SunsteadError};
use crate::models::{EnergyRecord, EnergyStats, FlowFlags, TelemetrySource};

use super::parse_ts;

pub struct TelemetryRepository;

impl TelemetryRepository {
    /// Append one record. `INSERT OR IGNORE` on the (source, ts) unique key
    /// makes poller retries idempotent; returns false for a duplicate.
    pub async fn append(conn: &Connection, record: &EnergyRecord) -> Result<bool> {
        let affected = conn
            .execute(
                r#"
                INSERT OR IGNORE INTO energy_telemetry (
                    source, ts, soc_percent, battery_power_w, pv_power_w,
                    load_power_w, grid_power_w, battery_voltage,
                    charging, discharging, exporting, importing
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
                params![
                    record.source.as_str(),
                    record.ts.to_rfc3339(),
                    record.soc_percent,
                    record.battery_power_w,
                    record.pv_power_w,
                    record.load_power_w,
                    record.grid_power_w,
                    record.battery_voltage,
                    record.flags.charging as i64,
                    record.flags.discharging as i64,
                    record.flags.exporting as i64,
                    record.flags.importing as i64,
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    pub async fn latest(
        conn: &Connection,
        source: TelemetrySource,
    ) -> Result<Option<EnergyRecord>> {
        let mut rows = conn
            .query(
                &format!("{SELECT_RECORD} WHERE source = ?1 ORDER BY ts DESC LIMIT 1"),
                params![source.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    /// Aggregates over the half-open window `[now − hours, now)`. An empty
    /// window yields a zeroed block, never an error.
    pub async fn stats(
        conn: &Connection,
        source: TelemetrySource,
        hours: i64,
        min_points: u64,
    ) -> Result<EnergyStats> {
        let since = (Utc::now() - Duration::hours(hours)).to_rfc3339();
        let until = Utc::now().to_rfc3339();

        let mut rows = conn
            .query(
                r#"
                SELECT COUNT(*),
                       AVG(soc_percent), MIN(soc_percent), MAX(soc_percent),
                       AVG(pv_power_w), MAX(pv_power_w),
                       AVG(load_power_w), MAX(load_power_w),
                       AVG(battery_power_w)
                FROM energy_telemetry
                WHERE source = ?1 AND ts >= ?2 AND ts < ?3
                "#,
                params![source.as_str(), since, until],
            )
            .await?;

        let row = rows
            .next()
            .await?
            .ok_or_else(|| SunsteadError::Internal("Aggregate query returned no row".into()))?;

        let count = row.get::<i64>(0)? as u64;
        if count == 0 {
            return Ok(EnergyStats::zeroed(source, hours));
        }

        Ok(EnergyStats {
            source,
            window_hours: hours,
            count,
            soc_avg: row.get::<f64>(1)?,
            soc_min: row.get::<f64>(2)?,
            soc_max: row.get::<f64>(3)?,
            pv_avg_w: row.get::<f64>(4)?,
            pv_max_w: row.get::<f64>(5)?,
            load_avg_w: row.get::<f64>(6)?,
            load_max_w: row.get::<f64>(7)?,
            battery_avg_w: row.get::<f64>(8)?,
            low_confidence: count < min_points,
        })
    }

    /// Newest `limit` records within the window, returned in ascending
    /// timestamp order.
    pub async fn series(
        conn: &Connection,
        source: TelemetrySource,
        hours: i64,
        limit: u32,
    ) -> Result<Vec<EnergyRecord>> {
        let since = (Utc::now() - Duration::hours(hours)).to_rfc3339();
        let until = Utc::now().to_rfc3339();

        let mut rows = conn
            .query(
                &format!(
                    "{SELECT_RECORD} WHERE source = ?1 AND ts >= ?2 AND ts < ?3 \
                     ORDER BY ts DESC LIMIT ?4"
                ),
                params![source.as_str(), since, until, limit],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?);
        }
        records.reverse();
        Ok(records)
    }

    pub async fn count(conn: &Connection, source: TelemetrySource) -> Result<u64> {
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM energy_telemetry WHERE source = ?1",
                params![source.as_str()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }

    pub async fn prune_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM energy_telemetry WHERE ts < ?1",
                params![cutoff.to_rfc3339()],
            )
            .await?;
        Ok(affected)
    }
}

const SELECT_RECORD: &str = r#"
    SELECT source, ts, soc_percent, battery_power_w, pv_power_w,
           load_power_w, grid_power_w, battery_voltage,
           charging, discharging, exporting, importing
    FROM energy_telemetry
"#;

fn row_to_record(row: &Row) -> Result<EnergyRecord> {
    let source_raw = row.get::<String>(0)?;
    let source = TelemetrySource::parse(&source_raw)
        .ok_or_else(|| SunsteadError::Internal(format!("Unknown telemetry source '{source_raw}'")))?;

    Ok(EnergyRecord {
        source,
        ts: parse_ts(&row.get::<String>(1)?)?,
        soc_percent: row.get::<f64>(2)?,
        battery_power_w: row.get::<f64>(3)?,
        pv_power_w: row.get::<f64>(4)?,
        load_power_w: row.get::<f64>(5)?,
        grid_power_w: row.get::<f64>(6)?,
        battery_voltage: row.get::<Option<f64>>(7)?,
        flags: FlowFlags {
            charging: row.get::<i64>(8)? != 0,
            discharging: row.get::<i64>(9)? != 0,
            exporting: row.get::<i64>(10)? != 0,
            importing: row.get::<i64>(11)? != 0,
        },
    })
}
