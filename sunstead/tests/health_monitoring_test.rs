mod common;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use sunstead::cache::BundleCache;
use sunstead::db::DatabaseBackend;
use sunstead::models::TelemetrySource;
use sunstead::services::{HealthMonitor, RetentionManager};

fn passthrough_cache() -> BundleCache {
    BundleCache::new(&sunstead::config::CacheConfig {
        url: None,
        bundle_ttl_secs: 300,
        probe_interval_secs: 30,
    })
}

#[tokio::test]
async fn health_monitor_persists_per_source_detail() {
    let (db, _guard) = common::test_backend().await;
    common::seed_inverter_record(&db, 5, 61.0, 200.0, 1800.0, 700.0).await;

    let monitor = HealthMonitor::new(db.clone(), passthrough_cache(), 300);
    let snapshot = monitor.run_once().await.unwrap();

    assert!(snapshot.db_ok);
    assert!(!snapshot.cache_ok, "passthrough cache reports disabled");
    assert_eq!(snapshot.sources.len(), 2);

    let inverter = snapshot
        .sources
        .iter()
        .find(|s| s.source == TelemetrySource::Inverter)
        .unwrap();
    assert_eq!(inverter.record_count, 1);
    let age = inverter.last_record_age_secs.unwrap();
    assert!((250..=400).contains(&age), "age should be about five minutes, got {age}");

    let shunt = snapshot
        .sources
        .iter()
        .find(|s| s.source == TelemetrySource::BatteryMonitor)
        .unwrap();
    assert_eq!(shunt.record_count, 0);
    assert!(shunt.last_record_age_secs.is_none(), "empty source has no age");

    // The snapshot is durable and readable back.
    let stored = db.latest_snapshot().await.unwrap().unwrap();
    assert!(stored.db_ok);
    assert_eq!(stored.sources.len(), 2);
}

#[tokio::test]
async fn retention_prunes_telemetry_and_snapshots() {
    let (db, _guard) = common::test_backend().await;

    // One aged record beyond 72h, one fresh.
    common::seed_inverter_record(&db, 60 * 80, 30.0, 0.0, 100.0, 200.0).await;
    common::seed_inverter_record(&db, 5, 65.0, 100.0, 1500.0, 600.0).await;

    // One aged health snapshot beyond 14 days, one fresh.
    let monitor = HealthMonitor::new(db.clone(), passthrough_cache(), 300);
    monitor.run_once().await.unwrap();
    db.record_snapshot(&sunstead::db::traits::HealthSnapshot {
        ts: Utc::now() - Duration::days(20),
        db_ok: true,
        cache_ok: true,
        sources: Vec::new(),
    })
    .await
    .unwrap();

    let retention = RetentionManager::new(db.clone(), 72);
    retention.run_once().await.unwrap();

    assert_eq!(
        db.record_count(TelemetrySource::Inverter).await.unwrap(),
        1,
        "only the fresh record survives"
    );
    let survivor = db
        .latest_record(TelemetrySource::Inverter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(survivor.soc_percent, 65.0);

    let latest = db.latest_snapshot().await.unwrap().unwrap();
    assert!(latest.ts > Utc::now() - Duration::days(1), "aged snapshot pruned");
}

#[tokio::test]
async fn monitoring_endpoint_exposes_snapshot_and_quotas() {
    let (db, _guard) = common::test_backend().await;

    let monitor = HealthMonitor::new(db.clone(), passthrough_cache(), 300);
    monitor.run_once().await.unwrap();

    let (state, _embed, _llm) = common::test_state(db, None).await;
    let addr = common::start_app(state).await;

    let body: serde_json::Value = reqwest::Client::new()
        .get(format!("http://{addr}/health/monitoring/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["snapshot"]["db_ok"], true);
    assert_eq!(body["snapshot"]["sources"].as_array().unwrap().len(), 2);

    let quotas = body["quotas"].as_array().unwrap();
    assert_eq!(quotas[0]["name"], "embeddings");
    assert_eq!(quotas[0]["usage"]["approaching_limit"], false);

    assert!(body["latest_sync"].is_null(), "no sync has run yet");
}
