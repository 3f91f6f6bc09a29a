mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use sunstead::tools::{build_registry, ToolOutcome};

async fn seed_policy(db: &std::sync::Arc<dyn sunstead::db::DatabaseBackend>) {
    common::seed_document(
        db,
        "policy",
        "Battery Policy",
        "context/system",
        "Minimum battery SOC is 40%. Miners may start at 60% and miners must stop at 50%.",
        Some("system"),
    )
    .await;
}

#[tokio::test]
async fn current_status_reports_the_latest_reading() {
    let (db, _guard) = common::test_backend().await;
    let (_embed, embeddings) = common::mock_embeddings().await;
    common::seed_inverter_record(&db, 1, 27.0, -250.0, 1400.0, 800.0).await;

    let registry = build_registry(db, embeddings, 100);
    let outcome = registry.call("current_status", &json!({})).await;

    let ToolOutcome::Ok(value) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(value["soc_percent"], 27.0);
    assert_eq!(value["pv_power_w"], 1400.0);
    assert_eq!(value["load_power_w"], 800.0);
    assert!(value["ts"].as_str().is_some());
}

#[tokio::test]
async fn current_status_without_telemetry_is_a_failed_outcome() {
    let (db, _guard) = common::test_backend().await;
    let (_embed, embeddings) = common::mock_embeddings().await;

    let registry = build_registry(db, embeddings, 100);
    let outcome = registry.call("current_status", &json!({})).await;

    assert!(!outcome.is_ok());
    assert!(outcome.render().contains("No telemetry"));
}

#[tokio::test]
async fn detailed_status_carries_flow_flags() {
    let (db, _guard) = common::test_backend().await;
    let (_embed, embeddings) = common::mock_embeddings().await;
    common::seed_inverter_record(&db, 1, 27.0, -250.0, 1400.0, 800.0).await;

    let registry = build_registry(db, embeddings, 100);
    let outcome = registry.call("detailed_status", &json!({})).await;

    let ToolOutcome::Ok(value) = outcome else {
        panic!("expected success");
    };
    assert_eq!(value["flags"]["discharging"], true);
    assert_eq!(value["flags"]["charging"], false);
    assert_eq!(value["battery_voltage"], 52.1);
}

#[tokio::test]
async fn historical_stats_flags_thin_data_and_clamps_hours() {
    let (db, _guard) = common::test_backend().await;
    let (_embed, embeddings) = common::mock_embeddings().await;
    common::seed_inverter_record(&db, 30, 50.0, 0.0, 900.0, 400.0).await;

    let registry = build_registry(db, embeddings, 100);

    let outcome = registry.call("historical_stats", &json!({"hours": 9999})).await;
    let ToolOutcome::Ok(value) = outcome else {
        panic!("expected success");
    };
    assert_eq!(value["window_hours"], 168, "hours clamp to one week");
    assert_eq!(value["low_confidence"], true);
    assert_eq!(value["count"], 1);
}

#[tokio::test]
async fn time_series_points_ascend() {
    let (db, _guard) = common::test_backend().await;
    let (_embed, embeddings) = common::mock_embeddings().await;
    common::seed_inverter_record(&db, 30, 40.0, 0.0, 500.0, 300.0).await;
    common::seed_inverter_record(&db, 20, 45.0, 0.0, 700.0, 300.0).await;
    common::seed_inverter_record(&db, 10, 50.0, 0.0, 900.0, 300.0).await;

    let registry = build_registry(db, embeddings, 100);
    let outcome = registry.call("time_series", &json!({"hours": 1, "limit": 10})).await;

    let ToolOutcome::Ok(value) = outcome else {
        panic!("expected success");
    };
    let points = value["points"].as_array().unwrap();
    assert_eq!(points.len(), 3);
    let timestamps: Vec<&str> = points.iter().map(|p| p["ts"].as_str().unwrap()).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn coordinate_miners_denies_below_minimum_soc() {
    let (db, _guard) = common::test_backend().await;
    let (_embed, embeddings) = common::mock_embeddings().await;
    seed_policy(&db).await;
    common::seed_inverter_record(&db, 1, 27.0, -250.0, 1400.0, 800.0).await;

    let registry = build_registry(db, embeddings, 100);
    let outcome = registry.call("coordinate_miners", &json!({})).await;

    let ToolOutcome::Ok(value) = outcome else {
        panic!("expected success");
    };
    assert_eq!(value["action"], "off");
    let justification = value["justification"].as_str().unwrap();
    assert!(justification.contains("27"));
    assert!(justification.contains("40"), "cites the policy threshold");
}

#[tokio::test]
async fn coordinate_miners_enables_on_surplus_above_start_threshold() {
    let (db, _guard) = common::test_backend().await;
    let (_embed, embeddings) = common::mock_embeddings().await;
    seed_policy(&db).await;
    common::seed_inverter_record(&db, 1, 72.0, 600.0, 3200.0, 900.0).await;

    let registry = build_registry(db, embeddings, 100);
    let outcome = registry.call("coordinate_miners", &json!({})).await;

    let ToolOutcome::Ok(value) = outcome else {
        panic!("expected success");
    };
    assert_eq!(value["action"], "on");
}

#[tokio::test]
async fn optimize_battery_protects_the_floor() {
    let (db, _guard) = common::test_backend().await;
    let (_embed, embeddings) = common::mock_embeddings().await;
    seed_policy(&db).await;
    common::seed_inverter_record(&db, 1, 27.0, -250.0, 400.0, 900.0).await;

    let registry = build_registry(db, embeddings, 100);
    let outcome = registry.call("optimize_battery", &json!({})).await;

    let ToolOutcome::Ok(value) = outcome else {
        panic!("expected success");
    };
    let recommendation = value["recommendation"].as_str().unwrap();
    assert!(recommendation.contains("below the 40% minimum"));
}

#[tokio::test]
async fn create_energy_plan_is_hour_bucketed() {
    let (db, _guard) = common::test_backend().await;
    let (_embed, embeddings) = common::mock_embeddings().await;
    seed_policy(&db).await;
    common::seed_inverter_record(&db, 1, 55.0, 100.0, 1800.0, 700.0).await;

    let registry = build_registry(db, embeddings, 1);
    let outcome = registry.call("create_energy_plan", &json!({})).await;

    let ToolOutcome::Ok(value) = outcome else {
        panic!("expected success");
    };
    let plan = value["plan"].as_str().unwrap();
    assert!(plan.contains("Solar window"));
    assert!(plan.contains("Overnight"));
    assert!(plan.contains("06:00"), "buckets are hour-labelled");
}

#[tokio::test]
async fn kb_search_requires_a_query_argument() {
    let (db, _guard) = common::test_backend().await;
    let (_embed, embeddings) = common::mock_embeddings().await;

    let registry = build_registry(db, embeddings, 100);
    let outcome = registry.call("kb_search", &json!({})).await;

    assert!(!outcome.is_ok());
    assert!(outcome.render().contains("query"));
}

#[tokio::test]
async fn kb_search_returns_citation_tuples() {
    let (db, _guard) = common::test_backend().await;
    let (_embed, embeddings) = common::mock_embeddings().await;
    seed_policy(&db).await;

    let registry = build_registry(db, embeddings, 100);
    let outcome = registry
        .call("kb_search", &json!({"query": "minimum battery SOC"}))
        .await;

    let ToolOutcome::Ok(value) = outcome else {
        panic!("expected success");
    };
    let results = value["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["citation"], "(Battery Policy, context/system)");
}
