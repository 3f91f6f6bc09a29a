use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::openapi;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handlers::ask::ask))
        .route("/kb/sync", post(handlers::kb::sync))
        .route("/kb/sync/status", get(handlers::kb::sync_status))
        .route("/kb/preview", post(handlers::kb::preview))
        .route("/kb/search", post(handlers::kb::search))
        .route("/kb/documents", get(handlers::kb::documents))
        .route("/energy/latest", get(handlers::energy::latest))
        .route("/energy/stats", get(handlers::energy::stats))
        .route("/conversations", get(handlers::conversations::list))
        .route("/conversations/{id}", get(handlers::conversations::get))
        .route("/health", get(handlers::health::health))
        .route(
            "/health/monitoring/status",
            get(handlers::health::monitoring_status),
        )
        .route("/openapi.json", get(openapi::openapi_json))
        .merge(openapi::redoc_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
