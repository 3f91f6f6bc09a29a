use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sunstead API",
        description = "Query routing and context assembly for an off-grid solar ranch."
    ),
    paths(
        super::handlers::ask::ask,
        super::handlers::kb::sync,
        super::handlers::kb::sync_status,
        super::handlers::kb::preview,
        super::handlers::kb::search,
        super::handlers::kb::documents,
        super::handlers::energy::latest,
        super::handlers::energy::stats,
        super::handlers::conversations::list,
        super::handlers::conversations::get,
        super::handlers::health::health,
        super::handlers::health::monitoring_status,
    ),
    tags(
        (name = "query", description = "Natural-language query routing"),
        (name = "kb", description = "Knowledge base sync and search"),
        (name = "energy", description = "Telemetry reads"),
        (name = "conversations", description = "Session history"),
        (name = "health", description = "Liveness and monitoring"),
    )
)]
struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
