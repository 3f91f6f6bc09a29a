use std::sync::Arc;

use crate::agents::{KbDirect, Reasoner, UrlExtractTool, WebSearchTool};
use crate::cache::BundleCache;
use crate::config::Config;
use crate::context::ContextManager;
use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::llm::LlmProvider;
use crate::routing::Manager;
use crate::sync::{DriveClient, SyncPipeline};
use crate::telemetry::BatteryMonitorClient;
use crate::tools;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub embeddings: EmbeddingProvider,
    pub cache: BundleCache,
    pub manager: Arc<Manager>,
    pub pipeline: Arc<SyncPipeline>,
    /// Kept for quota reporting on the monitoring endpoint.
    pub battery_monitor: Option<Arc<BatteryMonitorClient>>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        embeddings: EmbeddingProvider,
        llm: LlmProvider,
        cache: BundleCache,
        drive: DriveClient,
        battery_monitor: Option<Arc<BatteryMonitorClient>>,
    ) -> Self {
        let config = Arc::new(config);

        let mut registry = tools::build_registry(
            db.clone(),
            embeddings.clone(),
            config.telemetry.min_points_for_analytics,
        );

        // The research agent's external collaborators register as ordinary
        // tools when configured.
        if let Some(research_config) = &config.research {
            match WebSearchTool::new(research_config.clone()) {
                Ok(tool) => registry.register(Arc::new(tool)),
                Err(e) => tracing::warn!(error = %e, "Web search tool unavailable"),
            }
            match UrlExtractTool::new(research_config.clone()) {
                Ok(tool) => registry.register(Arc::new(tool)),
                Err(e) => tracing::warn!(error = %e, "URL extract tool unavailable"),
            }
        }

        let context = ContextManager::new(
            db.clone(),
            embeddings.clone(),
            cache.clone(),
            config.context.clone(),
        );
        let reasoner = Reasoner::new(llm);
        let kb_direct = KbDirect::new(db.clone(), embeddings.clone());

        let manager = Arc::new(Manager::new(
            db.clone(),
            context,
            reasoner,
            kb_direct,
            registry,
            config.agents.clone(),
        ));

        let pipeline = Arc::new(SyncPipeline::new(
            db.clone(),
            embeddings.clone(),
            drive,
            config.drive.chunk_tokens,
            config.drive.max_document_tokens,
        ));

        Self {
            config,
            db,
            embeddings,
            cache,
            manager,
            pipeline,
            battery_monitor,
        }
    }
}
