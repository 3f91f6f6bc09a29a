mod history;
mod kb;
mod planning;
mod registry;
mod status;

pub use history::{HistoricalStatsTool, TimeSeriesTool};
pub use kb::KbSearchTool;
pub use planning::{
    CoordinateMinersTool, CreateEnergyPlanTool, OptimizeBatteryTool, PolicyThresholds,
};
pub use registry::{Tool, ToolOutcome, ToolRegistry};
pub use status::{CurrentStatusTool, DetailedStatusTool};

use std::sync::Arc;

use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;

/// Build the full tool registry. Agents are constructed with a named subset.
pub fn build_registry(
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
    min_points_for_analytics: u64,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CurrentStatusTool::new(db.clone())));
    registry.register(Arc::new(DetailedStatusTool::new(db.clone())));
    registry.register(Arc::new(HistoricalStatsTool::new(
        db.clone(),
        min_points_for_analytics,
    )));
    registry.register(Arc::new(TimeSeriesTool::new(db.clone())));
    registry.register(Arc::new(KbSearchTool::new(db.clone(), embeddings)));
    registry.register(Arc::new(OptimizeBatteryTool::new(db.clone())));
    registry.register(Arc::new(CoordinateMinersTool::new(db.clone())));
    registry.register(Arc::new(CreateEnergyPlanTool::new(
        db,
        min_points_for_analytics,
    )));
    registry
}
