mod context;
mod conversation;
mod document;
mod search;
mod telemetry;

pub use context::{BundleSection, ContextBundle, QueryType};
pub use conversation::{Message, MessageRole, NewMessage, Session, SessionSummary};
pub use document::{
    Chunk, Document, DocumentFilter, DocumentSummary, NewChunk, NewDocument, SourceMime, SyncKind,
    SyncRun, SyncStatus,
};
pub use search::KbSearchHit;
pub use telemetry::{EnergyRecord, EnergyStats, FlowFlags, TelemetrySource};
