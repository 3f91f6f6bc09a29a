mod chunks;
mod conversations;
mod documents;
mod health;
mod sync_log;
mod telemetry;

pub use chunks::ChunkRepository;
pub use conversations::ConversationRepository;
pub use documents::DocumentRepository;
pub use health::HealthRepository;
pub use sync_log::SyncLogRepository;
pub use telemetry::TelemetryRepository;

use chrono::{DateTime, Utc};

use crate::error::{Result, SunsteadError};

/// Parse an RFC 3339 timestamp stored as TEXT.
pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SunsteadError::Internal(format!("Invalid stored timestamp '{raw}': {e}")))
}
