use serde::{Deserialize, Serialize};

use crate::models::SyncKind;

/// Progress events emitted by a sync run, in strict order per run. A
/// terminal `completed` or `failed` event is always delivered unless the
/// consumer goes away first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Starting {
        kind: SyncKind,
    },
    Scanning,
    Processing {
        current: u64,
        total: u64,
        current_file: String,
    },
    Completed {
        processed: u64,
        updated: u64,
        failed: u64,
    },
    Failed {
        error: String,
    },
}

impl SyncEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tag() {
        let event = SyncEvent::Processing {
            current: 3,
            total: 12,
            current_file: "context/system/battery-policy".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "processing");
        assert_eq!(json["current"], 3);
        assert_eq!(json["current_file"], "context/system/battery-policy");
    }

    #[test]
    fn terminality() {
        assert!(SyncEvent::Completed {
            processed: 1,
            updated: 1,
            failed: 0
        }
        .is_terminal());
        assert!(SyncEvent::Failed {
            error: "x".into()
        }
        .is_terminal());
        assert!(!SyncEvent::Scanning.is_terminal());
    }
}
