mod drive;
mod events;
mod pipeline;

pub use drive::{DriveClient, DriveFile, SyncPreview};
pub use events::SyncEvent;
pub use pipeline::SyncPipeline;
