mod kb_direct;
mod reasoner;
mod research;
mod roles;

pub use kb_direct::KbDirect;
pub use reasoner::{Reasoner, ReasonerOutput};
pub use research::{UrlExtractTool, WebSearchTool};
pub use roles::AgentRole;
