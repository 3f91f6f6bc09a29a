mod chunker;
mod convert;

pub use chunker::{TextChunk, TextChunker};
pub use convert::convert_to_text;
