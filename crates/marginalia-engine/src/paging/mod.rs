pub mod pager;
pub mod source;
pub mod window;

pub use pager::{
    ChunkOutcome, ChunkRequest, ChunkedDocument, Direction, DocumentId, PagingOptions,
    RevealTarget, ScrollMetrics,
};
pub use source::{ChunkSource, FsChunkSource};
pub use window::DocumentWindow;
