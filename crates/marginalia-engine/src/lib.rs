pub mod anchor;
pub mod error;
pub mod highlight;
pub mod io;
pub mod mapping;
pub mod markup;
pub mod models;
pub mod paging;
pub mod panel;
pub mod selection;
pub mod session;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use anchor::{AnchorFollower, AnchorMeasure, AnchorReading, AnchorSource, Renderer};
pub use error::EngineError;
pub use highlight::{DecorationSet, apply_marks};
pub use io::{ReadLimits, scan_documents};
pub use markup::{Run, render_markup};
pub use models::*;
pub use paging::{ChunkOutcome, ChunkRequest, ChunkSource, ChunkedDocument, FsChunkSource};
pub use panel::{FrameInput, PanelCoordinator, PanelVisibility};
pub use session::{AnnotationSession, AnnotationStore, EditorState, MemoryStore};
