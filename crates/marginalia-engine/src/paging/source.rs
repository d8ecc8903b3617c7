use std::path::PathBuf;

use async_trait::async_trait;
use relative_path::RelativePath;

use crate::error::EngineError;
use crate::io::{self, ReadLimits};
use crate::models::{FileChunk, FullFile};

/// Where document lines come from.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Fetch up to `max_lines` lines starting at `start_line` (1-based).
    async fn fetch_chunk(
        &self,
        path: &RelativePath,
        start_line: usize,
        max_lines: usize,
    ) -> Result<FileChunk, EngineError>;

    /// Fetch the whole document, subject to the source's byte cap.
    async fn fetch_full(&self, path: &RelativePath) -> Result<FullFile, EngineError>;
}

/// Reads documents from a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsChunkSource {
    root: PathBuf,
    limits: ReadLimits,
}

impl FsChunkSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_limits(root, ReadLimits::default())
    }

    pub fn with_limits(root: impl Into<PathBuf>, limits: ReadLimits) -> Self {
        Self {
            root: root.into(),
            limits,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl ChunkSource for FsChunkSource {
    async fn fetch_chunk(
        &self,
        path: &RelativePath,
        start_line: usize,
        max_lines: usize,
    ) -> Result<FileChunk, EngineError> {
        let root = self.root.clone();
        let limits = self.limits;
        let path = path.to_relative_path_buf();
        tokio::task::spawn_blocking(move || {
            io::read_chunk(&path, &root, start_line, max_lines, &limits)
        })
        .await
        .map_err(|e| EngineError::Io(std::io::Error::other(e)))?
    }

    async fn fetch_full(&self, path: &RelativePath) -> Result<FullFile, EngineError> {
        let root = self.root.clone();
        let limits = self.limits;
        let path = path.to_relative_path_buf();
        tokio::task::spawn_blocking(move || io::read_full(&path, &root, &limits))
            .await
            .map_err(|e| EngineError::Io(std::io::Error::other(e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_file, create_test_root};

    #[tokio::test]
    async fn fetches_chunk_and_full_file() {
        let root = create_test_root();
        create_test_file(&root, "notes.md", "# Title\n\nbody\n");
        let source = FsChunkSource::new(root.path());

        let chunk = source
            .fetch_chunk(RelativePath::new("notes.md"), 1, 2)
            .await
            .unwrap();
        assert_eq!(chunk.content, "# Title\n");
        assert_eq!(chunk.total_lines, 3);

        let full = source.fetch_full(RelativePath::new("notes.md")).await.unwrap();
        assert_eq!(full.content, "# Title\n\nbody\n");
        assert_eq!(full.digest.len(), 64);
    }

    #[tokio::test]
    async fn missing_file_propagates_not_found() {
        let root = create_test_root();
        let source = FsChunkSource::new(root.path());
        let err = source
            .fetch_chunk(RelativePath::new("missing.rs"), 1, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
