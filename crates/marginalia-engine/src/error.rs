use crate::models::AnnotationId;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Not a text file (binary or not UTF-8): {0}")]
    NonText(String),
    #[error("File too large to read whole: {path} is {size} bytes, limit is {limit}")]
    OverLimit { path: String, size: u64, limit: u64 },
    #[error("Path escapes the document root: {0}")]
    InvalidPath(String),
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    #[error("Unknown annotation: {0}")]
    UnknownAnnotation(AnnotationId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Errors that put the viewer into a permanent "cannot preview" state for
    /// the current document. Nothing retries these.
    pub fn is_preview_blocking(&self) -> bool {
        matches!(
            self,
            EngineError::NonText(_) | EngineError::OverLimit { .. }
        )
    }

    /// Transport-level failures. The pager does not retry them either, but a
    /// later scroll trigger may issue a fresh request.
    pub fn is_transport(&self) -> bool {
        matches!(self, EngineError::Io(_))
    }
}
