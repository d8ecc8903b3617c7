use relative_path::{RelativePath, RelativePathBuf};
use serde::{Deserialize, Serialize};

/// A contiguous run of lines fetched from a document.
///
/// `end_line < start_line` only for an empty file (`start_line = 1`,
/// `end_line = 0`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChunk {
    pub path: RelativePathBuf,
    pub language: String,
    pub size: u64,
    pub total_lines: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub truncated: bool,
}

impl FileChunk {
    pub fn line_count(&self) -> usize {
        (self.end_line + 1).saturating_sub(self.start_line)
    }

    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }
}

/// A whole-file read, used by the markup preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullFile {
    pub path: RelativePathBuf,
    pub language: String,
    pub size: u64,
    pub content: String,
    /// Hex SHA-256 of `content`.
    pub digest: String,
}

/// Language label from the file extension.
pub fn guess_language(path: &RelativePath) -> &'static str {
    match path.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("rs") => "rust",
        Some("ts" | "tsx") => "typescript",
        Some("js" | "jsx") => "javascript",
        Some("json") => "json",
        Some("md" | "markdown") => "markdown",
        Some("css") => "css",
        Some("html" | "htm") => "html",
        Some("toml") => "toml",
        _ => "plaintext",
    }
}
