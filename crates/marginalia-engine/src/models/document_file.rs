use relative_path::{RelativePath, RelativePathBuf};

use super::chunk::guess_language;

/// A viewable document under the root, with a display-friendly name.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFile {
    relative_path: RelativePathBuf,
    display_name: String,
    language: &'static str,
}

impl DocumentFile {
    pub fn new(relative_path: RelativePathBuf) -> Self {
        let display_name = relative_path
            .file_name()
            .unwrap_or("Untitled")
            .to_string();
        let language = guess_language(&relative_path);
        Self {
            relative_path,
            display_name,
            language,
        }
    }

    pub fn relative_path(&self) -> &RelativePath {
        &self.relative_path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn language(&self) -> &'static str {
        self.language
    }

    /// Markdown files can be shown through the flowed markup renderer.
    pub fn renders_as_markup(&self) -> bool {
        self.language == "markdown"
    }
}

impl From<RelativePathBuf> for DocumentFile {
    fn from(path: RelativePathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for DocumentFile {
    fn from(path: &str) -> Self {
        Self::new(RelativePathBuf::from(path))
    }
}
