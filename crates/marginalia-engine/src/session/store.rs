use std::fs;
use std::path::Path;

use anyhow::Context;
use relative_path::RelativePath;

use crate::error::EngineError;
use crate::models::{Annotation, AnnotationId, AnnotationUpdate, NewAnnotation};

/// Persistence boundary for annotations.
pub trait AnnotationStore {
    fn create(&mut self, new: NewAnnotation) -> Result<Annotation, EngineError>;
    fn update(
        &mut self,
        id: AnnotationId,
        update: AnnotationUpdate,
    ) -> Result<Annotation, EngineError>;
    fn delete(&mut self, id: AnnotationId) -> Result<Annotation, EngineError>;
    fn get(&self, id: AnnotationId) -> Option<&Annotation>;
    /// Annotations on `path`, in creation order.
    fn list_for(&self, path: &RelativePath) -> Vec<&Annotation>;
}

/// In-memory store, optionally backed by a JSON file.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    annotations: Vec<Annotation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn all(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Load from a JSON array. A missing file is an empty store.
    pub fn load_json(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read annotations from {}", path.display()))?;
        let annotations: Vec<Annotation> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse annotations in {}", path.display()))?;
        log::debug!("Loaded {} annotations from {}", annotations.len(), path.display());
        Ok(Self { annotations })
    }

    pub fn save_json(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.annotations)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write annotations to {}", path.display()))?;
        Ok(())
    }

    fn index_of(&self, id: AnnotationId) -> Result<usize, EngineError> {
        self.annotations
            .iter()
            .position(|a| a.id == id)
            .ok_or(EngineError::UnknownAnnotation(id))
    }
}

impl AnnotationStore for MemoryStore {
    fn create(&mut self, new: NewAnnotation) -> Result<Annotation, EngineError> {
        let annotation = Annotation::create(new);
        log::debug!(
            "Created annotation {} on {} at {}",
            annotation.id,
            annotation.file_path,
            annotation.range
        );
        self.annotations.push(annotation.clone());
        Ok(annotation)
    }

    fn update(
        &mut self,
        id: AnnotationId,
        update: AnnotationUpdate,
    ) -> Result<Annotation, EngineError> {
        let index = self.index_of(id)?;
        let annotation = &mut self.annotations[index];
        annotation.apply(update);
        Ok(annotation.clone())
    }

    fn delete(&mut self, id: AnnotationId) -> Result<Annotation, EngineError> {
        let index = self.index_of(id)?;
        Ok(self.annotations.remove(index))
    }

    fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    fn list_for(&self, path: &RelativePath) -> Vec<&Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.file_path.as_relative_path() == path)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AbsoluteRange;
    use pretty_assertions::assert_eq;
    use relative_path::RelativePathBuf;
    use tempfile::TempDir;

    fn new_on(path: &str, line: usize) -> NewAnnotation {
        NewAnnotation {
            file_path: RelativePathBuf::from(path),
            range: AbsoluteRange::lines(line, line).unwrap(),
            selected_text: format!("line {line}"),
            comment: "note".into(),
        }
    }

    #[test]
    fn list_is_scoped_to_file() {
        let mut store = MemoryStore::new();
        store.create(new_on("a.md", 1)).unwrap();
        store.create(new_on("b.md", 2)).unwrap();
        store.create(new_on("a.md", 3)).unwrap();

        let lines: Vec<usize> = store
            .list_for(RelativePath::new("a.md"))
            .iter()
            .map(|a| a.range.start_line)
            .collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut store = MemoryStore::new();
        let id = AnnotationId::new_v4();
        assert!(matches!(
            store.delete(id),
            Err(EngineError::UnknownAnnotation(x)) if x == id
        ));
        assert!(store.update(id, AnnotationUpdate::default()).is_err());
    }

    #[test]
    fn update_and_delete() {
        let mut store = MemoryStore::new();
        let created = store.create(new_on("a.md", 1)).unwrap();
        let updated = store
            .update(
                created.id,
                AnnotationUpdate {
                    comment: Some("changed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.comment, "changed");
        assert_eq!(store.get(created.id).unwrap().comment, "changed");

        store.delete(created.id).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn json_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("annotations.json");

        // Missing file loads as empty
        assert!(MemoryStore::load_json(&path).unwrap().is_empty());

        let mut store = MemoryStore::new();
        store.create(new_on("docs/a.md", 4)).unwrap();
        store.save_json(&path).unwrap();

        let loaded = MemoryStore::load_json(&path).unwrap();
        assert_eq!(loaded.all(), store.all());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annotations.json");
        fs::write(&path, "not json").unwrap();
        assert!(MemoryStore::load_json(&path).is_err());
    }
}
