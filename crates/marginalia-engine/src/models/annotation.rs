use std::fmt;

use chrono::{DateTime, Utc};
use relative_path::RelativePathBuf;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AbsoluteRange;

/// Stable identity of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(Uuid);

impl AnnotationId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A persisted comment attached to a range of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub file_path: RelativePathBuf,
    #[serde(flatten)]
    pub range: AbsoluteRange,
    pub selected_text: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Annotation {
    /// Materialize a new annotation with a fresh id and timestamps.
    pub fn create(new: NewAnnotation) -> Self {
        let now = Utc::now();
        Self {
            id: AnnotationId::new_v4(),
            file_path: new.file_path,
            range: new.range,
            selected_text: new.selected_text,
            comment: new.comment,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: AnnotationUpdate) {
        if let Some(range) = update.range {
            self.range = range;
        }
        if let Some(text) = update.selected_text {
            self.selected_text = text;
        }
        if let Some(comment) = update.comment {
            self.comment = comment;
        }
        self.updated_at = Utc::now();
    }

    pub fn mark(&self) -> Mark {
        Mark {
            id: self.id,
            range: self.range,
        }
    }
}

/// Payload for creating an annotation from a committed selection.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnnotation {
    pub file_path: RelativePathBuf,
    pub range: AbsoluteRange,
    pub selected_text: String,
    pub comment: String,
}

/// Partial update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationUpdate {
    pub range: Option<AbsoluteRange>,
    pub selected_text: Option<String>,
    pub comment: Option<String>,
}

/// Read-only copy of what the renderers need from an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mark {
    pub id: AnnotationId,
    pub range: AbsoluteRange,
}
