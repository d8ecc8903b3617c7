pub mod annotation;
pub mod chunk;
pub mod document_file;
pub mod geometry;
pub mod position;

pub use annotation::{Annotation, AnnotationId, AnnotationUpdate, Mark, NewAnnotation};
pub use chunk::{FileChunk, FullFile, guess_language};
pub use document_file::DocumentFile;
pub use geometry::{Point, Rect, Size};
pub use position::{AbsoluteRange, Position, SourceRange};
