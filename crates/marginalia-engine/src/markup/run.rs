use crate::models::{AbsoluteRange, AnnotationId, SourceRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Visible document text.
    Text,
    /// Structural output (block breaks, list bullets, rules) with no source
    /// text of its own.
    Boundary,
}

/// Inline presentation carried through from the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStyle {
    pub emphasis: bool,
    pub strong: bool,
    pub code: bool,
    /// Heading level 1-6, 0 outside headings.
    pub heading: u8,
}

/// One piece of rendered markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    /// Where `text` starts and ends in the document, when the renderer could
    /// map it character for character.
    pub source: Option<SourceRange>,
    pub kind: RunKind,
    pub style: RunStyle,
    /// Index of the block this run belongs to.
    pub block: usize,
    /// Annotations covering the whole run.
    pub marks: Vec<AnnotationId>,
}

impl Run {
    pub fn text(text: impl Into<String>, source: Option<SourceRange>) -> Self {
        Self {
            text: text.into(),
            source,
            kind: RunKind::Text,
            style: RunStyle::default(),
            block: 0,
            marks: Vec::new(),
        }
    }

    pub fn boundary(text: impl Into<String>, block: usize) -> Self {
        Self {
            text: text.into(),
            source: None,
            kind: RunKind::Boundary,
            style: RunStyle::default(),
            block,
            marks: Vec::new(),
        }
    }

    /// A text run that knows its source span, and so can be split.
    pub fn is_text_wrapper(&self) -> bool {
        self.kind == RunKind::Text && self.source.is_some()
    }

    pub fn source_range(&self) -> Option<AbsoluteRange> {
        self.source.map(AbsoluteRange::from)
    }

    pub fn is_marked(&self) -> bool {
        !self.marks.is_empty()
    }
}
