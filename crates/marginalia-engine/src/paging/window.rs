use std::borrow::Cow;
use std::fmt;

use relative_path::{RelativePath, RelativePathBuf};
use xi_rope::Rope;
use xi_rope::delta::Builder;

use crate::error::EngineError;
use crate::models::FileChunk;

/// The contiguous span of a document currently materialized in memory.
///
/// Lines are separated by exactly one `\n` and the content has no trailing
/// line break, so the line count is always
/// `end_line - start_line + 1`. An empty window has `end_line = start_line - 1`.
#[derive(Clone)]
pub struct DocumentWindow {
    path: RelativePathBuf,
    language: String,
    start_line: usize,
    end_line: usize,
    total_lines: usize,
    content: Rope,
}

impl DocumentWindow {
    pub fn from_chunk(chunk: FileChunk) -> Self {
        let start_line = chunk.start_line.max(1);
        let lines: Vec<&str> = if chunk.is_empty() {
            Vec::new()
        } else {
            split_lines(&chunk.content).take(chunk.line_count()).collect()
        };
        let end_line = start_line + lines.len() - 1;
        let content = Rope::from(lines.join("\n"));
        Self {
            path: chunk.path,
            language: chunk.language,
            start_line,
            end_line,
            total_lines: chunk.total_lines.max(end_line),
            content,
        }
    }

    pub fn path(&self) -> &RelativePath {
        &self.path
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn start_line(&self) -> usize {
        self.start_line
    }

    pub fn end_line(&self) -> usize {
        self.end_line
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn line_count(&self) -> usize {
        (self.end_line + 1).saturating_sub(self.start_line)
    }

    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }

    pub fn at_start(&self) -> bool {
        self.start_line <= 1
    }

    pub fn at_end(&self) -> bool {
        self.end_line >= self.total_lines
    }

    pub fn contains_line(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }

    /// Whole window content.
    pub fn text(&self) -> String {
        self.content.to_string()
    }

    /// Text of absolute line `line`, without its line break.
    pub fn line(&self, line: usize) -> Option<Cow<'_, str>> {
        if !self.contains_line(line) {
            return None;
        }
        let local = line - self.start_line;
        let start = self.content.offset_of_line(local);
        let end = if local + 1 < self.line_count() {
            self.content.offset_of_line(local + 1) - 1
        } else {
            self.content.len()
        };
        Some(self.content.slice_to_cow(start..end))
    }

    /// One past the last character column of `line` (`chars + 1`).
    pub fn line_max_column(&self, line: usize) -> Option<usize> {
        self.line(line).map(|text| text.chars().count() + 1)
    }

    /// Extend the end of the window with a chunk that starts at or before
    /// `end_line + 1`. Lines already materialized are dropped from the chunk.
    /// Returns how many lines were added. A rejected chunk leaves the window
    /// untouched.
    pub fn append_forward(&mut self, chunk: &FileChunk) -> Result<usize, EngineError> {
        let extends = !chunk.is_empty() && chunk.end_line > self.end_line;
        if extends && chunk.start_line > self.end_line + 1 {
            return Err(EngineError::InvalidRange(format!(
                "forward chunk {}..={} leaves a gap after line {}",
                chunk.start_line, chunk.end_line, self.end_line
            )));
        }
        let added = if extends { self.extend_end(chunk) } else { 0 };
        self.refresh_total(chunk);
        Ok(added)
    }

    fn extend_end(&mut self, chunk: &FileChunk) -> usize {
        let skip = (self.end_line + 1).saturating_sub(chunk.start_line);
        let wanted = chunk.line_count() - skip;
        let fresh: Vec<&str> = split_lines(&chunk.content)
            .skip(skip)
            .take(wanted)
            .collect();
        if fresh.is_empty() {
            return 0;
        }

        let mut text = String::new();
        if !self.is_empty() {
            text.push('\n');
        }
        text.push_str(&fresh.join("\n"));
        self.splice(self.content.len(), &text);
        self.end_line += fresh.len();
        fresh.len()
    }

    /// Extend the start of the window with a chunk that ends at or after
    /// `start_line - 1`. Returns how many lines were added. A rejected chunk
    /// leaves the window untouched.
    pub fn append_backward(&mut self, chunk: &FileChunk) -> Result<usize, EngineError> {
        let extends = !chunk.is_empty() && chunk.start_line < self.start_line;
        if extends && chunk.end_line + 1 < self.start_line {
            return Err(EngineError::InvalidRange(format!(
                "backward chunk {}..={} leaves a gap before line {}",
                chunk.start_line, chunk.end_line, self.start_line
            )));
        }
        let added = if extends { self.extend_start(chunk) } else { 0 };
        self.refresh_total(chunk);
        Ok(added)
    }

    fn extend_start(&mut self, chunk: &FileChunk) -> usize {
        let keep = self.start_line - chunk.start_line;
        let fresh: Vec<&str> = split_lines(&chunk.content).take(keep).collect();
        if fresh.is_empty() {
            return 0;
        }

        let mut text = fresh.join("\n");
        if !self.is_empty() {
            text.push('\n');
        }
        self.splice(0, &text);
        self.start_line -= fresh.len();
        fresh.len()
    }

    /// Never report fewer lines than the window already holds.
    fn refresh_total(&mut self, chunk: &FileChunk) {
        if chunk.total_lines < self.end_line {
            log::warn!(
                "{} reports {} lines but {} are loaded",
                self.path,
                chunk.total_lines,
                self.end_line
            );
        }
        self.total_lines = chunk.total_lines.max(self.end_line);
    }

    fn splice(&mut self, at: usize, text: &str) {
        let mut builder = Builder::new(self.content.len());
        builder.replace(at..at, Rope::from(text));
        self.content = builder.build().apply(&self.content);
    }
}

impl fmt::Debug for DocumentWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentWindow")
            .field("path", &self.path)
            .field("start_line", &self.start_line)
            .field("end_line", &self.end_line)
            .field("total_lines", &self.total_lines)
            .field("bytes", &self.content.len())
            .finish()
    }
}

fn split_lines(content: &str) -> impl Iterator<Item = &str> {
    content.split('\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunk(start: usize, end: usize, total: usize) -> FileChunk {
        let content = (start..=end)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        FileChunk {
            path: "doc.txt".into(),
            language: "plaintext".into(),
            size: 0,
            total_lines: total,
            start_line: start,
            end_line: end,
            content,
            truncated: false,
        }
    }

    #[test]
    fn from_chunk_sets_span() {
        let w = DocumentWindow::from_chunk(chunk(100, 199, 500));
        assert_eq!(w.start_line(), 100);
        assert_eq!(w.end_line(), 199);
        assert_eq!(w.line_count(), 100);
        assert_eq!(w.line(100).as_deref(), Some("line 100"));
        assert_eq!(w.line(199).as_deref(), Some("line 199"));
        assert_eq!(w.line(200), None);
    }

    #[test]
    fn backward_append_prepends_with_separator() {
        // Given a window of lines 100..=199 out of 500
        let mut w = DocumentWindow::from_chunk(chunk(100, 199, 500));

        // When the previous page 1..=100 arrives (overlapping line 100)
        let added = w.append_backward(&chunk(1, 100, 500)).unwrap();

        // Then only the missing lines are prepended
        assert_eq!(added, 99);
        assert_eq!(w.start_line(), 1);
        assert_eq!(w.end_line(), 199);
        assert_eq!(w.total_lines(), 500);
        assert_eq!(w.line(1).as_deref(), Some("line 1"));
        assert_eq!(w.line(99).as_deref(), Some("line 99"));
        assert_eq!(w.line(100).as_deref(), Some("line 100"));
        assert_eq!(w.text().lines().count(), w.line_count());
    }

    #[test]
    fn forward_append_trims_overlap() {
        let mut w = DocumentWindow::from_chunk(chunk(1, 10, 30));
        let added = w.append_forward(&chunk(8, 20, 30)).unwrap();
        assert_eq!(added, 10);
        assert_eq!(w.end_line(), 20);
        assert_eq!(w.line(11).as_deref(), Some("line 11"));
        assert_eq!(w.text().split('\n').count(), 20);
    }

    #[test]
    fn forward_gap_is_rejected() {
        let mut w = DocumentWindow::from_chunk(chunk(1, 10, 30));
        assert!(w.append_forward(&chunk(12, 20, 30)).is_err());
        assert_eq!(w.end_line(), 10);
    }

    #[test]
    fn rejected_chunk_leaves_total_untouched() {
        // Given a window of lines 1..=10 out of 30
        let mut w = DocumentWindow::from_chunk(chunk(1, 10, 30));

        // When chunks that leave a gap arrive in either direction
        assert!(w.append_forward(&chunk(12, 20, 99)).is_err());
        let mut later = DocumentWindow::from_chunk(chunk(50, 60, 99));
        assert!(later.append_backward(&chunk(1, 10, 40)).is_err());

        // Then neither window changes
        assert_eq!((w.start_line(), w.end_line(), w.total_lines()), (1, 10, 30));
        assert_eq!(
            (later.start_line(), later.end_line(), later.total_lines()),
            (50, 60, 99)
        );
    }

    #[test]
    fn total_never_drops_below_loaded_lines() {
        let mut w = DocumentWindow::from_chunk(chunk(1, 10, 30));

        // An empty chunk claiming the file shrank to 5 lines
        w.append_forward(&chunk(11, 10, 5)).unwrap();
        assert_eq!(w.end_line(), 10);
        assert_eq!(w.total_lines(), 10);
        assert!(w.at_end());

        w.append_backward(&chunk(1, 3, 2)).unwrap();
        assert!(w.end_line() <= w.total_lines());
    }

    #[test]
    fn append_into_empty_window_has_no_leading_separator() {
        let mut w = DocumentWindow::from_chunk(chunk(1, 0, 0));
        assert!(w.is_empty());
        let added = w.append_forward(&chunk(1, 3, 3)).unwrap();
        assert_eq!(added, 3);
        assert_eq!(w.text(), "line 1\nline 2\nline 3");
    }

    #[test]
    fn total_lines_refreshes_from_every_chunk() {
        let mut w = DocumentWindow::from_chunk(chunk(1, 10, 30));
        w.append_forward(&chunk(5, 10, 45)).unwrap();
        assert_eq!(w.total_lines(), 45);
        assert!(!w.at_end());
    }

    #[test]
    fn empty_lines_are_preserved() {
        let mut c = chunk(1, 3, 3);
        c.content = "a\n\nc".into();
        let w = DocumentWindow::from_chunk(c);
        assert_eq!(w.line(2).as_deref(), Some(""));
        assert_eq!(w.line_max_column(2), Some(1));
        assert_eq!(w.line_max_column(3), Some(2));
    }
}
