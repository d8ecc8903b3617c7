use crate::models::{AbsoluteRange, Position};
use crate::paging::DocumentWindow;

/// Line translation for a renderer that shows the window as a plain
/// line/column grid, numbered from 1 at the window start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridMapper {
    window_start: usize,
    line_count: usize,
}

impl GridMapper {
    pub fn new(window_start: usize, line_count: usize) -> Self {
        Self {
            window_start: window_start.max(1),
            line_count,
        }
    }

    pub fn for_window(window: &DocumentWindow) -> Self {
        Self::new(window.start_line(), window.line_count())
    }

    pub fn window_start(&self) -> usize {
        self.window_start
    }

    pub fn window_end(&self) -> usize {
        self.window_start + self.line_count.max(1) - 1
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// `line - windowStart + 1`, clamped to `[1, lineCount]`.
    pub fn absolute_to_local(&self, line: usize) -> usize {
        let local = (line + 1).saturating_sub(self.window_start);
        local.clamp(1, self.line_count.max(1))
    }

    /// `line + windowStart - 1`, with `line` clamped to `[1, lineCount]`.
    pub fn local_to_absolute(&self, line: usize) -> usize {
        line.clamp(1, self.line_count.max(1)) + self.window_start - 1
    }

    pub fn position_to_absolute(&self, local: Position) -> Position {
        Position::new(self.local_to_absolute(local.line), local.column)
    }

    /// Whether any line of `range` is materialized.
    pub fn overlaps(&self, range: &AbsoluteRange) -> bool {
        self.line_count > 0 && range.overlaps_lines(self.window_start, self.window_end())
    }
}
