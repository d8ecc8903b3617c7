use std::collections::HashMap;

use crate::mapping::GridMapper;
use crate::models::{AnnotationId, Mark, Position};
use crate::paging::DocumentWindow;

/// One annotation drawn on the grid, in window-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
    pub id: AnnotationId,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Decoration {
    /// Caret containment, inclusive at both ends.
    pub fn contains(&self, pos: Position) -> bool {
        pos >= Position::new(self.start_line, self.start_column)
            && pos <= Position::new(self.end_line, self.end_column)
    }

    /// Whether the character cell at `pos` is painted. The end column is the
    /// caret after the last character, so its cell is outside, matching
    /// [`Decoration::columns_on`].
    pub fn covers_cell(&self, pos: Position) -> bool {
        self.contains(pos) && pos != Position::new(self.end_line, self.end_column)
    }

    /// Column span `[from, to)` this decoration paints on `line`.
    pub fn columns_on(&self, line: usize, line_max_column: usize) -> Option<(usize, usize)> {
        if line < self.start_line || line > self.end_line {
            return None;
        }
        let from = if line == self.start_line {
            self.start_column
        } else {
            1
        };
        let to = if line == self.end_line {
            self.end_column
        } else {
            line_max_column
        };
        Some((from, to))
    }
}

/// The complete decoration set for a window, indexed by line.
///
/// Always rebuilt from scratch when the annotations or the window change.
#[derive(Debug, Clone, Default)]
pub struct DecorationSet {
    decorations: Vec<Decoration>,
    by_line: HashMap<usize, Vec<usize>>,
}

impl DecorationSet {
    pub fn build(window: &DocumentWindow, marks: &[Mark]) -> Self {
        let mapper = GridMapper::for_window(window);
        Self::build_with(mapper, marks, |local| {
            window
                .line_max_column(mapper.local_to_absolute(local))
                .unwrap_or(1)
        })
    }

    /// Build against any grid; `line_max_column` answers for local lines.
    pub fn build_with(
        mapper: GridMapper,
        marks: &[Mark],
        line_max_column: impl Fn(usize) -> usize,
    ) -> Self {
        let mut set = Self::default();
        for mark in marks {
            if !mapper.overlaps(&mark.range) {
                continue;
            }
            let start_clamped = mark.range.start_line < mapper.window_start();
            let end_clamped = mark.range.end_line > mapper.window_end();
            let start_line = mapper.absolute_to_local(mark.range.start_line);
            let end_line = mapper.absolute_to_local(mark.range.end_line);
            let start_column = match mark.range.start_column {
                Some(col) if !start_clamped => col,
                _ => 1,
            };
            let end_column = match mark.range.end_column {
                Some(col) if !end_clamped => col,
                _ => line_max_column(end_line),
            };
            set.push(Decoration {
                id: mark.id,
                start_line,
                start_column,
                end_line,
                end_column,
            });
        }
        set
    }

    fn push(&mut self, decoration: Decoration) {
        let index = self.decorations.len();
        for line in decoration.start_line..=decoration.end_line {
            self.by_line.entry(line).or_default().push(index);
        }
        self.decorations.push(decoration);
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter()
    }

    /// Decorations touching local `line`.
    pub fn on_line(&self, line: usize) -> impl Iterator<Item = &Decoration> {
        self.by_line
            .get(&line)
            .into_iter()
            .flatten()
            .map(|&i| &self.decorations[i])
    }

    /// The first annotation painted on the cell at local `pos`, if any.
    pub fn hit_test(&self, pos: Position) -> Option<AnnotationId> {
        self.on_line(pos.line)
            .find(|d| d.covers_cell(pos))
            .map(|d| d.id)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Decoration> {
        self.decorations.iter().find(|d| d.id == id)
    }
}
