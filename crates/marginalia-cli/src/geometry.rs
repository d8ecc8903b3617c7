//! Cell geometry for the two document views, answering the anchor
//! measurements the comment panel needs.

use marginalia_engine::highlight::mark_rect;
use marginalia_engine::mapping::{GridMapper, char_slice, intersect};
use marginalia_engine::selection::RunPoint;
use marginalia_engine::{
    AbsoluteRange, AnchorMeasure, AnnotationId, DecorationSet, Point, Rect, Run,
};

/// The part of one run that lands on one terminal row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub run: usize,
    /// Character offset of the segment inside its run.
    pub char_start: usize,
    pub row: usize,
    pub col: usize,
    pub len: usize,
}

/// Flowed runs laid out on unwrapped terminal rows.
#[derive(Debug, Clone, Default)]
pub struct FlowLayout {
    pub runs: Vec<Run>,
    pub segments: Vec<Segment>,
    pub rows: usize,
}

impl FlowLayout {
    pub fn new(runs: Vec<Run>) -> Self {
        let mut segments = Vec::new();
        let (mut row, mut col) = (0, 0);
        for (index, run) in runs.iter().enumerate() {
            let mut char_start = 0;
            for (i, piece) in run.text.split('\n').enumerate() {
                if i > 0 {
                    row += 1;
                    col = 0;
                    char_start += 1;
                }
                let len = piece.chars().count();
                if len > 0 {
                    segments.push(Segment {
                        run: index,
                        char_start,
                        row,
                        col,
                        len,
                    });
                }
                col += len;
                char_start += len;
            }
        }
        let rows = if col > 0 { row + 1 } else { row };
        Self {
            runs,
            segments,
            rows,
        }
    }

    pub fn segments_on(&self, row: usize) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(move |s| s.row == row)
    }

    /// Selection boundary under a content cell. Cells past the end of a row
    /// snap to the end of its last text run.
    pub fn point_at(&self, row: usize, col: usize) -> Option<RunPoint> {
        let mut last = None;
        for seg in self.segments_on(row) {
            if !self.runs[seg.run].is_text_wrapper() {
                continue;
            }
            if col < seg.col + seg.len {
                return Some(RunPoint {
                    run: seg.run,
                    offset: seg.char_start + col.saturating_sub(seg.col),
                });
            }
            last = Some(RunPoint {
                run: seg.run,
                offset: seg.char_start + seg.len,
            });
        }
        last
    }

    /// Annotation painted under a content cell.
    pub fn mark_at(&self, row: usize, col: usize) -> Option<AnnotationId> {
        self.segments_on(row)
            .find(|s| col >= s.col && col < s.col + s.len)
            .and_then(|s| self.runs[s.run].marks.first().copied())
    }

    /// Rendered text between two boundaries, in document order.
    pub fn text_between(&self, a: RunPoint, b: RunPoint) -> String {
        let (start, end) = if (a.run, a.offset) <= (b.run, b.offset) {
            (a, b)
        } else {
            (b, a)
        };
        let mut out = String::new();
        for index in start.run..=end.run.min(self.runs.len().saturating_sub(1)) {
            let text = &self.runs[index].text;
            let from = if index == start.run { start.offset } else { 0 };
            let to = if index == end.run {
                end.offset
            } else {
                text.chars().count()
            };
            out.push_str(char_slice(text, from, to));
        }
        out
    }
}

/// Measures against the flowed view at its current scroll.
pub struct FlowMeasure<'a> {
    pub layout: &'a FlowLayout,
    pub origin: Point,
    pub scroll: usize,
    pub view_rows: usize,
}

impl FlowMeasure<'_> {
    fn visible(&self) -> impl Iterator<Item = (&Run, Rect)> {
        self.layout
            .segments
            .iter()
            .filter(|s| s.row >= self.scroll && s.row < self.scroll + self.view_rows)
            .map(|s| {
                let rect = Rect::new(
                    self.origin.x + s.col as f64,
                    self.origin.y + (s.row - self.scroll) as f64,
                    s.len as f64,
                    1.0,
                );
                (&self.layout.runs[s.run], rect)
            })
    }
}

impl AnchorMeasure for FlowMeasure<'_> {
    fn mark_rect(&self, id: AnnotationId) -> Option<Rect> {
        mark_rect(self.visible(), id, None)
    }

    fn range_rect(&self, range: &AbsoluteRange) -> Option<Rect> {
        self.visible()
            .filter(|(run, _)| {
                run.source_range()
                    .is_some_and(|r| intersect(&r, range).is_some())
            })
            .map(|(_, rect)| rect)
            .reduce(|a, b| a.union(&b))
    }
}

/// Measures against the line grid at its current scroll.
pub struct GridMeasure<'a> {
    pub mapper: GridMapper,
    pub decorations: &'a DecorationSet,
    pub origin: Point,
    pub scroll: usize,
    pub view_rows: usize,
}

impl GridMeasure<'_> {
    /// Zero-width caret before `column` of local `line`, if on screen.
    fn caret(&self, line: usize, column: usize) -> Option<Rect> {
        let row = line.checked_sub(1 + self.scroll)?;
        if row >= self.view_rows {
            return None;
        }
        Some(Rect::new(
            self.origin.x + column.saturating_sub(1) as f64,
            self.origin.y + row as f64,
            0.0,
            1.0,
        ))
    }
}

impl AnchorMeasure for GridMeasure<'_> {
    fn mark_rect(&self, id: AnnotationId) -> Option<Rect> {
        let decoration = self.decorations.get(id)?;
        self.caret(decoration.start_line, decoration.start_column)
    }

    fn range_rect(&self, range: &AbsoluteRange) -> Option<Rect> {
        if !self.mapper.overlaps(range) {
            return None;
        }
        let column = if range.start_line < self.mapper.window_start() {
            1
        } else {
            range.start_column.unwrap_or(1)
        };
        self.caret(self.mapper.absolute_to_local(range.start_line), column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_engine::{Mark, apply_marks, render_markup};
    use pretty_assertions::assert_eq;

    fn layout() -> FlowLayout {
        FlowLayout::new(render_markup("# Title\n\nfunction foo(x) here\n"))
    }

    #[test]
    fn blocks_land_on_their_own_rows() {
        let layout = layout();
        assert_eq!(layout.rows, 2);
        let second: Vec<&Segment> = layout.segments_on(1).collect();
        assert_eq!(second.len(), 1);
        assert_eq!(layout.runs[second[0].run].text, "function foo(x) here");
    }

    #[test]
    fn cells_map_to_run_points_and_text() {
        let layout = layout();
        let a = layout.point_at(1, 4).unwrap();
        let b = layout.point_at(1, 11).unwrap();
        assert_eq!(a.offset, 4);
        assert_eq!(layout.text_between(b, a), "tion fo");

        // Past the end of the row snaps to the run's end
        let end = layout.point_at(1, 80).unwrap();
        assert_eq!(end.offset, 20);
        assert_eq!(layout.point_at(5, 0), None);
    }

    #[test]
    fn mark_at_finds_only_highlighted_cells() {
        // Given "tion fo" highlighted in the paragraph
        let id = AnnotationId::new_v4();
        let runs = apply_marks(
            &render_markup("# Title\n\nfunction foo(x) here\n"),
            &[Mark {
                id,
                range: AbsoluteRange::new(3, Some(5), 3, Some(12)).unwrap(),
            }],
        );
        let layout = FlowLayout::new(runs);

        // Then its first and last cells hit, the neighbours do not
        assert_eq!(layout.mark_at(1, 4), Some(id));
        assert_eq!(layout.mark_at(1, 10), Some(id));
        assert_eq!(layout.mark_at(1, 3), None);
        assert_eq!(layout.mark_at(1, 11), None);
        assert_eq!(layout.mark_at(0, 4), None);
    }

    #[test]
    fn flow_measure_finds_visible_ranges_only() {
        let layout = layout();
        let measure = FlowMeasure {
            layout: &layout,
            origin: Point::new(10.0, 2.0),
            scroll: 0,
            view_rows: 10,
        };
        let range = AbsoluteRange::new(3, Some(5), 3, Some(12)).unwrap();
        assert_eq!(
            measure.range_rect(&range),
            Some(Rect::new(10.0, 3.0, 20.0, 1.0))
        );

        let scrolled = FlowMeasure {
            scroll: 2,
            ..measure
        };
        assert_eq!(scrolled.range_rect(&range), None);
    }

    #[test]
    fn grid_measure_places_caret() {
        let decorations = DecorationSet::default();
        let measure = GridMeasure {
            mapper: GridMapper::new(100, 50),
            decorations: &decorations,
            origin: Point::new(6.0, 1.0),
            scroll: 3,
            view_rows: 20,
        };
        // Absolute line 110 is local line 11, row 7 after scrolling 3
        let range = AbsoluteRange::new(110, Some(4), 110, Some(9)).unwrap();
        assert_eq!(
            measure.range_rect(&range),
            Some(Rect::new(9.0, 8.0, 0.0, 1.0))
        );
        // Scrolled above the viewport
        let above = AbsoluteRange::lines(101, 101).unwrap();
        assert_eq!(measure.range_rect(&above), None);
    }
}
