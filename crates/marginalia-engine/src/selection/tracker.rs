use std::time::{Duration, Instant};

use super::text::window_text;
use crate::mapping::{GridMapper, char_prefix, offset_to_position};
use crate::markup::Run;
use crate::models::{AbsoluteRange, Position};
use crate::paging::DocumentWindow;

/// How long empty selections are ignored after an annotation opens from a
/// hit-test.
pub const DEFAULT_SUPPRESS_WINDOW: Duration = Duration::from_secs(1);

/// A selection waiting to become an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    pub range: AbsoluteRange,
    pub selected_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionUpdate {
    Selected(PendingSelection),
    /// The selection collapsed or could not be mapped.
    Cleared,
    /// The event was swallowed; keep whatever state the host had.
    Suppressed,
}

/// Native grid selection endpoints in window-local coordinates, in the order
/// the renderer reported them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSelection {
    pub anchor: Position,
    pub active: Position,
}

impl GridSelection {
    pub fn is_empty(&self) -> bool {
        self.anchor == self.active
    }
}

/// A native flowed-selection boundary: a character offset inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPoint {
    pub run: usize,
    pub offset: usize,
}

/// Filters and normalizes selection events for one viewer.
#[derive(Debug, Clone)]
pub struct SelectionTracker {
    suppress_window: Duration,
    suppress_until: Option<Instant>,
    suppress_once: bool,
    gesture_active: bool,
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESS_WINDOW)
    }
}

impl SelectionTracker {
    pub fn new(suppress_window: Duration) -> Self {
        Self {
            suppress_window,
            suppress_until: None,
            suppress_once: false,
            gesture_active: false,
        }
    }

    pub fn begin_gesture(&mut self) {
        self.gesture_active = true;
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture_active
    }

    /// The pointer was released where no selection can be read.
    pub fn end_gesture(&mut self) {
        self.gesture_active = false;
    }

    /// An annotation was opened by clicking it; the click's own empty
    /// selection and any that follow shortly after must not clear it.
    pub fn note_hit_opened(&mut self, now: Instant) {
        self.gesture_active = false;
        self.suppress_once = true;
        self.suppress_until = Some(now + self.suppress_window);
    }

    /// The host is about to move the selection itself.
    pub fn note_programmatic_jump(&mut self) {
        self.suppress_once = true;
    }

    pub fn reset(&mut self) {
        self.suppress_until = None;
        self.suppress_once = false;
        self.gesture_active = false;
    }

    fn in_suppress_window(&self, now: Instant) -> bool {
        self.suppress_until.is_some_and(|until| now < until)
    }

    /// Pointer released over the grid.
    pub fn grid_pointer_up(
        &mut self,
        selection: Option<GridSelection>,
        window: &DocumentWindow,
        now: Instant,
    ) -> SelectionUpdate {
        self.gesture_active = false;
        self.grid_update(selection, window, now)
    }

    /// Selection changed from the keyboard (or programmatically).
    pub fn grid_selection_changed(
        &mut self,
        selection: Option<GridSelection>,
        window: &DocumentWindow,
        now: Instant,
    ) -> SelectionUpdate {
        if std::mem::take(&mut self.suppress_once) {
            return SelectionUpdate::Suppressed;
        }
        if self.gesture_active {
            return SelectionUpdate::Suppressed;
        }
        self.grid_update(selection, window, now)
    }

    fn grid_update(
        &self,
        selection: Option<GridSelection>,
        window: &DocumentWindow,
        now: Instant,
    ) -> SelectionUpdate {
        let Some(selection) = selection.filter(|s| !s.is_empty() && !window.is_empty()) else {
            return self.empty(now);
        };
        let mapper = GridMapper::for_window(window);
        let range = AbsoluteRange::between(
            mapper.position_to_absolute(selection.anchor),
            mapper.position_to_absolute(selection.active),
        );
        let selected_text = window_text(window, &range);
        SelectionUpdate::Selected(PendingSelection {
            range,
            selected_text,
        })
    }

    /// Pointer released over flowed markup. `native_text` is what the
    /// renderer reports as selected.
    pub fn flow_pointer_up(
        &mut self,
        runs: &[Run],
        anchor: RunPoint,
        focus: RunPoint,
        native_text: &str,
        now: Instant,
    ) -> SelectionUpdate {
        self.gesture_active = false;
        if native_text.trim().is_empty() {
            return self.empty(now);
        }
        let (Some(a), Some(b)) = (map_point(runs, anchor), map_point(runs, focus)) else {
            return SelectionUpdate::Cleared;
        };
        if a == b {
            return self.empty(now);
        }
        SelectionUpdate::Selected(PendingSelection {
            range: AbsoluteRange::between(a, b),
            selected_text: native_text.to_string(),
        })
    }

    fn empty(&self, now: Instant) -> SelectionUpdate {
        if self.in_suppress_window(now) {
            SelectionUpdate::Suppressed
        } else {
            SelectionUpdate::Cleared
        }
    }
}

/// Source position of a boundary, walking from its own run's start.
fn map_point(runs: &[Run], point: RunPoint) -> Option<Position> {
    let run = runs.get(point.run)?;
    if !run.is_text_wrapper() {
        return None;
    }
    let source = run.source?;
    Some(offset_to_position(
        source.start,
        char_prefix(&run.text, point.offset),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::render_markup;
    use crate::models::FileChunk;
    use pretty_assertions::assert_eq;

    fn window() -> DocumentWindow {
        DocumentWindow::from_chunk(FileChunk {
            path: "doc.txt".into(),
            language: "plaintext".into(),
            size: 0,
            total_lines: 300,
            start_line: 101,
            end_line: 103,
            content: "first line\nsecond line\nthird line".into(),
            truncated: false,
        })
    }

    fn sel(al: usize, ac: usize, fl: usize, fc: usize) -> Option<GridSelection> {
        Some(GridSelection {
            anchor: Position::new(al, ac),
            active: Position::new(fl, fc),
        })
    }

    fn selected(update: SelectionUpdate) -> PendingSelection {
        match update {
            SelectionUpdate::Selected(p) => p,
            other => panic!("expected selection, got {other:?}"),
        }
    }

    #[test]
    fn reversed_grid_selection_is_normalized() {
        // Given a selection reported end-before-start
        let mut tracker = SelectionTracker::default();
        let now = Instant::now();

        // When the pointer is released
        let p = selected(tracker.grid_pointer_up(sel(2, 8, 1, 7), &window(), now));

        // Then the range is ordered and absolute
        assert_eq!(p.range, AbsoluteRange::new(101, Some(7), 102, Some(8)).unwrap());
        assert_eq!(p.selected_text, "line\nsecond ");
    }

    #[test]
    fn collapsed_selection_clears() {
        let mut tracker = SelectionTracker::default();
        let update = tracker.grid_pointer_up(sel(1, 3, 1, 3), &window(), Instant::now());
        assert_eq!(update, SelectionUpdate::Cleared);
        assert_eq!(
            tracker.grid_pointer_up(None, &window(), Instant::now()),
            SelectionUpdate::Cleared
        );
    }

    #[test]
    fn empty_events_suppressed_after_hit() {
        let mut tracker = SelectionTracker::default();
        let t0 = Instant::now();
        tracker.note_hit_opened(t0);

        let during = t0 + Duration::from_millis(400);
        assert_eq!(
            tracker.grid_pointer_up(None, &window(), during),
            SelectionUpdate::Suppressed
        );
        // A real selection still goes through
        assert!(matches!(
            tracker.grid_pointer_up(sel(1, 1, 1, 6), &window(), during),
            SelectionUpdate::Selected(_)
        ));

        let after = t0 + Duration::from_millis(1500);
        assert_eq!(
            tracker.grid_pointer_up(None, &window(), after),
            SelectionUpdate::Cleared
        );
    }

    #[test]
    fn one_shot_flag_silences_exactly_one_change() {
        let mut tracker = SelectionTracker::default();
        tracker.note_programmatic_jump();
        let now = Instant::now();
        assert_eq!(
            tracker.grid_selection_changed(sel(1, 1, 2, 3), &window(), now),
            SelectionUpdate::Suppressed
        );
        assert!(matches!(
            tracker.grid_selection_changed(sel(1, 1, 2, 3), &window(), now),
            SelectionUpdate::Selected(_)
        ));
    }

    #[test]
    fn keyboard_changes_ignored_mid_gesture() {
        let mut tracker = SelectionTracker::default();
        tracker.begin_gesture();
        let now = Instant::now();
        assert_eq!(
            tracker.grid_selection_changed(sel(1, 1, 1, 4), &window(), now),
            SelectionUpdate::Suppressed
        );
        tracker.grid_pointer_up(sel(1, 1, 1, 4), &window(), now);
        assert!(!tracker.gesture_active());
    }

    #[test]
    fn flowed_selection_maps_through_runs() {
        // "Some *emph* here": runs "Some " (1,1), "emph" (1,7), " here" (1,12)
        let runs = render_markup("Some *emph* here");
        let emph = runs.iter().position(|r| r.text == "emph").unwrap();
        let here = runs.iter().position(|r| r.text == " here").unwrap();
        let mut tracker = SelectionTracker::default();

        // Focus before anchor: selection made right-to-left
        let p = selected(tracker.flow_pointer_up(
            &runs,
            RunPoint { run: here, offset: 3 },
            RunPoint { run: emph, offset: 1 },
            "mph he",
            Instant::now(),
        ));
        assert_eq!(p.range, AbsoluteRange::new(1, Some(8), 1, Some(15)).unwrap());
        assert_eq!(p.selected_text, "mph he");
    }

    #[test]
    fn flowed_unmappable_boundary_clears() {
        let runs = render_markup("- item");
        let bullet = runs.iter().position(|r| r.text == "- ").unwrap();
        let item = runs.iter().position(|r| r.text == "item").unwrap();
        let mut tracker = SelectionTracker::default();
        let update = tracker.flow_pointer_up(
            &runs,
            RunPoint { run: bullet, offset: 0 },
            RunPoint { run: item, offset: 2 },
            "- it",
            Instant::now(),
        );
        assert_eq!(update, SelectionUpdate::Cleared);
    }

    #[test]
    fn whitespace_only_flowed_selection_clears() {
        let runs = render_markup("a b");
        let mut tracker = SelectionTracker::default();
        let update = tracker.flow_pointer_up(
            &runs,
            RunPoint { run: 0, offset: 1 },
            RunPoint { run: 0, offset: 2 },
            " ",
            Instant::now(),
        );
        assert_eq!(update, SelectionUpdate::Cleared);
    }
}
