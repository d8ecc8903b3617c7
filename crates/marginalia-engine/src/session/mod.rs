pub mod store;

pub use store::{AnnotationStore, MemoryStore};

use std::time::Instant;

use relative_path::RelativePathBuf;

use crate::anchor::{AnchorFollower, AnchorOptions, AnchorSource, Renderer};
use crate::error::EngineError;
use crate::highlight::{DecorationSet, apply_marks};
use crate::markup::Run;
use crate::models::{
    AbsoluteRange, Annotation, AnnotationId, AnnotationUpdate, FileChunk, Mark, NewAnnotation,
    Point, Position, Rect,
};
use crate::paging::{
    ChunkOutcome, ChunkRequest, ChunkedDocument, PagingOptions, RevealTarget, ScrollMetrics,
};
use crate::panel::{FrameInput, PanelCoordinator, PanelVisibility, PlacementOptions};
use crate::selection::{
    GridSelection, PendingSelection, RunPoint, SelectionTracker, SelectionUpdate, extract_text,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorState {
    Closed,
    Drafting {
        range: AbsoluteRange,
        selected_text: String,
    },
    Editing {
        annotation_id: AnnotationId,
    },
}

impl EditorState {
    pub fn is_open(&self) -> bool {
        !matches!(self, EditorState::Closed)
    }
}

/// Result of releasing a pointer gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureEnd {
    pub selection: SelectionUpdate,
    /// Chunks that arrived during the gesture, applied now.
    pub applied: Vec<ChunkOutcome>,
}

/// How to bring an annotation into view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Jump {
    Scroll { local_start: usize, local_end: usize },
    Load(ChunkRequest),
}

/// One open document with its annotations, selection and comment panel.
pub struct AnnotationSession<S: AnnotationStore> {
    store: S,
    document: ChunkedDocument,
    selection: SelectionTracker,
    follower: AnchorFollower,
    panel: PanelCoordinator,
    editor: EditorState,
    pending: Option<PendingSelection>,
    /// Whole source of the open document, when the host read it in full.
    source_text: Option<String>,
}

impl<S: AnnotationStore> AnnotationSession<S> {
    pub fn new(store: S, renderer: Renderer, paging: PagingOptions) -> Self {
        Self::with_options(
            store,
            renderer,
            paging,
            AnchorOptions::default(),
            PlacementOptions::default(),
        )
    }

    /// Anchor and placement distances are in the host's units, so a terminal
    /// host passes cell-sized values here.
    pub fn with_options(
        store: S,
        renderer: Renderer,
        paging: PagingOptions,
        anchor: AnchorOptions,
        placement: PlacementOptions,
    ) -> Self {
        Self {
            store,
            document: ChunkedDocument::new(paging),
            selection: SelectionTracker::default(),
            follower: AnchorFollower::new(renderer, anchor),
            panel: PanelCoordinator::new(placement),
            editor: EditorState::Closed,
            pending: None,
            source_text: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn document(&self) -> &ChunkedDocument {
        &self.document
    }

    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    pub fn pending(&self) -> Option<&PendingSelection> {
        self.pending.as_ref()
    }

    pub fn source_text(&self) -> Option<&str> {
        self.source_text.as_deref()
    }

    /// Provide the full source of the open document. Flowed selections then
    /// quote the source instead of the rendered text.
    pub fn set_source_text(&mut self, text: Option<String>) {
        self.source_text = text;
    }

    pub fn renderer(&self) -> Renderer {
        self.follower.renderer()
    }

    pub fn follower(&self) -> &AnchorFollower {
        &self.follower
    }

    /// Switch between grid and flowed rendering. The panel closes because its
    /// anchor geometry belongs to the old renderer.
    pub fn set_renderer(&mut self, renderer: Renderer) {
        if renderer != self.renderer() {
            self.close_panel();
            self.follower.set_renderer(renderer);
        }
    }

    /// Open `path` at `start_line`, dropping everything tied to the previous
    /// document.
    pub fn open(&mut self, path: impl Into<RelativePathBuf>, start_line: usize) -> ChunkRequest {
        self.reset_interaction();
        self.document.open(path, start_line, None)
    }

    pub fn close_document(&mut self) {
        self.reset_interaction();
        self.document.close();
    }

    fn reset_interaction(&mut self) {
        self.source_text = None;
        self.close_panel();
        self.selection.reset();
    }

    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Vec<ChunkRequest> {
        self.panel.schedule();
        self.document.on_scroll(metrics)
    }

    pub fn complete(
        &mut self,
        request: ChunkRequest,
        result: Result<FileChunk, EngineError>,
    ) -> Result<ChunkOutcome, EngineError> {
        let outcome = self.document.complete(request, result)?;
        if matches!(outcome, ChunkOutcome::Applied { .. }) {
            self.panel.schedule();
        }
        Ok(outcome)
    }

    /// Annotations of the open document as renderer marks.
    pub fn marks(&self) -> Vec<Mark> {
        self.document
            .path()
            .map(|path| {
                self.store
                    .list_for(path)
                    .into_iter()
                    .map(Annotation::mark)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Grid decorations for the current window.
    pub fn decorations(&self) -> DecorationSet {
        match self.document.window() {
            Some(window) => DecorationSet::build(window, &self.marks()),
            None => DecorationSet::default(),
        }
    }

    /// Flowed runs split at annotation boundaries.
    pub fn highlight_runs(&self, runs: &[Run]) -> Vec<Run> {
        apply_marks(runs, &self.marks())
    }

    pub fn begin_gesture(&mut self) {
        self.selection.begin_gesture();
        self.document.begin_gesture();
    }

    pub fn grid_pointer_up(
        &mut self,
        selection: Option<GridSelection>,
        now: Instant,
    ) -> Result<GestureEnd, EngineError> {
        let update = match self.document.window() {
            Some(window) => self.selection.grid_pointer_up(selection, window, now),
            None => SelectionUpdate::Cleared,
        };
        let applied = self.document.end_gesture()?;
        Ok(GestureEnd {
            selection: self.accept_selection(update),
            applied,
        })
    }

    pub fn grid_selection_changed(
        &mut self,
        selection: Option<GridSelection>,
        now: Instant,
    ) -> SelectionUpdate {
        let update = match self.document.window() {
            Some(window) => self.selection.grid_selection_changed(selection, window, now),
            None => SelectionUpdate::Cleared,
        };
        self.accept_selection(update)
    }

    pub fn flow_pointer_up(
        &mut self,
        runs: &[Run],
        anchor: RunPoint,
        focus: RunPoint,
        native_text: &str,
        now: Instant,
    ) -> Result<GestureEnd, EngineError> {
        let update = self
            .selection
            .flow_pointer_up(runs, anchor, focus, native_text, now);
        let update = match (update, self.source_text.as_deref()) {
            (SelectionUpdate::Selected(mut pending), Some(source)) => {
                pending.selected_text = extract_text(source, &pending.range);
                SelectionUpdate::Selected(pending)
            }
            (update, _) => update,
        };
        let applied = self.document.end_gesture()?;
        Ok(GestureEnd {
            selection: self.accept_selection(update),
            applied,
        })
    }

    /// End a pointer gesture without a selection to report, e.g. released
    /// outside the document. Deferred chunks are applied and the pending
    /// selection is kept.
    pub fn cancel_gesture(&mut self) -> Result<GestureEnd, EngineError> {
        self.selection.end_gesture();
        let applied = self.document.end_gesture()?;
        Ok(GestureEnd {
            selection: SelectionUpdate::Suppressed,
            applied,
        })
    }

    fn accept_selection(&mut self, update: SelectionUpdate) -> SelectionUpdate {
        if self.editor.is_open() {
            return SelectionUpdate::Suppressed;
        }
        match &update {
            SelectionUpdate::Selected(pending) => self.pending = Some(pending.clone()),
            SelectionUpdate::Cleared => self.pending = None,
            SelectionUpdate::Suppressed => {}
        }
        update
    }

    /// Open the panel on the pending selection. `snapshot` is its viewport
    /// rect at scroll offset `scroll`, if the host measured one.
    pub fn start_draft(&mut self, snapshot: Option<Rect>, scroll: Point) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        self.follower
            .anchor(AnchorSource::Selection, pending.range, snapshot, scroll);
        self.editor = EditorState::Drafting {
            range: pending.range,
            selected_text: pending.selected_text,
        };
        self.panel.open();
        true
    }

    /// Open the annotation under local grid position `pos`, if any.
    pub fn grid_hit(&mut self, pos: Position, now: Instant) -> Option<AnnotationId> {
        let id = self.decorations().hit_test(pos)?;
        self.open_annotation(id, now).ok()?;
        Some(id)
    }

    /// Open an existing annotation for editing after it was clicked.
    pub fn open_annotation(&mut self, id: AnnotationId, now: Instant) -> Result<(), EngineError> {
        let range = self
            .store
            .get(id)
            .map(|a| a.range)
            .ok_or(EngineError::UnknownAnnotation(id))?;
        self.pending = None;
        self.selection.note_hit_opened(now);
        self.follower
            .anchor(AnchorSource::HitAnnotation(id), range, None, Point::default());
        self.editor = EditorState::Editing { annotation_id: id };
        self.panel.open();
        Ok(())
    }

    /// Save the panel's comment. Returns the stored annotation, or `None` when
    /// no panel was open.
    pub fn commit(&mut self, comment: &str) -> Result<Option<Annotation>, EngineError> {
        let saved = match &self.editor {
            EditorState::Closed => return Ok(None),
            EditorState::Drafting {
                range,
                selected_text,
            } => {
                let file_path = self
                    .document
                    .path()
                    .ok_or_else(|| EngineError::InvalidPath("no document open".into()))?
                    .to_relative_path_buf();
                self.store.create(NewAnnotation {
                    file_path,
                    range: *range,
                    selected_text: selected_text.clone(),
                    comment: comment.to_string(),
                })?
            }
            EditorState::Editing { annotation_id } => self.store.update(
                *annotation_id,
                AnnotationUpdate {
                    comment: Some(comment.to_string()),
                    ..Default::default()
                },
            )?,
        };
        self.close_panel();
        Ok(Some(saved))
    }

    /// Delete the annotation being edited.
    pub fn delete_current(&mut self) -> Result<Option<Annotation>, EngineError> {
        let EditorState::Editing { annotation_id } = self.editor else {
            return Ok(None);
        };
        let removed = self.store.delete(annotation_id)?;
        self.close_panel();
        Ok(Some(removed))
    }

    pub fn close_panel(&mut self) {
        self.editor = EditorState::Closed;
        self.pending = None;
        self.follower.release();
        self.panel.close();
    }

    /// Bring an annotation into view, reopening the window around it when it
    /// is not materialized.
    pub fn jump_to(&mut self, id: AnnotationId) -> Result<Jump, EngineError> {
        let range = self
            .store
            .get(id)
            .map(|a| a.range)
            .ok_or(EngineError::UnknownAnnotation(id))?;
        self.selection.note_programmatic_jump();
        match self.document.reveal_target(&range) {
            RevealTarget::InWindow {
                local_start,
                local_end,
            } => Ok(Jump::Scroll {
                local_start,
                local_end,
            }),
            RevealTarget::Reopen { start_line } => {
                let path = self
                    .document
                    .path()
                    .ok_or_else(|| EngineError::InvalidPath("no document open".into()))?
                    .to_relative_path_buf();
                self.close_panel();
                let page_size = self.document.page_size();
                Ok(Jump::Load(self.document.open(path, start_line, Some(page_size))))
            }
        }
    }

    /// Note a resize or any other geometry change.
    pub fn schedule_frame(&mut self) {
        self.panel.schedule();
    }

    /// Where to paint the panel this frame.
    pub fn frame(&mut self, input: &FrameInput) -> PanelVisibility {
        self.panel.on_frame(&mut self.follower, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::AnchorMeasure;
    use crate::models::Size;
    use pretty_assertions::assert_eq;
    use relative_path::RelativePath;
    use std::time::Duration;

    fn chunk(path: &str, start: usize, lines: &[&str], total: usize) -> FileChunk {
        FileChunk {
            path: path.into(),
            language: "plaintext".into(),
            size: 0,
            total_lines: total,
            start_line: start,
            end_line: start + lines.len() - 1,
            content: lines.join("\n"),
            truncated: false,
        }
    }

    fn opened() -> AnnotationSession<MemoryStore> {
        let mut session = AnnotationSession::new(
            MemoryStore::new(),
            Renderer::Grid,
            PagingOptions {
                page_size: 3,
                ..PagingOptions::default()
            },
        );
        let req = session.open("doc.txt", 1);
        session
            .complete(
                req,
                Ok(chunk("doc.txt", 1, &["alpha beta", "gamma", "delta"], 10)),
            )
            .unwrap();
        session
    }

    fn select(session: &mut AnnotationSession<MemoryStore>, now: Instant) -> GestureEnd {
        session.begin_gesture();
        session
            .grid_pointer_up(
                Some(GridSelection {
                    anchor: Position::new(1, 7),
                    active: Position::new(1, 11),
                }),
                now,
            )
            .unwrap()
    }

    #[test]
    fn draft_commit_creates_annotation() {
        // Given a selection of "beta"
        let mut session = opened();
        let end = select(&mut session, Instant::now());
        assert!(matches!(end.selection, SelectionUpdate::Selected(_)));

        // When the user drafts and commits
        assert!(session.start_draft(None, Point::default()));
        let saved = session.commit("why beta?").unwrap().unwrap();

        // Then the annotation is stored against the open file
        assert_eq!(saved.selected_text, "beta");
        assert_eq!(saved.file_path, RelativePath::new("doc.txt").to_relative_path_buf());
        assert_eq!(saved.range, AbsoluteRange::new(1, Some(7), 1, Some(11)).unwrap());
        assert_eq!(session.editor(), &EditorState::Closed);
        assert_eq!(session.decorations().len(), 1);
    }

    #[test]
    fn selections_ignored_while_panel_open() {
        let mut session = opened();
        select(&mut session, Instant::now());
        session.start_draft(None, Point::default());

        let update = session.grid_selection_changed(
            Some(GridSelection {
                anchor: Position::new(2, 1),
                active: Position::new(2, 3),
            }),
            Instant::now(),
        );
        assert_eq!(update, SelectionUpdate::Suppressed);
        assert!(matches!(session.editor(), EditorState::Drafting { range, .. } if range.start_line == 1));
    }

    #[test]
    fn hit_opens_editing_and_suppresses_click_selection() {
        let mut session = opened();
        let now = Instant::now();
        select(&mut session, now);
        session.start_draft(None, Point::default());
        let saved = session.commit("note").unwrap().unwrap();

        // When the user clicks inside the highlight
        assert_eq!(session.grid_hit(Position::new(1, 8), now), Some(saved.id));
        assert_eq!(
            session.editor(),
            &EditorState::Editing {
                annotation_id: saved.id
            }
        );

        // Then the click's collapsed selection does not close the panel
        session.close_panel();
        session.open_annotation(saved.id, now).unwrap();
        session.begin_gesture();
        let end = session
            .grid_pointer_up(None, now + Duration::from_millis(100))
            .unwrap();
        assert_eq!(end.selection, SelectionUpdate::Suppressed);
        assert!(session.editor().is_open());
    }

    #[test]
    fn editing_commit_updates_and_delete_removes() {
        let mut session = opened();
        let now = Instant::now();
        select(&mut session, now);
        session.start_draft(None, Point::default());
        let saved = session.commit("first").unwrap().unwrap();

        session.open_annotation(saved.id, now).unwrap();
        let updated = session.commit("second").unwrap().unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.comment, "second");

        session.open_annotation(saved.id, now).unwrap();
        session.delete_current().unwrap();
        assert!(session.store().is_empty());
        assert!(session.decorations().is_empty());
    }

    #[test]
    fn chunk_during_gesture_applies_on_release() {
        let mut session = opened();
        let req = session
            .on_scroll(ScrollMetrics {
                scroll_top: 100.0,
                view_height: 300.0,
                scroll_height: 420.0,
            })
            .pop()
            .unwrap();

        session.begin_gesture();
        let outcome = session
            .complete(req, Ok(chunk("doc.txt", 4, &["e", "f", "g"], 10)))
            .unwrap();
        assert_eq!(outcome, ChunkOutcome::Deferred);
        assert_eq!(session.document().window().unwrap().end_line(), 3);

        let end = session.grid_pointer_up(None, Instant::now()).unwrap();
        assert_eq!(end.applied.len(), 1);
        assert_eq!(session.document().window().unwrap().end_line(), 6);
    }

    #[test]
    fn cancelled_gesture_releases_paging_and_keyboard() {
        // Given a forward chunk held back by a gesture
        let mut session = opened();
        let req = session
            .on_scroll(ScrollMetrics {
                scroll_top: 100.0,
                view_height: 300.0,
                scroll_height: 420.0,
            })
            .pop()
            .unwrap();
        session.begin_gesture();
        session
            .complete(req, Ok(chunk("doc.txt", 4, &["e", "f", "g"], 10)))
            .unwrap();

        // When the gesture ends with nothing to read
        let end = session.cancel_gesture().unwrap();

        // Then the chunk lands and keyboard selection works again
        assert_eq!(end.applied.len(), 1);
        assert_eq!(end.selection, SelectionUpdate::Suppressed);
        assert!(!session.document().gesture_active());
        assert_eq!(session.document().window().unwrap().end_line(), 6);
        let update = session.grid_selection_changed(
            Some(GridSelection {
                anchor: Position::new(2, 1),
                active: Position::new(2, 4),
            }),
            Instant::now(),
        );
        assert!(matches!(update, SelectionUpdate::Selected(_)));
    }

    #[test]
    fn flowed_selection_quotes_the_source() {
        // Given a markdown document whose full source is known
        let source = "Some **bold** text";
        let mut session = AnnotationSession::new(
            MemoryStore::new(),
            Renderer::Flowed,
            PagingOptions::default(),
        );
        session.open("doc.md", 1);
        session.set_source_text(Some(source.to_string()));
        let runs = crate::markup::render_markup(source);
        let first = runs.iter().position(|r| r.text.starts_with("Some")).unwrap();
        let last = runs.iter().rposition(|r| r.text.ends_with("text")).unwrap();

        // When the rendered text is selected end to end
        session.begin_gesture();
        let end = session
            .flow_pointer_up(
                &runs,
                RunPoint {
                    run: first,
                    offset: 0,
                },
                RunPoint {
                    run: last,
                    offset: runs[last].text.chars().count(),
                },
                "Some bold text",
                Instant::now(),
            )
            .unwrap();

        // Then the pending selection carries the markdown source
        assert!(matches!(end.selection, SelectionUpdate::Selected(_)));
        assert_eq!(session.pending().unwrap().selected_text, source);

        // And opening another document forgets it
        session.open("other.md", 1);
        assert_eq!(session.source_text(), None);
    }

    #[test]
    fn document_change_resets_panel_and_pending() {
        let mut session = opened();
        select(&mut session, Instant::now());
        assert!(session.pending().is_some());
        session.start_draft(None, Point::default());

        session.open("other.txt", 1);
        assert_eq!(session.editor(), &EditorState::Closed);
        assert!(session.pending().is_none());
        assert!(!session.follower().is_anchored());
    }

    #[test]
    fn jump_scrolls_or_reloads() {
        let mut session = opened();
        let near = session
            .store_mut()
            .create(NewAnnotation {
                file_path: "doc.txt".into(),
                range: AbsoluteRange::lines(2, 3).unwrap(),
                selected_text: String::new(),
                comment: String::new(),
            })
            .unwrap();
        let far = session
            .store_mut()
            .create(NewAnnotation {
                file_path: "doc.txt".into(),
                range: AbsoluteRange::lines(9, 9).unwrap(),
                selected_text: String::new(),
                comment: String::new(),
            })
            .unwrap();

        assert_eq!(
            session.jump_to(near.id).unwrap(),
            Jump::Scroll {
                local_start: 2,
                local_end: 3
            }
        );
        let Jump::Load(req) = session.jump_to(far.id).unwrap() else {
            panic!("expected a reload");
        };
        assert_eq!(req.start_line, 8);
        assert_eq!(req.max_lines, 3);
    }

    struct FixedMeasure(Rect);

    impl AnchorMeasure for FixedMeasure {
        fn mark_rect(&self, _id: AnnotationId) -> Option<Rect> {
            Some(self.0)
        }

        fn range_rect(&self, _range: &AbsoluteRange) -> Option<Rect> {
            Some(self.0)
        }
    }

    #[test]
    fn panel_appears_after_first_frame() {
        let mut session = opened();
        select(&mut session, Instant::now());
        session.start_draft(None, Point::default());

        let measure = FixedMeasure(Rect::new(40.0, 300.0, 0.0, 18.0));
        let input = FrameInput {
            measure: &measure,
            scroll: Point::default(),
            panel: Size::new(200.0, 100.0),
            boundary: Rect::new(0.0, 0.0, 640.0, 480.0),
        };
        assert!(matches!(session.frame(&input), PanelVisibility::Visible(_)));

        session.close_panel();
        assert_eq!(session.frame(&input), PanelVisibility::Hidden);
    }
}
