use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use marginalia_config::{Config, PrefsStore};
use marginalia_engine::anchor::AnchorOptions;
use marginalia_engine::paging::{Direction, PagingOptions, ScrollMetrics};
use marginalia_engine::panel::PlacementOptions;
use marginalia_engine::selection::{GridSelection, RunPoint, SelectionUpdate};
use marginalia_engine::session::{GestureEnd, Jump};
use marginalia_engine::{
    AnnotationSession, AnnotationStore, ChunkOutcome, ChunkRequest, ChunkSource, DocumentFile,
    EditorState, FsChunkSource, MemoryStore, Position, ReadLimits, Renderer, io,
};
use ratatui::widgets::ListState;
use relative_path::{RelativePath, RelativePathBuf};

use crate::geometry::FlowLayout;

/// Terminal rows count as this many pixels against the paging triggers.
pub const ROW_PX: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Files,
    Document,
    Comment,
}

/// Where the document view was drawn last frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewArea {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// Columns taken by line numbers in the grid view.
    pub gutter: u16,
}

impl ViewArea {
    /// Content cell under a screen cell, if inside the view.
    fn content_cell(&self, column: u16, row: u16, scroll: usize) -> Option<(usize, usize)> {
        let x = column.checked_sub(self.x + self.gutter)?;
        let y = row.checked_sub(self.y)?;
        if y >= self.height || column >= self.x + self.width {
            return None;
        }
        Some((y as usize + scroll, x as usize))
    }
}

/// One row of the file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Root-relative, `/` separated.
    pub path: String,
    pub depth: usize,
    pub is_dir: bool,
}

impl TreeEntry {
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Directories appear once, ahead of their first file; anything under a
/// collapsed directory is hidden.
fn tree_entries(files: &[RelativePathBuf], prefs: &PrefsStore) -> Vec<TreeEntry> {
    let mut entries = Vec::new();
    let mut listed = HashSet::new();
    for file in files {
        let parts: Vec<&str> = file.as_str().split('/').collect();
        let depth = parts.len() - 1;
        let mut visible = true;
        for level in 0..depth {
            let dir = parts[..=level].join("/");
            if listed.insert(dir.clone()) {
                entries.push(TreeEntry {
                    path: dir.clone(),
                    depth: level,
                    is_dir: true,
                });
            }
            if !prefs.is_expanded(&dir) {
                visible = false;
                break;
            }
        }
        if visible {
            entries.push(TreeEntry {
                path: file.to_string(),
                depth,
                is_dir: false,
            });
        }
    }
    entries
}

enum Drag {
    Grid(Position),
    Flow(RunPoint),
}

pub struct App {
    pub root: PathBuf,
    pub files: Vec<RelativePathBuf>,
    pub entries: Vec<TreeEntry>,
    pub file_list_state: ListState,
    pub session: AnnotationSession<MemoryStore>,
    pub prefs: PrefsStore,
    pub focus: Focus,
    /// Grid cursor in window-local coordinates.
    pub cursor: Position,
    pub selection_anchor: Option<Position>,
    /// Content rows scrolled off the top.
    pub scroll: usize,
    pub view: ViewArea,
    pub flow: FlowLayout,
    pub comment: String,
    pub status: String,
    source: FsChunkSource,
    annotations_path: PathBuf,
    drag: Option<Drag>,
}

impl App {
    pub fn new(config: Config, prefs: PrefsStore) -> Result<Self> {
        let files = io::scan_documents(&config.root_path)?;
        let annotations_path = config.annotations_path();
        let store = MemoryStore::load_json(&annotations_path)?;
        log::info!(
            "Loaded {} documents and {} annotations",
            files.len(),
            store.len()
        );

        let paging = PagingOptions {
            page_size: prefs
                .prefs()
                .page_size
                .unwrap_or(config.paging.page_size),
            forward_trigger: config.paging.forward_trigger_px,
            backward_trigger: config.paging.backward_trigger_px,
        };
        // Distances in cells
        let anchor = AnchorOptions {
            inset: 0.0,
            sticky: 0.0,
            hysteresis: 1.0,
            gap: 1.0,
        };
        let placement = PlacementOptions {
            offset: 1.0,
            padding: 1.0,
            flip: true,
        };
        let session =
            AnnotationSession::with_options(store, Renderer::Grid, paging, anchor, placement);
        let limits = ReadLimits {
            full_read_bytes: config.preview.full_read_limit_bytes,
            ..ReadLimits::default()
        };

        let entries = tree_entries(&files, &prefs);
        let mut file_list_state = ListState::default();
        if !entries.is_empty() {
            file_list_state.select(Some(0));
        }

        Ok(Self {
            source: FsChunkSource::with_limits(&config.root_path, limits),
            root: config.root_path,
            files,
            entries,
            file_list_state,
            session,
            prefs,
            focus: Focus::Files,
            cursor: Position::new(1, 1),
            selection_anchor: None,
            scroll: 0,
            view: ViewArea::default(),
            flow: FlowLayout::default(),
            comment: String::new(),
            status: String::new(),
            annotations_path,
            drag: None,
        })
    }

    pub fn renderer(&self) -> Renderer {
        self.session.renderer()
    }

    /// Flowed markup only applies to markdown documents.
    fn sync_renderer(&mut self) {
        let markup = self.prefs.prefs().markup_preview
            && self
                .session
                .document()
                .path()
                .is_some_and(|p| DocumentFile::from(p.to_relative_path_buf()).renders_as_markup());
        let renderer = if markup {
            Renderer::Flowed
        } else {
            Renderer::Grid
        };
        if renderer != self.renderer() {
            self.session.set_renderer(renderer);
            self.scroll = 0;
        }
        self.refresh_flow();
    }

    /// Rebuild the flowed layout from the full source (or the window when
    /// the full read failed) and the current annotations.
    pub fn refresh_flow(&mut self) {
        if self.renderer() == Renderer::Grid {
            self.flow = FlowLayout::default();
            return;
        }
        let runs = match (self.session.source_text(), self.session.document().window()) {
            (Some(text), _) => marginalia_engine::render_markup(text),
            (None, Some(window)) => {
                marginalia_engine::markup::render_markup_at(&window.text(), window.start_line())
            }
            (None, None) => Vec::new(),
        };
        self.flow = FlowLayout::new(self.session.highlight_runs(&runs));
    }

    /// Markdown is previewed whole, within the configured full-read limit.
    async fn load_source(&mut self, path: &RelativePath) {
        match self.source.fetch_full(path).await {
            Ok(full) => {
                log::debug!("Read {} whole ({} bytes, {})", path, full.size, full.digest);
                self.session.set_source_text(Some(full.content));
            }
            Err(e) => {
                log::warn!("Previewing {path} from loaded lines only: {e}");
                self.status = format!("Preview limited to loaded lines: {e}");
            }
        }
    }

    fn content_rows(&self) -> usize {
        match self.renderer() {
            Renderer::Grid => self
                .session
                .document()
                .window()
                .map_or(0, |w| w.line_count()),
            Renderer::Flowed => self.flow.rows,
        }
    }

    fn view_rows(&self) -> usize {
        (self.view.height as usize).max(1)
    }

    pub fn next_file(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let i = match self.file_list_state.selected() {
            Some(i) => (i + 1) % self.entries.len(),
            None => 0,
        };
        self.file_list_state.select(Some(i));
    }

    pub fn previous_file(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let i = match self.file_list_state.selected() {
            Some(0) | None => self.entries.len() - 1,
            Some(i) => i - 1,
        };
        self.file_list_state.select(Some(i));
    }

    fn selected_entry(&self) -> Option<&TreeEntry> {
        self.file_list_state
            .selected()
            .and_then(|i| self.entries.get(i))
    }

    /// Expand or collapse the selected directory. `expand` of `None` toggles.
    pub fn toggle_selected_dir(&mut self, expand: Option<bool>) {
        let Some(entry) = self.selected_entry().filter(|e| e.is_dir).cloned() else {
            return;
        };
        if expand.is_some_and(|want| want == self.prefs.is_expanded(&entry.path)) {
            return;
        }
        if let Err(e) = self.prefs.toggle_expanded(&entry.path) {
            log::warn!("Failed to save folder state: {e}");
            self.status = format!("Cannot save preferences: {e}");
        }
        self.entries = tree_entries(&self.files, &self.prefs);
        let index = self
            .entries
            .iter()
            .position(|e| e.path == entry.path)
            .unwrap_or(0);
        self.file_list_state.select(Some(index));
    }

    pub async fn open_selected(&mut self) {
        let Some(entry) = self.selected_entry().cloned() else {
            return;
        };
        if entry.is_dir {
            self.toggle_selected_dir(None);
            return;
        }
        let path = RelativePathBuf::from(entry.path);
        let request = self.session.open(path.clone(), 1);
        self.cursor = Position::new(1, 1);
        self.selection_anchor = None;
        self.scroll = 0;
        self.comment.clear();
        self.status.clear();
        self.run_requests(vec![request]).await;
        if self.session.document().blocked().is_none()
            && DocumentFile::from(path.clone()).renders_as_markup()
        {
            self.load_source(&path).await;
        }
        self.sync_renderer();
        self.focus = Focus::Document;
    }

    async fn run_requests(&mut self, requests: Vec<ChunkRequest>) {
        for request in requests {
            let result = request.fetch(&self.source).await;
            match self.session.complete(request, result) {
                Ok(outcome) => self.note_outcome(outcome),
                Err(e) => self.status = format!("Cannot preview: {e}"),
            }
        }
    }

    /// Keep the view steady when lines are prepended.
    fn note_outcome(&mut self, outcome: ChunkOutcome) {
        if let ChunkOutcome::Applied {
            direction,
            lines_added,
        } = outcome
        {
            if direction == Direction::Backward && self.renderer() == Renderer::Grid {
                self.cursor.line += lines_added;
                self.scroll += lines_added;
                if let Some(anchor) = self.selection_anchor.as_mut() {
                    anchor.line += lines_added;
                }
            }
            self.refresh_flow();
        }
    }

    fn note_gesture_end(&mut self, end: GestureEnd) {
        for outcome in end.applied {
            self.note_outcome(outcome);
        }
        self.note_selection(end.selection);
    }

    fn note_selection(&mut self, update: SelectionUpdate) {
        if let SelectionUpdate::Selected(pending) = update {
            self.status = format!(
                "Selected {} ({} chars) - press a to annotate",
                pending.range,
                pending.selected_text.chars().count()
            );
        }
    }

    /// Issue whatever chunk loads the scroll position calls for.
    async fn after_scroll(&mut self) {
        let rows = self.content_rows();
        self.scroll = self.scroll.min(rows.saturating_sub(1));
        let metrics = ScrollMetrics {
            scroll_top: self.scroll as f64 * ROW_PX,
            view_height: self.view_rows() as f64 * ROW_PX,
            scroll_height: rows as f64 * ROW_PX,
        };
        let requests = self.session.on_scroll(metrics);
        self.run_requests(requests).await;
    }

    fn line_max_column(&self, local_line: usize) -> usize {
        self.session
            .document()
            .window()
            .and_then(|w| w.line_max_column(w.start_line() + local_line - 1))
            .unwrap_or(1)
    }

    fn move_cursor(&mut self, lines: isize, columns: isize) {
        let rows = self.content_rows().max(1);
        let line = self.cursor.line.saturating_add_signed(lines).clamp(1, rows);
        let max_col = self.line_max_column(line);
        let column = self
            .cursor
            .column
            .saturating_add_signed(columns)
            .clamp(1, max_col);
        self.cursor = Position::new(line, column);

        let view = self.view_rows();
        if line <= self.scroll {
            self.scroll = line - 1;
        } else if line > self.scroll + view {
            self.scroll = line - view;
        }
    }

    pub fn grid_selection(&self) -> Option<GridSelection> {
        self.selection_anchor.map(|anchor| GridSelection {
            anchor,
            active: self.cursor,
        })
    }

    /// Returns true when the app should quit.
    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        self.session.schedule_frame();
        match self.focus {
            Focus::Files => match key.code {
                KeyCode::Char('q') => return Ok(true),
                KeyCode::Down | KeyCode::Char('j') => self.next_file(),
                KeyCode::Up | KeyCode::Char('k') => self.previous_file(),
                KeyCode::Enter | KeyCode::Char(' ') => self.open_selected().await,
                KeyCode::Right | KeyCode::Char('l') => self.toggle_selected_dir(Some(true)),
                KeyCode::Left | KeyCode::Char('h') => self.toggle_selected_dir(Some(false)),
                KeyCode::Tab if self.session.document().window().is_some() => {
                    self.focus = Focus::Document
                }
                _ => {}
            },
            Focus::Document => return self.handle_document_key(key).await,
            Focus::Comment => self.handle_comment_key(key)?,
        }
        Ok(false)
    }

    async fn handle_document_key(&mut self, key: KeyEvent) -> Result<bool> {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let page = self.view_rows() as isize;
        let movement = match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some((-1, 0)),
            KeyCode::Down | KeyCode::Char('j') => Some((1, 0)),
            KeyCode::Left | KeyCode::Char('h') => Some((0, -1)),
            KeyCode::Right | KeyCode::Char('l') => Some((0, 1)),
            KeyCode::PageUp => Some((-page, 0)),
            KeyCode::PageDown => Some((page, 0)),
            _ => None,
        };
        if let Some((lines, columns)) = movement {
            match self.renderer() {
                Renderer::Grid => {
                    if shift && self.selection_anchor.is_none() {
                        self.selection_anchor = Some(self.cursor);
                    } else if !shift {
                        self.selection_anchor = None;
                    }
                    self.move_cursor(lines, columns);
                    let update = self
                        .session
                        .grid_selection_changed(self.grid_selection(), Instant::now());
                    self.note_selection(update);
                }
                Renderer::Flowed => {
                    self.scroll = self.scroll.saturating_add_signed(lines);
                }
            }
            self.after_scroll().await;
            return Ok(false);
        }

        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Tab | KeyCode::Esc => self.focus = Focus::Files,
            KeyCode::Char('a') => {
                if self.session.start_draft(None, marginalia_engine::Point::default()) {
                    self.comment.clear();
                    self.focus = Focus::Comment;
                } else {
                    self.status = "Select some text first".to_string();
                }
            }
            KeyCode::Enter if self.renderer() == Renderer::Grid => {
                match self.session.grid_hit(self.cursor, Instant::now()) {
                    Some(id) => self.begin_editing(id),
                    None => self.status = "No annotation under the cursor".to_string(),
                }
            }
            KeyCode::Char('n') => self.jump(1).await?,
            KeyCode::Char('p') => self.jump(-1).await?,
            KeyCode::Char('m') => {
                self.prefs.toggle_markup_preview()?;
                self.sync_renderer();
            }
            KeyCode::Char('w') => self.prefs.toggle_wrap()?,
            KeyCode::Char('t') => {
                self.prefs.cycle_theme()?;
                self.status = format!("Theme: {:?}", self.prefs.prefs().theme);
            }
            _ => {}
        }
        Ok(false)
    }

    fn begin_editing(&mut self, id: marginalia_engine::AnnotationId) {
        self.comment = self
            .session
            .store()
            .get(id)
            .map(|a| a.comment.clone())
            .unwrap_or_default();
        self.selection_anchor = None;
        self.focus = Focus::Comment;
    }

    fn handle_comment_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.session.close_panel();
                self.focus = Focus::Document;
            }
            KeyCode::Enter => {
                let comment = std::mem::take(&mut self.comment);
                if let Some(saved) = self.session.commit(&comment)? {
                    self.save_annotations()?;
                    self.status = format!("Saved annotation at {}", saved.range);
                }
                self.selection_anchor = None;
                self.refresh_flow();
                self.focus = Focus::Document;
            }
            KeyCode::Delete => {
                if let Some(removed) = self.session.delete_current()? {
                    self.save_annotations()?;
                    self.status = format!("Deleted annotation at {}", removed.range);
                    self.comment.clear();
                    self.refresh_flow();
                    self.focus = Focus::Document;
                }
            }
            KeyCode::Backspace => {
                self.comment.pop();
            }
            KeyCode::Char(c) => self.comment.push(c),
            _ => {}
        }
        Ok(())
    }

    fn save_annotations(&self) -> Result<()> {
        self.session.store().save_json(&self.annotations_path)
    }

    /// Move to the next (or previous) annotation by document order.
    async fn jump(&mut self, step: isize) -> Result<()> {
        let Some(path) = self.session.document().path() else {
            return Ok(());
        };
        let mut targets: Vec<(Position, marginalia_engine::AnnotationId)> = self
            .session
            .store()
            .list_for(path)
            .into_iter()
            .map(|a| (a.range.start(), a.id))
            .collect();
        targets.sort();
        let Some(window) = self.session.document().window() else {
            return Ok(());
        };
        let here = Position::new(window.start_line() + self.cursor.line - 1, self.cursor.column);
        let target = if step > 0 {
            targets.iter().find(|(p, _)| *p > here).or(targets.first())
        } else {
            targets.iter().rev().find(|(p, _)| *p < here).or(targets.last())
        };
        let Some(&(position, id)) = target else {
            self.status = "No annotations in this document".to_string();
            return Ok(());
        };

        match self.session.jump_to(id)? {
            Jump::Scroll { local_start, .. } => {
                self.cursor = Position::new(local_start, position.column.max(1));
            }
            Jump::Load(request) => {
                self.scroll = 0;
                self.run_requests(vec![request]).await;
                let start = self
                    .session
                    .document()
                    .window()
                    .map_or(1, |w| w.start_line());
                self.cursor = Position::new(position.line + 1 - start, position.column.max(1));
            }
        }
        self.selection_anchor = None;
        self.move_cursor(0, 0);
        self.refresh_flow();
        self.status = format!("Annotation at {position}");
        Ok(())
    }

    pub async fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        self.session.schedule_frame();
        if self.focus == Focus::Comment {
            return Ok(());
        }
        match mouse.kind {
            MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
                let delta = if mouse.kind == MouseEventKind::ScrollDown {
                    3
                } else {
                    -3
                };
                self.scroll = self.scroll.saturating_add_signed(delta);
                self.after_scroll().await;
            }
            // Wrapped rows no longer match the cell geometry
            MouseEventKind::Down(MouseButton::Left) if self.prefs.prefs().wrap => {
                self.status = "Turn off wrap (w) to select with the mouse".to_string();
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let Some((row, col)) = self.view.content_cell(mouse.column, mouse.row, self.scroll)
                else {
                    return Ok(());
                };
                self.focus = Focus::Document;
                self.mouse_down(row, col);
            }
            MouseEventKind::Up(MouseButton::Left) => {
                match self.view.content_cell(mouse.column, mouse.row, self.scroll) {
                    Some((row, col)) => self.mouse_up(row, col)?,
                    None => self.release_outside()?,
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn mouse_down(&mut self, row: usize, col: usize) {
        let now = Instant::now();
        match self.renderer() {
            Renderer::Grid => {
                let position = Position::new(row + 1, col + 1);
                if let Some(id) = self.session.grid_hit(position, now) {
                    self.begin_editing(id);
                    return;
                }
                self.session.begin_gesture();
                self.cursor = position;
                self.selection_anchor = None;
                self.drag = Some(Drag::Grid(position));
            }
            Renderer::Flowed => {
                if let Some(id) = self.flow.mark_at(row, col)
                    && self.session.open_annotation(id, now).is_ok()
                {
                    self.begin_editing(id);
                    return;
                }
                if let Some(point) = self.flow.point_at(row, col) {
                    self.session.begin_gesture();
                    self.drag = Some(Drag::Flow(point));
                }
            }
        }
    }

    fn mouse_up(&mut self, row: usize, col: usize) -> Result<()> {
        let now = Instant::now();
        let end = match self.drag.take() {
            Some(Drag::Grid(anchor)) => {
                let max_col = self.line_max_column(row + 1);
                let active = Position::new(row + 1, (col + 1).min(max_col));
                self.cursor = active;
                self.selection_anchor = (anchor != active).then_some(anchor);
                self.session.grid_pointer_up(self.grid_selection(), now)?
            }
            Some(Drag::Flow(anchor)) => {
                let focus = self.flow.point_at(row, col).unwrap_or(anchor);
                let text = self.flow.text_between(anchor, focus);
                self.session
                    .flow_pointer_up(&self.flow.runs, anchor, focus, &text, now)?
            }
            None => return Ok(()),
        };
        self.note_gesture_end(end);
        Ok(())
    }

    /// A drag ended outside the document; the gesture still has to end.
    fn release_outside(&mut self) -> Result<()> {
        let end = match self.drag.take() {
            Some(Drag::Grid(_)) => self.session.grid_pointer_up(None, Instant::now())?,
            Some(Drag::Flow(_)) => self.session.cancel_gesture()?,
            None => return Ok(()),
        };
        self.note_gesture_end(end);
        Ok(())
    }

    pub fn editor_title(&self) -> &'static str {
        match self.session.editor() {
            EditorState::Drafting { .. } => "New annotation (Enter save, Esc cancel)",
            EditorState::Editing { .. } => "Annotation (Enter save, Del delete, Esc close)",
            EditorState::Closed => "",
        }
    }
}
