use std::collections::VecDeque;

use relative_path::{RelativePath, RelativePathBuf};

use super::source::ChunkSource;
use super::window::DocumentWindow;
use crate::error::EngineError;
use crate::models::{AbsoluteRange, FileChunk};

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_FORWARD_TRIGGER_PX: f64 = 200.0;
pub const DEFAULT_BACKWARD_TRIGGER_PX: f64 = 80.0;

/// Identity of one open document activation. Results tagged with an older
/// id are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Initial,
    Forward,
    Backward,
}

/// A fetch the host should run against a [`ChunkSource`] and hand back to
/// [`ChunkedDocument::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    pub document: DocumentId,
    pub direction: Direction,
    pub path: RelativePathBuf,
    pub start_line: usize,
    pub max_lines: usize,
}

impl ChunkRequest {
    pub async fn fetch(&self, source: &dyn ChunkSource) -> Result<FileChunk, EngineError> {
        log::debug!(
            "Fetching {:?} chunk of {} from line {} ({} lines)",
            self.direction,
            self.path,
            self.start_line,
            self.max_lines
        );
        source
            .fetch_chunk(&self.path, self.start_line, self.max_lines)
            .await
    }
}

/// Scroll state of the viewport showing the window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub view_height: f64,
    pub scroll_height: f64,
}

impl ScrollMetrics {
    pub fn near_bottom(&self, threshold: f64) -> bool {
        self.scroll_top + self.view_height >= self.scroll_height - threshold
    }

    pub fn near_top(&self, threshold: f64) -> bool {
        self.scroll_top <= threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagingOptions {
    pub page_size: usize,
    pub forward_trigger: f64,
    pub backward_trigger: f64,
}

impl Default for PagingOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            forward_trigger: DEFAULT_FORWARD_TRIGGER_PX,
            backward_trigger: DEFAULT_BACKWARD_TRIGGER_PX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    Applied {
        direction: Direction,
        lines_added: usize,
    },
    /// Held until the current pointer gesture ends.
    Deferred,
    /// The document changed while the fetch was in flight.
    Discarded,
}

/// Where a jump target lives relative to the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealTarget {
    /// Already materialized; local 1-based line span to scroll to.
    InWindow { local_start: usize, local_end: usize },
    /// The document must be reopened starting at this absolute line.
    Reopen { start_line: usize },
}

/// Sliding window over a large document, filled on demand in pages.
///
/// The model never performs IO itself: it hands out [`ChunkRequest`]s and
/// applies their results, so the single-flight gates and the identity
/// check are plain state transitions.
#[derive(Debug)]
pub struct ChunkedDocument {
    options: PagingOptions,
    generation: u64,
    path: Option<RelativePathBuf>,
    page_size: usize,
    window: Option<DocumentWindow>,
    initial_in_flight: bool,
    forward_in_flight: bool,
    backward_in_flight: bool,
    gesture_active: bool,
    deferred: VecDeque<(ChunkRequest, FileChunk)>,
    blocked: Option<String>,
}

impl Default for ChunkedDocument {
    fn default() -> Self {
        Self::new(PagingOptions::default())
    }
}

impl ChunkedDocument {
    pub fn new(options: PagingOptions) -> Self {
        Self {
            options,
            generation: 0,
            path: None,
            page_size: options.page_size.max(1),
            window: None,
            initial_in_flight: false,
            forward_in_flight: false,
            backward_in_flight: false,
            gesture_active: false,
            deferred: VecDeque::new(),
            blocked: None,
        }
    }

    pub fn options(&self) -> &PagingOptions {
        &self.options
    }

    pub fn document_id(&self) -> DocumentId {
        DocumentId(self.generation)
    }

    pub fn path(&self) -> Option<&RelativePath> {
        self.path.as_deref()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn window(&self) -> Option<&DocumentWindow> {
        self.window.as_ref()
    }

    /// Reason the document cannot be previewed, once a blocking error hit.
    pub fn blocked(&self) -> Option<&str> {
        self.blocked.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.initial_in_flight || self.forward_in_flight || self.backward_in_flight
    }

    /// Start a new activation and return the initial fetch.
    ///
    /// Anything still in flight for the previous activation is discarded
    /// when it completes.
    pub fn open(
        &mut self,
        path: impl Into<RelativePathBuf>,
        start_line: usize,
        page_size: Option<usize>,
    ) -> ChunkRequest {
        self.generation += 1;
        let path = path.into();
        self.page_size = match page_size {
            Some(n) if n >= 1 => n,
            _ => self.options.page_size.max(1),
        };
        self.path = Some(path.clone());
        self.window = None;
        self.forward_in_flight = false;
        self.backward_in_flight = false;
        self.initial_in_flight = true;
        self.deferred.clear();
        self.blocked = None;
        log::debug!("Opened {path} as document {}", self.generation);
        ChunkRequest {
            document: self.document_id(),
            direction: Direction::Initial,
            path,
            start_line: start_line.max(1),
            max_lines: self.page_size,
        }
    }

    /// Forget the current document; late results will be discarded.
    pub fn close(&mut self) {
        self.generation += 1;
        self.path = None;
        self.window = None;
        self.initial_in_flight = false;
        self.forward_in_flight = false;
        self.backward_in_flight = false;
        self.deferred.clear();
        self.blocked = None;
    }

    /// Issue the fetches a scroll position calls for. At most one request
    /// per direction is ever outstanding.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Vec<ChunkRequest> {
        let mut requests = Vec::new();
        if metrics.near_top(self.options.backward_trigger)
            && let Some(req) = self.request_backward()
        {
            requests.push(req);
        }
        if metrics.near_bottom(self.options.forward_trigger)
            && let Some(req) = self.request_forward()
        {
            requests.push(req);
        }
        requests
    }

    pub fn request_forward(&mut self) -> Option<ChunkRequest> {
        if self.forward_in_flight || self.blocked.is_some() {
            return None;
        }
        let window = self.window.as_ref()?;
        if window.at_end() {
            return None;
        }
        let req = ChunkRequest {
            document: self.document_id(),
            direction: Direction::Forward,
            path: window.path().to_relative_path_buf(),
            start_line: window.end_line() + 1,
            max_lines: self.page_size,
        };
        self.forward_in_flight = true;
        Some(req)
    }

    pub fn request_backward(&mut self) -> Option<ChunkRequest> {
        if self.backward_in_flight || self.blocked.is_some() {
            return None;
        }
        let window = self.window.as_ref()?;
        if window.at_start() {
            return None;
        }
        let req = ChunkRequest {
            document: self.document_id(),
            direction: Direction::Backward,
            path: window.path().to_relative_path_buf(),
            start_line: window.start_line().saturating_sub(self.page_size).max(1),
            max_lines: self.page_size,
        };
        self.backward_in_flight = true;
        Some(req)
    }

    /// Hand back the result of a request.
    ///
    /// Errors reopen the direction's gate and are returned to the caller;
    /// nothing is retried automatically.
    pub fn complete(
        &mut self,
        request: ChunkRequest,
        result: Result<FileChunk, EngineError>,
    ) -> Result<ChunkOutcome, EngineError> {
        if request.document != self.document_id() {
            log::debug!(
                "Discarding {:?} chunk of {} for stale document",
                request.direction,
                request.path
            );
            return Ok(ChunkOutcome::Discarded);
        }
        let chunk = match result {
            Ok(chunk) => chunk,
            Err(err) => {
                self.release_gate(request.direction);
                if err.is_preview_blocking()
                    || (request.direction == Direction::Initial
                        && matches!(err, EngineError::NotFound(_)))
                {
                    self.blocked = Some(err.to_string());
                }
                return Err(err);
            }
        };
        if self.gesture_active {
            log::debug!("Deferring {:?} chunk until gesture ends", request.direction);
            self.deferred.push_back((request, chunk));
            return Ok(ChunkOutcome::Deferred);
        }
        self.apply(request, chunk)
    }

    /// A pointer selection gesture started; chunk application waits.
    pub fn begin_gesture(&mut self) {
        self.gesture_active = true;
    }

    /// The gesture ended; apply everything deferred, in arrival order.
    pub fn end_gesture(&mut self) -> Result<Vec<ChunkOutcome>, EngineError> {
        self.gesture_active = false;
        let mut outcomes = Vec::with_capacity(self.deferred.len());
        while let Some((request, chunk)) = self.deferred.pop_front() {
            outcomes.push(self.apply(request, chunk)?);
        }
        Ok(outcomes)
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture_active
    }

    /// Decide how to bring `range` into view.
    pub fn reveal_target(&self, range: &AbsoluteRange) -> RevealTarget {
        if let Some(window) = &self.window
            && window.contains_line(range.start_line)
        {
            let end = range.end_line.min(window.end_line());
            return RevealTarget::InWindow {
                local_start: range.start_line - window.start_line() + 1,
                local_end: end - window.start_line() + 1,
            };
        }
        RevealTarget::Reopen {
            start_line: range.start_line.saturating_sub(self.page_size / 2).max(1),
        }
    }

    fn apply(
        &mut self,
        request: ChunkRequest,
        chunk: FileChunk,
    ) -> Result<ChunkOutcome, EngineError> {
        self.release_gate(request.direction);
        let lines_added = match request.direction {
            Direction::Initial => {
                let window = DocumentWindow::from_chunk(chunk);
                let added = window.line_count();
                self.window = Some(window);
                added
            }
            Direction::Forward => match self.window.as_mut() {
                Some(window) => window.append_forward(&chunk)?,
                None => 0,
            },
            Direction::Backward => match self.window.as_mut() {
                Some(window) => window.append_backward(&chunk)?,
                None => 0,
            },
        };
        log::debug!(
            "Applied {:?} chunk of {}: {lines_added} lines",
            request.direction,
            request.path
        );
        Ok(ChunkOutcome::Applied {
            direction: request.direction,
            lines_added,
        })
    }

    fn release_gate(&mut self, direction: Direction) {
        match direction {
            Direction::Initial => self.initial_in_flight = false,
            Direction::Forward => self.forward_in_flight = false,
            Direction::Backward => self.backward_in_flight = false,
        }
    }
}
