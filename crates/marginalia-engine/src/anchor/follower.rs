use crate::models::{AbsoluteRange, AnnotationId, Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    /// Line/column grid over the raw text.
    Grid,
    /// Flowed markup.
    Flowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorSource {
    /// A fresh selection the user is about to annotate.
    Selection,
    /// An existing annotation opened by clicking it.
    HitAnnotation(AnnotationId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorOptions {
    /// Added to the grid anchor's x.
    pub inset: f64,
    /// Grid geometry moving less than this on both axes is ignored.
    pub sticky: f64,
    /// Extra clearance required before placing the panel above.
    pub hysteresis: f64,
    /// Space between anchor and panel.
    pub gap: f64,
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self {
            inset: 2.0,
            sticky: 3.0,
            hysteresis: 12.0,
            gap: 8.0,
        }
    }
}

/// Live geometry queries answered by the host renderer, in viewport
/// coordinates.
pub trait AnchorMeasure {
    /// Bounding box of a mounted highlight.
    fn mark_rect(&self, id: AnnotationId) -> Option<Rect>;
    /// Bounding box of an absolute range, if its lines are laid out.
    fn range_rect(&self, range: &AbsoluteRange) -> Option<Rect>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorReading {
    Idle,
    Measured(Rect),
    /// Anchored, but nothing could be measured this time.
    Unmeasured,
}

#[derive(Debug, Clone)]
struct Anchored {
    source: AnchorSource,
    range: AbsoluteRange,
    /// Captured rect in content coordinates (viewport rect plus scroll).
    snapshot: Option<Rect>,
    geometry: Option<Rect>,
    placement: Option<Placement>,
}

/// Keeps the comment panel's anchor rectangle current across scrolls and
/// resizes for one panel activation.
#[derive(Debug, Clone)]
pub struct AnchorFollower {
    renderer: Renderer,
    options: AnchorOptions,
    state: Option<Anchored>,
}

impl AnchorFollower {
    pub fn new(renderer: Renderer, options: AnchorOptions) -> Self {
        Self {
            renderer,
            options,
            state: None,
        }
    }

    pub fn renderer(&self) -> Renderer {
        self.renderer
    }

    pub fn options(&self) -> &AnchorOptions {
        &self.options
    }

    /// Switch renderer; any current activation ends.
    pub fn set_renderer(&mut self, renderer: Renderer) {
        if self.renderer != renderer {
            self.renderer = renderer;
            self.release();
        }
    }

    /// Begin an activation. `snapshot` is the viewport rect captured when the
    /// selection was made, taken at scroll offset `scroll`.
    pub fn anchor(
        &mut self,
        source: AnchorSource,
        range: AbsoluteRange,
        snapshot: Option<Rect>,
        scroll: Point,
    ) {
        self.state = Some(Anchored {
            source,
            range,
            snapshot: snapshot.map(|r| r.translate(scroll.x, scroll.y)),
            geometry: None,
            placement: None,
        });
    }

    pub fn release(&mut self) {
        self.state = None;
    }

    pub fn is_anchored(&self) -> bool {
        self.state.is_some()
    }

    pub fn source(&self) -> Option<AnchorSource> {
        self.state.as_ref().map(|s| s.source)
    }

    pub fn range(&self) -> Option<&AbsoluteRange> {
        self.state.as_ref().map(|s| &s.range)
    }

    /// Last measured geometry; `None` when the last recompute failed.
    pub fn geometry(&self) -> Option<Rect> {
        self.state.as_ref().and_then(|s| s.geometry)
    }

    pub fn placement(&self) -> Option<Placement> {
        self.state.as_ref().and_then(|s| s.placement)
    }

    /// Re-measure from the most authoritative source available.
    pub fn recompute(&mut self, measure: &dyn AnchorMeasure, scroll: Point) -> AnchorReading {
        let renderer = self.renderer;
        let options = self.options;
        let Some(state) = self.state.as_mut() else {
            return AnchorReading::Idle;
        };

        let live = match state.source {
            AnchorSource::HitAnnotation(id) => measure.mark_rect(id),
            AnchorSource::Selection => None,
        };
        let measured = live
            .or_else(|| measure.range_rect(&state.range))
            .or_else(|| state.snapshot.map(|r| r.translate(-scroll.x, -scroll.y)));
        let Some(mut rect) = measured else {
            state.geometry = None;
            return AnchorReading::Unmeasured;
        };

        if renderer == Renderer::Grid {
            rect.x += options.inset;
            if let Some(prev) = state.geometry
                && !rect.moved_more_than(&prev, options.sticky)
            {
                rect = prev;
            }
        }
        state.geometry = Some(rect);
        AnchorReading::Measured(rect)
    }

    /// Pick Above or Below once per activation. Above needs clearance for the
    /// panel, the gap and the hysteresis margin; the choice then holds until
    /// the activation ends.
    pub fn decide_placement(&mut self, clearance_above: f64, panel_height: f64) -> Placement {
        let options = self.options;
        let Some(state) = self.state.as_mut() else {
            return Placement::Below;
        };
        *state.placement.get_or_insert_with(|| {
            if clearance_above > panel_height + options.gap + options.hysteresis {
                Placement::Above
            } else {
                Placement::Below
            }
        })
    }
}
