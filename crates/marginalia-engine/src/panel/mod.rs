pub mod placement;
pub mod scheduler;

pub use placement::{PanelPosition, PlacementOptions, Side, compute_position};
pub use scheduler::FrameScheduler;

use crate::anchor::{AnchorFollower, AnchorMeasure, AnchorReading, Placement, Renderer};
use crate::models::{Point, Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelVisibility {
    Hidden,
    Visible(PanelPosition),
}

/// What the host knows at paint time.
pub struct FrameInput<'a> {
    pub measure: &'a dyn AnchorMeasure,
    pub scroll: Point,
    pub panel: Size,
    pub boundary: Rect,
}

/// Positions the floating comment panel, recomputing at most once per frame.
#[derive(Debug, Clone)]
pub struct PanelCoordinator {
    options: PlacementOptions,
    scheduler: FrameScheduler,
    open: bool,
    position: Option<PanelPosition>,
}

impl Default for PanelCoordinator {
    fn default() -> Self {
        Self::new(PlacementOptions::default())
    }
}

impl PanelCoordinator {
    pub fn new(options: PlacementOptions) -> Self {
        Self {
            options,
            scheduler: FrameScheduler::new(),
            open: false,
            position: None,
        }
    }

    pub fn open(&mut self) {
        self.open = true;
        self.position = None;
        self.scheduler.schedule();
    }

    pub fn close(&mut self) {
        self.open = false;
        self.position = None;
        self.scheduler.cancel();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Note a scroll, resize or content change.
    pub fn schedule(&mut self) {
        if self.open {
            self.scheduler.schedule();
        }
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Run the frame's recompute if one was scheduled, then report where to
    /// paint. The panel stays hidden until a position has been computed.
    pub fn on_frame(&mut self, follower: &mut AnchorFollower, input: &FrameInput) -> PanelVisibility {
        if self.open && self.scheduler.take_frame() {
            self.position = self.recompute(follower, input);
        }
        self.visibility()
    }

    pub fn visibility(&self) -> PanelVisibility {
        match self.position {
            Some(pos) if self.open => PanelVisibility::Visible(pos),
            _ => PanelVisibility::Hidden,
        }
    }

    fn recompute(&self, follower: &mut AnchorFollower, input: &FrameInput) -> Option<PanelPosition> {
        let AnchorReading::Measured(rect) = follower.recompute(input.measure, input.scroll) else {
            return None;
        };
        let position = match follower.renderer() {
            Renderer::Grid => {
                let caret = Rect::new(rect.x, rect.y, 0.0, rect.height);
                let placement =
                    follower.decide_placement(caret.top() - input.boundary.top(), input.panel.height);
                let side = match placement {
                    Placement::Above => Side::Top,
                    Placement::Below => Side::Bottom,
                };
                let options = PlacementOptions {
                    offset: follower.options().gap,
                    padding: 0.0,
                    flip: false,
                };
                compute_position(caret, input.panel, input.boundary, side, &options)
            }
            Renderer::Flowed => {
                compute_position(rect, input.panel, input.boundary, Side::Top, &self.options)
            }
        };
        Some(position)
    }
}
