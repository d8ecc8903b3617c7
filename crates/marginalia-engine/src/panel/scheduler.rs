/// Coalesces any number of recompute triggers into one recompute per frame.
///
/// Hosts call [`schedule`](Self::schedule) from every scroll, resize or
/// content event and [`take_frame`](Self::take_frame) once before painting.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    pending: bool,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self) {
        self.pending = true;
    }

    /// Drop a scheduled frame, e.g. because the panel closed.
    pub fn cancel(&mut self) {
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// True exactly once per batch of `schedule` calls.
    pub fn take_frame(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}
