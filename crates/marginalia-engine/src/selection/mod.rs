//! Turning native selection events from either renderer into pending
//! annotation ranges in absolute coordinates.

pub mod text;
pub mod tracker;

pub use text::{extract_text, window_text};
pub use tracker::{
    DEFAULT_SUPPRESS_WINDOW, GridSelection, PendingSelection, RunPoint, SelectionTracker,
    SelectionUpdate,
};
