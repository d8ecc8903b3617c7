//! Flowed rendering of markdown into positioned text runs.

pub mod line_index;
pub mod render;
pub mod run;

pub use line_index::LineIndex;
pub use render::{render_markup, render_markup_at};
pub use run::{Run, RunKind, RunStyle};
