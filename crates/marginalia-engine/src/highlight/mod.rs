pub mod flow;
pub mod grid;

pub use flow::{apply_marks, mark_rect};
pub use grid::{Decoration, DecorationSet};
