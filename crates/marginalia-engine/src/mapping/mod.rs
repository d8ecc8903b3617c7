//! Conversions between absolute document coordinates and the two renderers:
//! a line grid over the window, and flowed markup runs that each know the
//! source position they start at.

pub mod flow;
pub mod grid;
pub mod intersect;

pub use flow::{PositionCursor, char_prefix, char_slice, offset_to_position, position_to_offset};
pub use grid::GridMapper;
pub use intersect::intersect;
